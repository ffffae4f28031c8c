//! NodeConfig Custom Resource Definition
//!
//! A NodeConfig describes how an autoscaler provisions compute nodes: disk,
//! image, security mode, tags, kubelet options and node-local DNS behaviour.
//! Nodes record the spec fingerprint they were built from so the controller
//! can detect drift and replace them.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::enum_value::{EnumValue, KnownValues};
use super::kubelet::KubeletOptions;
use super::local_dns::LocalDnsSpec;
use crate::fingerprint::{self, DriftStatus, SpecFingerprint, StoredFingerprint};
use crate::validation::{self, ValidationResult};

/// Specification for a NodeConfig
///
/// Example:
/// ```yaml
/// apiVersion: nodeconfig.dev/v1alpha1
/// kind: NodeConfig
/// metadata:
///   name: default
/// spec:
///   subnetReference: /subscriptions/.../subnets/nodes
///   osDiskSizeGB: 128
///   imageFamily: AzureLinux
///   securityMode: FIPS
///   maxPods: 110
///   tags:
///     team: platform
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "nodeconfig.dev",
    version = "v1alpha1",
    kind = "NodeConfig",
    plural = "nodeconfigs",
    shortname = "nc",
    printcolumn = r#"{"name":"ImageFamily","type":"string","jsonPath":".spec.imageFamily"}"#,
    printcolumn = r#"{"name":"SecurityMode","type":"string","jsonPath":".spec.securityMode"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfigSpec {
    /// Resource ID of the subnet nodes are attached to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_reference: Option<String>,

    /// OS disk size in GB. The default is applied upstream.
    #[serde(rename = "osDiskSizeGB", default, skip_serializing_if = "Option::is_none")]
    pub os_disk_size_gb: Option<i32>,

    /// Node image family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_family: Option<EnumValue<ImageFamily>>,

    /// Cryptographic security mode for the node OS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_mode: Option<EnumValue<SecurityMode>>,

    /// Tags applied to cloud resources created for the node
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    /// Kubelet settings. Changes here do not replace existing nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubelet_options: Option<KubeletOptions>,

    /// Maximum number of pods per node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pods: Option<i32>,

    /// Node-local DNS configuration
    #[serde(rename = "localDNS", default, skip_serializing_if = "Option::is_none")]
    pub local_dns: Option<LocalDnsSpec>,
}

/// Node image family
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ImageFamily {
    /// Ubuntu, version picked by the platform
    UbuntuGeneric,
    /// Ubuntu 22.04
    Ubuntu2204,
    /// Ubuntu 24.04
    Ubuntu2404,
    /// Azure Linux
    AzureLinux,
}

impl KnownValues for ImageFamily {
    const ALL: &'static [Self] = &[
        Self::UbuntuGeneric,
        Self::Ubuntu2204,
        Self::Ubuntu2404,
        Self::AzureLinux,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::UbuntuGeneric => "UbuntuGeneric",
            Self::Ubuntu2204 => "Ubuntu2204",
            Self::Ubuntu2404 => "Ubuntu2404",
            Self::AzureLinux => "AzureLinux",
        }
    }
}

/// Cryptographic security mode
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum SecurityMode {
    /// FIPS 140 validated cryptography
    #[serde(rename = "FIPS")]
    Fips,
    /// No FIPS enforcement
    Disabled,
}

impl KnownValues for SecurityMode {
    const ALL: &'static [Self] = &[Self::Fips, Self::Disabled];

    fn as_str(self) -> &'static str {
        match self {
            Self::Fips => "FIPS",
            Self::Disabled => "Disabled",
        }
    }
}

impl NodeConfigSpec {
    /// Known image family, `None` when unset or unrecognised
    pub fn image_family(&self) -> Option<ImageFamily> {
        self.image_family.as_ref().and_then(EnumValue::known)
    }

    /// Known security mode, `None` when unset or unrecognised
    pub fn security_mode(&self) -> Option<SecurityMode> {
        self.security_mode.as_ref().and_then(EnumValue::known)
    }

    /// Run every validation rule against this spec
    pub fn validate(&self) -> ValidationResult {
        validation::validate(self)
    }

    /// Compute the drift fingerprint of this spec
    pub fn fingerprint(&self) -> SpecFingerprint {
        fingerprint::fingerprint(self)
    }
}

impl NodeConfig {
    /// Run every validation rule against the spec
    pub fn validate(&self) -> ValidationResult {
        self.spec.validate()
    }

    /// Compute the drift fingerprint of the spec
    pub fn fingerprint(&self) -> SpecFingerprint {
        self.spec.fingerprint()
    }

    /// Annotations recording the current fingerprint, for the persistence layer
    pub fn fingerprint_annotations(&self) -> BTreeMap<String, String> {
        self.fingerprint().to_annotations()
    }

    /// Fingerprint recorded in this object's annotations, if any
    pub fn stored_fingerprint(&self) -> Option<StoredFingerprint> {
        self.metadata
            .annotations
            .as_ref()
            .map(StoredFingerprint::from_annotations)
    }

    /// Compare the recorded fingerprint with the current spec
    pub fn drift(&self) -> DriftStatus {
        fingerprint::compare(self.stored_fingerprint().as_ref(), &self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HASH_VERSION, SPEC_HASH_ANNOTATION, SPEC_HASH_VERSION_ANNOTATION};
    use kube::CustomResourceExt;

    fn sample() -> NodeConfig {
        NodeConfig::new(
            "default",
            NodeConfigSpec {
                os_disk_size_gb: Some(128),
                image_family: Some(ImageFamily::AzureLinux.into()),
                security_mode: Some(SecurityMode::Fips.into()),
                max_pods: Some(110),
                ..Default::default()
            },
        )
    }

    #[test]
    fn crd_metadata() {
        let crd = NodeConfig::crd();
        assert_eq!(crd.spec.group, "nodeconfig.dev");
        assert_eq!(crd.spec.names.kind, "NodeConfig");
        assert_eq!(crd.spec.scope, "Cluster");
        assert_eq!(crd.spec.versions[0].name, "v1alpha1");
    }

    #[test]
    fn manifest_yaml_decodes() {
        let yaml = r#"
apiVersion: nodeconfig.dev/v1alpha1
kind: NodeConfig
metadata:
  name: default
spec:
  osDiskSizeGB: 64
  imageFamily: Ubuntu2404
  securityMode: Disabled
  tags:
    team: platform
  kubeletOptions:
    cpuManagerPolicy: static
"#;
        let nc: NodeConfig = crate::yaml::from_yaml(yaml).unwrap();
        assert_eq!(nc.spec.os_disk_size_gb, Some(64));
        assert_eq!(nc.spec.image_family(), Some(ImageFamily::Ubuntu2404));
        assert_eq!(nc.spec.security_mode(), Some(SecurityMode::Disabled));
        assert_eq!(nc.spec.tags["team"], "platform");
        assert!(nc.spec.kubelet_options.is_some());
    }

    #[test]
    fn unknown_enum_strings_survive_decoding() {
        let json = serde_json::json!({"imageFamily": "Windows2022", "securityMode": ""});
        let spec: NodeConfigSpec = serde_json::from_value(json).unwrap();
        assert_eq!(spec.image_family(), None);
        assert_eq!(spec.image_family.as_ref().unwrap().as_str(), "Windows2022");
        assert!(spec.security_mode.as_ref().unwrap().is_empty());
    }

    #[test]
    fn wire_names_match_known_values() {
        for v in ImageFamily::ALL {
            assert_eq!(serde_json::to_value(v).unwrap(), v.as_str());
        }
        for v in SecurityMode::ALL {
            assert_eq!(serde_json::to_value(v).unwrap(), v.as_str());
        }
    }

    #[test]
    fn fingerprint_annotations_carry_digest_and_version() {
        let nc = sample();
        let annotations = nc.fingerprint_annotations();
        assert_eq!(annotations[SPEC_HASH_ANNOTATION], nc.fingerprint().digest);
        assert_eq!(annotations[SPEC_HASH_VERSION_ANNOTATION], HASH_VERSION);
    }

    #[test]
    fn drift_without_annotations_is_unknown() {
        assert_eq!(sample().drift(), DriftStatus::Unknown);
    }

    #[test]
    fn drift_follows_spec_changes() {
        let mut nc = sample();
        nc.metadata.annotations = Some(nc.fingerprint_annotations());
        assert_eq!(nc.drift(), DriftStatus::Unchanged);

        nc.spec.tags.insert("cost-center".to_string(), "42".to_string());
        assert_eq!(nc.drift(), DriftStatus::Unchanged);

        nc.spec.os_disk_size_gb = Some(256);
        assert_eq!(nc.drift(), DriftStatus::Drifted);
    }

    #[test]
    fn valid_sample_passes_validation() {
        let result = sample().validate();
        assert!(result.is_valid(), "{:?}", result.violations());
    }
}
