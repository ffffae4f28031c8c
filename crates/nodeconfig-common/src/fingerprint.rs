//! Spec fingerprinting for drift detection
//!
//! A fingerprint is computed in two steps. The spec is first canonicalized
//! into a small value tree where map keys are sorted, lists are treated as
//! multisets and zero values disappear. The tree is then encoded to a stable
//! text form and hashed with SHA-256.
//!
//! Which fields take part is decided by [`EXCLUDED_FIELDS`] alone: the
//! canonicalizer emits every field it knows and the exclusion list filters
//! them afterwards. Changing that list, the encoding, or the digest algorithm
//! requires bumping [`HASH_VERSION`].

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use aws_lc_rs::digest;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crd::{
    EnumValue, KnownValues, KubeletOptions, LocalDnsSpec, NodeConfigSpec, ZoneOverride,
};
use crate::{SPEC_HASH_ANNOTATION, SPEC_HASH_VERSION_ANNOTATION};

/// Version of the canonical encoding and field selection
pub const HASH_VERSION: &str = "v1";

/// Spec fields left out of the fingerprint, as dotted paths relative to `spec`.
///
/// Re-tagging must not replace nodes. Kubelet options are also excluded, so
/// kubelet changes never trigger node replacement through drift.
pub const EXCLUDED_FIELDS: &[&str] = &["tags", "kubeletOptions"];

/// Fingerprint of a spec, with the hash version it was computed under
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SpecFingerprint {
    /// Lowercase hex SHA-256 of the canonical encoding
    pub digest: String,
    /// Hash version the digest was computed under
    pub version: String,
}

impl SpecFingerprint {
    /// Annotations a persistence layer stores next to the object
    pub fn to_annotations(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (SPEC_HASH_ANNOTATION.to_string(), self.digest.clone()),
            (SPEC_HASH_VERSION_ANNOTATION.to_string(), self.version.clone()),
        ])
    }
}

impl fmt::Display for SpecFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.digest, self.version)
    }
}

/// A previously recorded fingerprint; either half may be missing
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct StoredFingerprint {
    /// Recorded digest
    pub digest: Option<String>,
    /// Recorded hash version
    pub version: Option<String>,
}

impl StoredFingerprint {
    /// Read the fingerprint annotations from an object's annotations
    pub fn from_annotations(annotations: &BTreeMap<String, String>) -> Self {
        Self {
            digest: annotations.get(SPEC_HASH_ANNOTATION).cloned(),
            version: annotations.get(SPEC_HASH_VERSION_ANNOTATION).cloned(),
        }
    }
}

impl From<&SpecFingerprint> for StoredFingerprint {
    fn from(fp: &SpecFingerprint) -> Self {
        Self {
            digest: Some(fp.digest.clone()),
            version: Some(fp.version.clone()),
        }
    }
}

/// Outcome of comparing a recorded fingerprint with the current spec
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum DriftStatus {
    /// Recorded and current digests match under the current hash version
    Unchanged,
    /// The spec changed since the fingerprint was recorded
    Drifted,
    /// Nothing recorded, or recorded under another hash version
    Unknown,
}

impl fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unchanged => "Unchanged",
            Self::Drifted => "Drifted",
            Self::Unknown => "Unknown",
        })
    }
}

/// Compare a recorded fingerprint with the current one.
///
/// A digest recorded under a hash version other than [`HASH_VERSION`] is never
/// trusted, even when the digest strings happen to match. The same holds for a
/// `current` fingerprint that was not produced under [`HASH_VERSION`].
pub fn compare(stored: Option<&StoredFingerprint>, current: &SpecFingerprint) -> DriftStatus {
    let Some(StoredFingerprint {
        digest: Some(digest),
        version: Some(version),
    }) = stored
    else {
        return DriftStatus::Unknown;
    };

    if version != HASH_VERSION || current.version != HASH_VERSION {
        debug!(
            stored = %version,
            current = %current.version,
            "fingerprint recorded under another hash version"
        );
        return DriftStatus::Unknown;
    }

    if *digest == current.digest {
        DriftStatus::Unchanged
    } else {
        DriftStatus::Drifted
    }
}

/// Compute the fingerprint of `spec` under [`HASH_VERSION`].
pub fn fingerprint(spec: &NodeConfigSpec) -> SpecFingerprint {
    let encoded = canonical_encoding(spec);
    let hash = digest::digest(&digest::SHA256, encoded.as_bytes());

    let mut hex = String::with_capacity(64);
    for byte in hash.as_ref() {
        let _ = write!(hex, "{byte:02x}");
    }

    SpecFingerprint {
        digest: hex,
        version: HASH_VERSION.to_string(),
    }
}

/// Stable text encoding of the fingerprinted part of `spec`.
///
/// Exposed so the exact digest input can be inspected and diffed.
pub fn canonical_encoding(spec: &NodeConfigSpec) -> String {
    let mut tree = spec.canonicalize();
    for field in EXCLUDED_FIELDS {
        tree.remove(&field.split('.').collect::<Vec<_>>());
    }

    let mut out = String::new();
    if let Some(tree) = tree.prune() {
        tree.encode(&mut out);
    }
    out
}

/// Canonical value tree
#[derive(Clone, Debug, PartialEq)]
enum Canonical {
    Scalar(String),
    Integer(i64),
    Bool(bool),
    List(Vec<Canonical>),
    Object(BTreeMap<String, Canonical>),
}

impl Canonical {
    fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<Canonical>)>,
        K: Into<String>,
    {
        Self::Object(
            fields
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k.into(), v)))
                .collect(),
        )
    }

    fn string_map(map: &BTreeMap<String, String>) -> Self {
        Self::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), Self::Scalar(v.clone())))
                .collect(),
        )
    }

    /// Drop the field at `path`, if present
    fn remove(&mut self, path: &[&str]) {
        let Self::Object(fields) = self else {
            return;
        };
        match path {
            [] => {}
            [last] => {
                fields.remove(*last);
            }
            [first, rest @ ..] => {
                if let Some(child) = fields.get_mut(*first) {
                    child.remove(rest);
                }
            }
        }
    }

    /// Remove zero values; `None` when the whole value is zero
    fn prune(self) -> Option<Self> {
        match self {
            Self::Scalar(s) if s.is_empty() => None,
            Self::Integer(0) | Self::Bool(false) => None,
            Self::List(items) => {
                let items: Vec<_> = items.into_iter().filter_map(Self::prune).collect();
                (!items.is_empty()).then_some(Self::List(items))
            }
            Self::Object(fields) => {
                let fields: BTreeMap<_, _> = fields
                    .into_iter()
                    .filter_map(|(k, v)| v.prune().map(|v| (k, v)))
                    .collect();
                (!fields.is_empty()).then_some(Self::Object(fields))
            }
            other => Some(other),
        }
    }

    fn encode(&self, out: &mut String) {
        match self {
            Self::Scalar(s) => push_json_string(out, s),
            Self::Integer(n) => {
                let _ = write!(out, "{n}");
            }
            Self::Bool(b) => {
                let _ = write!(out, "{b}");
            }
            Self::List(items) => {
                let mut encoded: Vec<String> = items
                    .iter()
                    .map(|item| {
                        let mut s = String::new();
                        item.encode(&mut s);
                        s
                    })
                    .collect();
                encoded.sort_unstable();
                out.push('[');
                out.push_str(&encoded.join(","));
                out.push(']');
            }
            Self::Object(fields) => {
                out.push('{');
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    push_json_string(out, key);
                    out.push(':');
                    value.encode(out);
                }
                out.push('}');
            }
        }
    }
}

fn push_json_string(out: &mut String, s: &str) {
    out.push_str(&serde_json::Value::from(s).to_string());
}

/// Conversion of model types into the canonical tree
trait Canonicalize {
    fn canonicalize(&self) -> Canonical;
}

impl<E: KnownValues> Canonicalize for EnumValue<E> {
    fn canonicalize(&self) -> Canonical {
        Canonical::Scalar(self.as_str().to_string())
    }
}

fn opt<T: Canonicalize>(value: &Option<T>) -> Option<Canonical> {
    value.as_ref().map(Canonicalize::canonicalize)
}

fn string(value: &Option<String>) -> Option<Canonical> {
    value.as_ref().map(|s| Canonical::Scalar(s.clone()))
}

fn int(value: Option<impl Into<i64>>) -> Option<Canonical> {
    value.map(|n| Canonical::Integer(n.into()))
}

impl Canonicalize for NodeConfigSpec {
    fn canonicalize(&self) -> Canonical {
        Canonical::object([
            ("subnetReference", string(&self.subnet_reference)),
            ("osDiskSizeGB", int(self.os_disk_size_gb)),
            ("imageFamily", opt(&self.image_family)),
            ("securityMode", opt(&self.security_mode)),
            ("tags", Some(Canonical::string_map(&self.tags))),
            ("kubeletOptions", opt(&self.kubelet_options)),
            ("maxPods", int(self.max_pods)),
            ("localDNS", opt(&self.local_dns)),
        ])
    }
}

impl Canonicalize for KubeletOptions {
    fn canonicalize(&self) -> Canonical {
        Canonical::object([
            ("cpuManagerPolicy", opt(&self.cpu_manager_policy)),
            ("cpuCFSQuota", self.cpu_cfs_quota.map(Canonical::Bool)),
            ("topologyManagerPolicy", opt(&self.topology_manager_policy)),
            (
                "imageGCHighThresholdPercent",
                int(self.image_gc_high_threshold_percent),
            ),
            (
                "imageGCLowThresholdPercent",
                int(self.image_gc_low_threshold_percent),
            ),
            (
                "allowedUnsafeSysctls",
                Some(Canonical::List(
                    self.allowed_unsafe_sysctls
                        .iter()
                        .map(|s| Canonical::Scalar(s.clone()))
                        .collect(),
                )),
            ),
            ("containerLogMaxSize", string(&self.container_log_max_size)),
            ("containerLogMaxFiles", int(self.container_log_max_files)),
            ("podPidsLimit", int(self.pod_pids_limit)),
            ("evictionHard", Some(Canonical::string_map(&self.eviction_hard))),
            ("evictionSoft", Some(Canonical::string_map(&self.eviction_soft))),
            (
                "evictionSoftGracePeriod",
                Some(Canonical::string_map(&self.eviction_soft_grace_period)),
            ),
        ])
    }
}

impl Canonicalize for LocalDnsSpec {
    fn canonicalize(&self) -> Canonical {
        let list = |records: &[ZoneOverride]| {
            Some(Canonical::List(
                records.iter().map(Canonicalize::canonicalize).collect(),
            ))
        };
        Canonical::object([
            ("mode", Some(self.mode.canonicalize())),
            ("vnetDNSOverrides", list(&self.vnet_overrides)),
            ("kubeDNSOverrides", list(&self.kube_overrides)),
        ])
    }
}

impl Canonicalize for ZoneOverride {
    fn canonicalize(&self) -> Canonical {
        Canonical::object([
            ("zone", Some(Canonical::Scalar(self.zone.clone()))),
            ("queryLogging", Some(self.query_logging.canonicalize())),
            ("protocol", Some(self.protocol.canonicalize())),
            ("forwardDestination", Some(self.forward_destination.canonicalize())),
            ("forwardPolicy", Some(self.forward_policy.canonicalize())),
            ("maxConcurrent", Some(Canonical::Integer(self.max_concurrent.into()))),
            ("cacheDuration", Some(Canonical::Scalar(self.cache_duration.clone()))),
            (
                "serveStaleDuration",
                Some(Canonical::Scalar(self.serve_stale_duration.clone())),
            ),
            ("serveStale", Some(self.serve_stale.canonicalize())),
        ])
    }
}
