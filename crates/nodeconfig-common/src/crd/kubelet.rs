//! Kubelet options passed through to provisioned nodes

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::enum_value::{EnumValue, KnownValues};

/// Eviction signals the kubelet understands
pub const EVICTION_SIGNALS: &[&str] = &[
    "memory.available",
    "nodefs.available",
    "nodefs.inodesFree",
    "imagefs.available",
    "imagefs.inodesFree",
    "pid.available",
];

/// Flat bag of kubelet settings. All fields are optional.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KubeletOptions {
    /// CPU manager policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_manager_policy: Option<EnumValue<CpuManagerPolicy>>,

    /// Enforce CPU CFS quota for containers with CPU limits
    #[serde(rename = "cpuCFSQuota", default, skip_serializing_if = "Option::is_none")]
    pub cpu_cfs_quota: Option<bool>,

    /// Topology manager policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_manager_policy: Option<EnumValue<TopologyManagerPolicy>>,

    /// Disk usage percentage that always triggers image garbage collection
    #[serde(
        rename = "imageGCHighThresholdPercent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub image_gc_high_threshold_percent: Option<i32>,

    /// Disk usage percentage below which image garbage collection never runs
    #[serde(
        rename = "imageGCLowThresholdPercent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub image_gc_low_threshold_percent: Option<i32>,

    /// Unsafe sysctls (or patterns ending in `*`) pods may set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_unsafe_sysctls: Vec<String>,

    /// Maximum size of a container log file before rotation, e.g. `10Mi`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_log_max_size: Option<String>,

    /// Maximum number of rotated log files kept per container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_log_max_files: Option<i32>,

    /// Maximum number of processes per pod (-1 for unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_pids_limit: Option<i64>,

    /// Hard eviction thresholds keyed by signal
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub eviction_hard: BTreeMap<String, String>,

    /// Soft eviction thresholds keyed by signal
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub eviction_soft: BTreeMap<String, String>,

    /// Grace period per soft eviction signal, e.g. `1m30s`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub eviction_soft_grace_period: BTreeMap<String, String>,
}

/// Kubelet CPU manager policy
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CpuManagerPolicy {
    /// Default CFS-quota based sharing
    None,
    /// Exclusive cores for Guaranteed pods with integer CPU requests
    Static,
}

impl KnownValues for CpuManagerPolicy {
    const ALL: &'static [Self] = &[Self::None, Self::Static];

    fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Static => "static",
        }
    }
}

/// Kubelet topology manager policy
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TopologyManagerPolicy {
    /// Admit only pods with a preferred NUMA alignment
    Restricted,
    /// Prefer NUMA alignment, admit regardless
    BestEffort,
    /// No topology alignment
    None,
    /// Admit only pods that fit in a single NUMA node
    SingleNumaNode,
}

impl KnownValues for TopologyManagerPolicy {
    const ALL: &'static [Self] = &[
        Self::Restricted,
        Self::BestEffort,
        Self::None,
        Self::SingleNumaNode,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Restricted => "restricted",
            Self::BestEffort => "best-effort",
            Self::None => "none",
            Self::SingleNumaNode => "single-numa-node",
        }
    }
}
