//! Custom Resource Definitions for NodeConfig
//!
//! This module contains the `NodeConfig` resource and the typed values it is
//! built from.

mod enum_value;
mod kubelet;
mod local_dns;
mod node_config;

pub use enum_value::{EnumValue, KnownValues};
pub use kubelet::{CpuManagerPolicy, KubeletOptions, TopologyManagerPolicy, EVICTION_SIGNALS};
pub use local_dns::{
    DnsProtocol, ForwardDestination, ForwardPolicy, LocalDnsMode, LocalDnsSpec, OverrideList,
    QueryLogging, ServeStale, ZoneOverride, CLUSTER_LOCAL_ZONE, REQUIRED_ZONES, ROOT_ZONE,
};
pub use node_config::{ImageFamily, NodeConfig, NodeConfigSpec, SecurityMode};
