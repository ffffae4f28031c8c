//! Node-local DNS override configuration
//!
//! Local DNS runs a caching resolver on every node. Two override lists steer
//! its behaviour per zone: `vnetDNSOverrides` for queries from pods using the
//! VNet DNS policy and `kubeDNSOverrides` for queries from pods using cluster
//! DNS.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::enum_value::{EnumValue, KnownValues};

/// Root zone; every override list must configure it
pub const ROOT_ZONE: &str = ".";

/// Cluster-internal zone; every override list must configure it
pub const CLUSTER_LOCAL_ZONE: &str = "cluster.local";

/// Zones every override list must contain
pub const REQUIRED_ZONES: &[&str] = &[ROOT_ZONE, CLUSTER_LOCAL_ZONE];

/// Local DNS configuration
///
/// Example:
/// ```yaml
/// localDNS:
///   mode: Preferred
///   vnetDNSOverrides:
///     - zone: "."
///       queryLogging: Error
///       protocol: PreferUDP
///       forwardDestination: VnetDNS
///       forwardPolicy: Sequential
///       maxConcurrent: 1000
///       cacheDuration: 1h
///       serveStaleDuration: 1h
///       serveStale: Verify
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalDnsSpec {
    /// Whether local DNS is preferred, required, or disabled on the node
    pub mode: EnumValue<LocalDnsMode>,

    /// Per-zone overrides for traffic from pods using the VNet DNS policy
    #[serde(rename = "vnetDNSOverrides", default, skip_serializing_if = "Vec::is_empty")]
    pub vnet_overrides: Vec<ZoneOverride>,

    /// Per-zone overrides for traffic from pods using cluster DNS
    #[serde(rename = "kubeDNSOverrides", default, skip_serializing_if = "Vec::is_empty")]
    pub kube_overrides: Vec<ZoneOverride>,
}

/// Which override list a record belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverrideList {
    /// `vnetDNSOverrides`
    Vnet,
    /// `kubeDNSOverrides`
    Kube,
}

impl OverrideList {
    /// Serialized field name, also used in violation paths
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Vnet => "vnetDNSOverrides",
            Self::Kube => "kubeDNSOverrides",
        }
    }
}

impl LocalDnsSpec {
    /// Both override lists, tagged with which one they are
    pub fn override_lists(&self) -> [(OverrideList, &[ZoneOverride]); 2] {
        [
            (OverrideList::Vnet, self.vnet_overrides.as_slice()),
            (OverrideList::Kube, self.kube_overrides.as_slice()),
        ]
    }
}

/// DNS behaviour for a single zone
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneOverride {
    /// DNS zone this override applies to (e.g. `.`, `cluster.local`)
    pub zone: String,

    /// Query logging level
    pub query_logging: EnumValue<QueryLogging>,

    /// Transport used towards the upstream server
    pub protocol: EnumValue<DnsProtocol>,

    /// Upstream server queries are forwarded to
    pub forward_destination: EnumValue<ForwardDestination>,

    /// Upstream selection policy when several servers are available
    pub forward_policy: EnumValue<ForwardPolicy>,

    /// Maximum number of concurrent upstream queries
    pub max_concurrent: i32,

    /// How long answers are cached, e.g. `1h30m`
    pub cache_duration: String,

    /// How long stale answers may be served, e.g. `1h`
    pub serve_stale_duration: String,

    /// Stale-answer serving policy
    pub serve_stale: EnumValue<ServeStale>,
}

impl ZoneOverride {
    /// True when the zone is `cluster.local` or a subdomain of it
    ///
    /// The match is on a label boundary: `notcluster.local` is not inside
    /// `cluster.local`.
    pub fn is_in_cluster_local(&self) -> bool {
        self.zone == CLUSTER_LOCAL_ZONE
            || self
                .zone
                .strip_suffix(CLUSTER_LOCAL_ZONE)
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    /// True for the root zone
    pub fn is_root(&self) -> bool {
        self.zone == ROOT_ZONE
    }
}

/// Local DNS mode
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum LocalDnsMode {
    /// Enable local DNS when the node image supports it
    Preferred,
    /// Fail provisioning when local DNS cannot be enabled
    Required,
    /// Never enable local DNS
    Disabled,
}

impl KnownValues for LocalDnsMode {
    const ALL: &'static [Self] = &[Self::Preferred, Self::Required, Self::Disabled];

    fn as_str(self) -> &'static str {
        match self {
            Self::Preferred => "Preferred",
            Self::Required => "Required",
            Self::Disabled => "Disabled",
        }
    }
}

/// Query logging level
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum QueryLogging {
    /// Log failed queries only
    Error,
    /// Log every query
    Log,
}

impl KnownValues for QueryLogging {
    const ALL: &'static [Self] = &[Self::Error, Self::Log];

    fn as_str(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Log => "Log",
        }
    }
}

/// Upstream transport
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum DnsProtocol {
    /// UDP, falling back to TCP for truncated answers
    #[serde(rename = "PreferUDP")]
    PreferUdp,
    /// Always TCP
    #[serde(rename = "ForceTCP")]
    ForceTcp,
}

impl KnownValues for DnsProtocol {
    const ALL: &'static [Self] = &[Self::PreferUdp, Self::ForceTcp];

    fn as_str(self) -> &'static str {
        match self {
            Self::PreferUdp => "PreferUDP",
            Self::ForceTcp => "ForceTCP",
        }
    }
}

/// Upstream server for forwarded queries
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ForwardDestination {
    /// The in-cluster DNS service
    #[serde(rename = "ClusterDNS")]
    ClusterDns,
    /// The VNet's DNS servers
    #[serde(rename = "VnetDNS")]
    VnetDns,
}

impl KnownValues for ForwardDestination {
    const ALL: &'static [Self] = &[Self::ClusterDns, Self::VnetDns];

    fn as_str(self) -> &'static str {
        match self {
            Self::ClusterDns => "ClusterDNS",
            Self::VnetDns => "VnetDNS",
        }
    }
}

/// Upstream selection policy
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ForwardPolicy {
    /// Try upstreams in configured order
    Sequential,
    /// Rotate through upstreams
    RoundRobin,
    /// Pick an upstream at random
    Random,
}

impl KnownValues for ForwardPolicy {
    const ALL: &'static [Self] = &[Self::Sequential, Self::RoundRobin, Self::Random];

    fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "Sequential",
            Self::RoundRobin => "RoundRobin",
            Self::Random => "Random",
        }
    }
}

/// Stale-answer serving policy
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ServeStale {
    /// Serve stale only after an upstream check fails
    Verify,
    /// Serve stale immediately while refreshing in the background
    Immediate,
    /// Never serve stale answers
    Disable,
}

impl KnownValues for ServeStale {
    const ALL: &'static [Self] = &[Self::Verify, Self::Immediate, Self::Disable];

    fn as_str(self) -> &'static str {
        match self {
            Self::Verify => "Verify",
            Self::Immediate => "Immediate",
            Self::Disable => "Disable",
        }
    }
}
