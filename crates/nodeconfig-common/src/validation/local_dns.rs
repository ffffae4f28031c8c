//! Local DNS override rules
//!
//! Each override list is indexed by zone for the uniqueness and completeness
//! passes. Every other pass looks at every record, repeats included. The
//! passes run independently over both lists and each reports its own
//! violations:
//!
//! 1. uniqueness of zones within a list
//! 2. presence of the required zones (`.` and `cluster.local`)
//! 3. the VNet root zone must not forward to ClusterDNS
//! 4. `cluster.local` and its subdomains must not forward to VnetDNS
//! 5. ForceTCP cannot be combined with serveStale Verify
//! 6. zone names follow the DNS label grammar
//!
//! Per-record checks (enum membership, `maxConcurrent` range, durations) run
//! after the passes. A record is addressed by its zone (`["cluster.local"]`)
//! unless an earlier record already claimed that zone, in which case it is
//! addressed by position (`[2]`).

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;

use super::fields::check_required_enum;
use super::{check_duration, check_range, FieldPath, Violation, ViolationReason};
use crate::crd::{
    DnsProtocol, ForwardDestination, LocalDnsSpec, NodeConfigSpec, OverrideList, ServeStale,
    ZoneOverride, REQUIRED_ZONES, ROOT_ZONE,
};

/// Allowed `maxConcurrent` values
pub const MAX_CONCURRENT_RANGE: RangeInclusive<i32> = 0..=10000;

static ZONE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9_-]{0,61}[A-Za-z0-9])?$")
        .expect("zone label pattern is a valid regex")
});

/// Position of the first record for each zone of one list
type ZoneIndex<'a> = BTreeMap<&'a str, usize>;

/// One override list with its path and zone index
struct List<'a> {
    kind: OverrideList,
    path: FieldPath,
    records: &'a [ZoneOverride],
    zones: ZoneIndex<'a>,
}

impl List<'_> {
    /// Records are addressed by zone; repeats of a zone fall back to their position.
    fn record_path(&self, i: usize, record: &ZoneOverride) -> FieldPath {
        match self.zones.get(record.zone.as_str()) {
            Some(&first) if first == i => self.path.key(&record.zone),
            _ => self.path.index(i),
        }
    }

    fn records(&self) -> impl Iterator<Item = (FieldPath, &ZoneOverride)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| (self.record_path(i, record), record))
    }
}

/// Validate `spec.localDNS` when present.
pub fn validate(spec: &NodeConfigSpec, root: &FieldPath) -> Vec<Violation> {
    match &spec.local_dns {
        Some(local_dns) => validate_local_dns(local_dns, &root.child("localDNS")),
        None => vec![],
    }
}

/// Validate a local DNS configuration rooted at `path`.
pub fn validate_local_dns(local_dns: &LocalDnsSpec, path: &FieldPath) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut lists = Vec::with_capacity(2);

    for (kind, records) in local_dns.override_lists() {
        let list_path = path.child(kind.field_name());
        let (zones, duplicates) = index_by_zone(records, &list_path);
        violations.extend(duplicates);
        lists.push(List {
            kind,
            path: list_path,
            records,
            zones,
        });
    }

    for list in &lists {
        violations.extend(required_zones(list));
    }
    for list in &lists {
        violations.extend(root_zone_forwarding(list));
    }
    for list in &lists {
        violations.extend(cluster_zone_forwarding(list));
    }
    for list in &lists {
        violations.extend(protocol_serve_stale(list));
    }
    for list in &lists {
        violations.extend(zone_grammar(list));
    }

    violations.extend(check_required_enum(&path.child("mode"), &local_dns.mode));
    for list in &lists {
        for (record_path, record) in list.records() {
            violations.extend(record_fields(record, &record_path));
        }
    }

    violations
}

/// Build the zone index, reporting every repeat of an already indexed zone.
fn index_by_zone<'a>(
    records: &'a [ZoneOverride],
    path: &FieldPath,
) -> (ZoneIndex<'a>, Vec<Violation>) {
    let mut zones = ZoneIndex::new();
    let mut duplicates = Vec::new();

    for (i, record) in records.iter().enumerate() {
        if zones.contains_key(record.zone.as_str()) {
            duplicates.push(Violation::duplicate(&path.index(i).child("zone"), &record.zone));
        } else {
            zones.insert(record.zone.as_str(), i);
        }
    }

    (zones, duplicates)
}

fn required_zones(list: &List<'_>) -> Option<Violation> {
    let missing: Vec<String> = REQUIRED_ZONES
        .iter()
        .filter(|zone| !list.zones.contains_key(*zone))
        .map(|zone| format!("{zone:?}"))
        .collect();

    if missing.is_empty() {
        return None;
    }

    Some(Violation::new(
        &list.path,
        ViolationReason::Required,
        format!(
            "{} must contain required zones \".\" and \"cluster.local\"; missing: {}",
            list.kind.field_name(),
            missing.join(", ")
        ),
    ))
}

fn root_zone_forwarding(list: &List<'_>) -> Vec<Violation> {
    if list.kind != OverrideList::Vnet {
        return vec![];
    }

    list.records()
        .filter(|(_, record)| {
            record.is_root() && record.forward_destination.is(ForwardDestination::ClusterDns)
        })
        .map(|(record_path, _)| {
            Violation::forbidden(
                &record_path.child("forwardDestination"),
                "DNS traffic for root zone cannot be forwarded to ClusterDNS",
            )
        })
        .collect()
}

fn cluster_zone_forwarding(list: &List<'_>) -> Vec<Violation> {
    list.records()
        .filter(|(_, record)| {
            record.is_in_cluster_local()
                && record.forward_destination.is(ForwardDestination::VnetDns)
        })
        .map(|(record_path, record)| {
            Violation::forbidden(
                &record_path.child("forwardDestination"),
                format!("DNS traffic for {} cannot be forwarded to VnetDNS", record.zone),
            )
        })
        .collect()
}

fn protocol_serve_stale(list: &List<'_>) -> Vec<Violation> {
    list.records()
        .filter(|(_, record)| {
            record.protocol.is(DnsProtocol::ForceTcp) && record.serve_stale.is(ServeStale::Verify)
        })
        .map(|(record_path, _)| {
            Violation::forbidden(
                &record_path,
                "serveStale Verify cannot be used with protocol ForceTCP",
            )
        })
        .collect()
}

fn zone_grammar(list: &List<'_>) -> Vec<Violation> {
    list.records
        .iter()
        .enumerate()
        .filter(|(_, record)| !is_valid_zone(&record.zone))
        .map(|(i, record)| {
            Violation::invalid(
                &list.path.index(i).child("zone"),
                format!(
                    "Invalid value: {:?}: must be \".\" or dot-separated labels of 1-63 \
                     alphanumerics, '-' or '_', starting and ending with an alphanumeric",
                    record.zone
                ),
            )
        })
        .collect()
}

/// True for `.` or a dot-separated label sequence with one optional trailing dot
pub fn is_valid_zone(zone: &str) -> bool {
    if zone == ROOT_ZONE {
        return true;
    }
    let name = zone.strip_suffix('.').unwrap_or(zone);
    !name.is_empty() && name.split('.').all(|label| ZONE_LABEL.is_match(label))
}

fn record_fields(record: &ZoneOverride, path: &FieldPath) -> Vec<Violation> {
    [
        check_required_enum(&path.child("queryLogging"), &record.query_logging),
        check_required_enum(&path.child("protocol"), &record.protocol),
        check_required_enum(&path.child("forwardDestination"), &record.forward_destination),
        check_required_enum(&path.child("forwardPolicy"), &record.forward_policy),
        check_range(
            &path.child("maxConcurrent"),
            record.max_concurrent,
            &MAX_CONCURRENT_RANGE,
        ),
        check_duration(&path.child("cacheDuration"), &record.cache_duration),
        check_duration(&path.child("serveStaleDuration"), &record.serve_stale_duration),
        check_required_enum(&path.child("serveStale"), &record.serve_stale),
    ]
    .into_iter()
    .flatten()
    .collect()
}
