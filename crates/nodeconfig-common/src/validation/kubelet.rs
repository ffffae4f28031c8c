//! Kubelet option rules
//!
//! Kubelet options never change the fingerprint, but a bad value still breaks
//! node bootstrap, so they are validated like every other field.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;

use super::fields::check_optional_enum;
use super::{check_duration, check_range, FieldPath, Violation, ViolationReason};
use crate::crd::{KubeletOptions, NodeConfigSpec, EVICTION_SIGNALS};

/// Allowed image GC threshold percentages
pub const IMAGE_GC_PERCENT_RANGE: RangeInclusive<i32> = 0..=100;

/// Fewest rotated container log files the kubelet accepts
pub const MIN_CONTAINER_LOG_MAX_FILES: i32 = 2;

/// Smallest pod PID limit; `-1` means unlimited
pub const MIN_POD_PIDS_LIMIT: i64 = -1;

static LOG_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+(Ki|Mi|Gi)?$").expect("log size pattern is a valid regex")
});

/// Validate `spec.kubeletOptions` when present.
pub fn validate(spec: &NodeConfigSpec, root: &FieldPath) -> Vec<Violation> {
    match &spec.kubelet_options {
        Some(options) => validate_options(options, &root.child("kubeletOptions")),
        None => vec![],
    }
}

fn validate_options(options: &KubeletOptions, path: &FieldPath) -> Vec<Violation> {
    let mut violations = Vec::new();

    violations.extend(check_optional_enum(
        &path.child("cpuManagerPolicy"),
        options.cpu_manager_policy.as_ref(),
    ));
    violations.extend(check_optional_enum(
        &path.child("topologyManagerPolicy"),
        options.topology_manager_policy.as_ref(),
    ));

    violations.extend(image_gc_thresholds(options, path));

    if let Some(files) = options.container_log_max_files {
        if files < MIN_CONTAINER_LOG_MAX_FILES {
            violations.push(Violation::invalid(
                &path.child("containerLogMaxFiles"),
                format!("Invalid value: {files}: must be at least {MIN_CONTAINER_LOG_MAX_FILES}"),
            ));
        }
    }

    if let Some(size) = &options.container_log_max_size {
        if !LOG_SIZE.is_match(size) {
            violations.push(Violation::invalid(
                &path.child("containerLogMaxSize"),
                format!("Invalid value: \"{size}\": must be a quantity such as 50Mi"),
            ));
        }
    }

    if let Some(limit) = options.pod_pids_limit {
        if limit < MIN_POD_PIDS_LIMIT {
            violations.push(Violation::invalid(
                &path.child("podPidsLimit"),
                format!("Invalid value: {limit}: must be -1 (unlimited) or greater"),
            ));
        }
    }

    let sysctls = path.child("allowedUnsafeSysctls");
    for (i, sysctl) in options.allowed_unsafe_sysctls.iter().enumerate() {
        if sysctl.trim().is_empty() {
            violations.push(Violation::required(&sysctls.index(i)));
        }
    }

    violations.extend(eviction(options, path));
    violations
}

fn image_gc_thresholds(options: &KubeletOptions, path: &FieldPath) -> Vec<Violation> {
    let high_path = path.child("imageGCHighThresholdPercent");
    let low_path = path.child("imageGCLowThresholdPercent");
    let high = options.image_gc_high_threshold_percent;
    let low = options.image_gc_low_threshold_percent;

    let mut violations: Vec<Violation> = [
        high.and_then(|v| check_range(&high_path, v, &IMAGE_GC_PERCENT_RANGE)),
        low.and_then(|v| check_range(&low_path, v, &IMAGE_GC_PERCENT_RANGE)),
    ]
    .into_iter()
    .flatten()
    .collect();

    if let (Some(high), Some(low)) = (high, low) {
        if low >= high {
            violations.push(Violation::invalid(
                &low_path,
                format!(
                    "Invalid value: {low}: must be less than imageGCHighThresholdPercent ({high})"
                ),
            ));
        }
    }

    violations
}

fn eviction(options: &KubeletOptions, path: &FieldPath) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (name, map) in [
        ("evictionHard", &options.eviction_hard),
        ("evictionSoft", &options.eviction_soft),
        ("evictionSoftGracePeriod", &options.eviction_soft_grace_period),
    ] {
        violations.extend(unknown_signals(map, &path.child(name)));
    }

    let soft = path.child("evictionSoft");
    let grace = path.child("evictionSoftGracePeriod");

    for signal in options.eviction_soft.keys() {
        if !options.eviction_soft_grace_period.contains_key(signal) {
            violations.push(Violation::invalid(
                &soft.key(signal),
                format!("soft eviction signal \"{signal}\" requires an evictionSoftGracePeriod entry"),
            ));
        }
    }

    for (signal, period) in &options.eviction_soft_grace_period {
        let entry = grace.key(signal);
        if !options.eviction_soft.contains_key(signal) {
            violations.push(Violation::invalid(
                &entry,
                format!("grace period for \"{signal}\" has no matching evictionSoft entry"),
            ));
        }
        violations.extend(check_duration(&entry, period));
    }

    violations
}

fn unknown_signals(map: &BTreeMap<String, String>, path: &FieldPath) -> Vec<Violation> {
    map.keys()
        .filter(|signal| !EVICTION_SIGNALS.contains(&signal.as_str()))
        .map(|signal| {
            Violation::new(
                &path.key(signal),
                ViolationReason::NotSupported,
                format!(
                    "Unsupported eviction signal: \"{signal}\": supported signals: {}",
                    EVICTION_SIGNALS.join(", ")
                ),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CpuManagerPolicy, TopologyManagerPolicy};
    use rstest::rstest;

    fn check(options: KubeletOptions) -> Vec<Violation> {
        let spec = NodeConfigSpec {
            kubelet_options: Some(options),
            ..Default::default()
        };
        validate(&spec, &FieldPath::root("spec"))
    }

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn absent_and_default_options_are_valid() {
        assert!(validate(&NodeConfigSpec::default(), &FieldPath::root("spec")).is_empty());
        assert!(check(KubeletOptions::default()).is_empty());
    }

    #[test]
    fn fully_populated_options_are_valid() {
        let options = KubeletOptions {
            cpu_manager_policy: Some(CpuManagerPolicy::Static.into()),
            cpu_cfs_quota: Some(true),
            topology_manager_policy: Some(TopologyManagerPolicy::SingleNumaNode.into()),
            image_gc_high_threshold_percent: Some(85),
            image_gc_low_threshold_percent: Some(80),
            allowed_unsafe_sysctls: vec!["net.core.somaxconn".to_string(), "kernel.msg*".to_string()],
            container_log_max_size: Some("50Mi".to_string()),
            container_log_max_files: Some(5),
            pod_pids_limit: Some(-1),
            eviction_hard: map(&[("memory.available", "100Mi"), ("nodefs.available", "10%")]),
            eviction_soft: map(&[("memory.available", "300Mi")]),
            eviction_soft_grace_period: map(&[("memory.available", "1m30s")]),
        };
        let violations = check(options);
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn unknown_policies_are_not_supported() {
        let violations = check(KubeletOptions {
            cpu_manager_policy: Some("Static".into()),
            topology_manager_policy: Some("best_effort".into()),
            ..Default::default()
        });
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "spec.kubeletOptions.cpuManagerPolicy",
                "spec.kubeletOptions.topologyManagerPolicy"
            ]
        );
        assert!(violations
            .iter()
            .all(|v| v.reason == ViolationReason::NotSupported));
    }

    #[rstest]
    #[case::both_valid(Some(85), Some(80), 0)]
    #[case::equal(Some(80), Some(80), 1)]
    #[case::inverted(Some(50), Some(80), 1)]
    #[case::high_out_of_range(Some(101), Some(80), 1)]
    #[case::low_negative(Some(85), Some(-1), 1)]
    #[case::both_out_and_inverted(Some(-5), Some(120), 3)]
    #[case::bounds(Some(100), Some(0), 0)]
    #[case::only_high(Some(0), None, 0)]
    #[case::only_low(None, Some(100), 0)]
    fn image_gc_thresholds(
        #[case] high: Option<i32>,
        #[case] low: Option<i32>,
        #[case] expected: usize,
    ) {
        let violations = check(KubeletOptions {
            image_gc_high_threshold_percent: high,
            image_gc_low_threshold_percent: low,
            ..Default::default()
        });
        assert_eq!(violations.len(), expected, "{violations:?}");
    }

    #[rstest]
    #[case("10", true)]
    #[case("10Ki", true)]
    #[case("50Mi", true)]
    #[case("1Gi", true)]
    #[case("", false)]
    #[case("10MB", false)]
    #[case("1.5Gi", false)]
    #[case("Mi", false)]
    fn container_log_max_size(#[case] size: &str, #[case] valid: bool) {
        let violations = check(KubeletOptions {
            container_log_max_size: Some(size.to_string()),
            ..Default::default()
        });
        assert_eq!(violations.is_empty(), valid);
    }

    #[rstest]
    #[case::log_files_min(Some(2), None, 0)]
    #[case::log_files_low(Some(1), None, 1)]
    #[case::pids_unlimited(None, Some(-1), 0)]
    #[case::pids_below(None, Some(-2), 1)]
    fn lower_bounds(
        #[case] files: Option<i32>,
        #[case] pids: Option<i64>,
        #[case] expected: usize,
    ) {
        let violations = check(KubeletOptions {
            container_log_max_files: files,
            pod_pids_limit: pids,
            ..Default::default()
        });
        assert_eq!(violations.len(), expected);
    }

    #[test]
    fn empty_sysctl_is_required() {
        let violations = check(KubeletOptions {
            allowed_unsafe_sysctls: vec!["net.ipv4.tcp_keepalive_time".to_string(), " ".to_string()],
            ..Default::default()
        });
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "spec.kubeletOptions.allowedUnsafeSysctls[1]");
        assert_eq!(violations[0].reason, ViolationReason::Required);
    }

    #[test]
    fn unknown_eviction_signals_are_reported_per_map() {
        let violations = check(KubeletOptions {
            eviction_hard: map(&[("memory.free", "1Gi")]),
            eviction_soft: map(&[("cpu.available", "10%")]),
            eviction_soft_grace_period: map(&[("cpu.available", "1m")]),
            ..Default::default()
        });
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "spec.kubeletOptions.evictionHard[\"memory.free\"]",
                "spec.kubeletOptions.evictionSoft[\"cpu.available\"]",
                "spec.kubeletOptions.evictionSoftGracePeriod[\"cpu.available\"]",
            ]
        );
    }

    #[test]
    fn soft_eviction_and_grace_period_must_pair() {
        let violations = check(KubeletOptions {
            eviction_soft: map(&[("memory.available", "300Mi")]),
            eviction_soft_grace_period: map(&[("nodefs.available", "1m")]),
            ..Default::default()
        });
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "spec.kubeletOptions.evictionSoft[\"memory.available\"]",
                "spec.kubeletOptions.evictionSoftGracePeriod[\"nodefs.available\"]",
            ]
        );
    }

    #[test]
    fn grace_period_must_be_a_duration() {
        let violations = check(KubeletOptions {
            eviction_soft: map(&[("memory.available", "300Mi")]),
            eviction_soft_grace_period: map(&[("memory.available", "90 seconds")]),
            ..Default::default()
        });
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("90 seconds"));
    }
}
