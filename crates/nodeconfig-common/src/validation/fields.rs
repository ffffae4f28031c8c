//! Independent field-level rules for the top of the spec

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;

use super::{check_range, FieldPath, Violation};
use crate::crd::{EnumValue, KnownValues, NodeConfigSpec};

/// Allowed OS disk sizes in GB
pub const OS_DISK_SIZE_GB_RANGE: RangeInclusive<i32> = 30..=2048;

/// Allowed pods per node
pub const MAX_PODS_RANGE: RangeInclusive<i32> = 10..=250;

/// Maximum tag key length, in characters
pub const MAX_TAG_KEY_LEN: usize = 512;

/// Maximum tag value length, in characters
pub const MAX_TAG_VALUE_LEN: usize = 256;

/// Characters a tag key may not contain
pub const FORBIDDEN_TAG_KEY_CHARS: &[char] = &['<', '>', '%', '&', '\\', '?'];

/// Subnet resource ID:
/// `/subscriptions/<guid>/resourceGroups/<rg>/providers/Microsoft.Network/virtualNetworks/<vnet>/subnets/<subnet>`
static SUBNET_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^/subscriptions/[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
        r"/resourceGroups/[a-z0-9_().-]{0,89}[a-z0-9_()-]",
        r"/providers/Microsoft\.Network",
        r"/virtualNetworks/[a-z0-9][a-z0-9_.-]{0,62}",
        r"/subnets/[a-z0-9][a-z0-9_.-]{0,62}$",
    ))
    .expect("subnet reference pattern is a valid regex")
});

/// `subnetReference` must be a well-formed subnet resource ID when present.
///
/// Only the shape is checked; the subnet is not looked up.
pub fn validate_subnet_reference(spec: &NodeConfigSpec, root: &FieldPath) -> Vec<Violation> {
    match spec.subnet_reference.as_deref() {
        Some(subnet) if !SUBNET_REFERENCE.is_match(subnet) => vec![Violation::invalid(
            &root.child("subnetReference"),
            format!(
                "Invalid value: \"{subnet}\": must be a subnet resource ID of the form \
                 /subscriptions/<id>/resourceGroups/<group>/providers/Microsoft.Network/\
                 virtualNetworks/<vnet>/subnets/<subnet>"
            ),
        )],
        _ => vec![],
    }
}

/// Tag keys and values must respect the cloud's length and charset limits.
pub fn validate_tags(spec: &NodeConfigSpec, root: &FieldPath) -> Vec<Violation> {
    let tags = root.child("tags");
    let mut violations = Vec::new();

    for (key, value) in &spec.tags {
        let path = tags.key(key);

        if key.chars().count() > MAX_TAG_KEY_LEN {
            violations.push(Violation::too_long(&path, "tag key", MAX_TAG_KEY_LEN));
        }

        if let Some(c) = key.chars().find(|c| FORBIDDEN_TAG_KEY_CHARS.contains(c)) {
            violations.push(Violation::invalid(
                &path,
                format!("tag key contains disallowed character '{c}' (disallowed: < > % & \\ ?)"),
            ));
        }

        if value.chars().count() > MAX_TAG_VALUE_LEN {
            violations.push(Violation::too_long(&path, "tag value", MAX_TAG_VALUE_LEN));
        }
    }

    violations
}

/// Numeric top-level fields must fall inside their closed intervals.
pub fn validate_ranges(spec: &NodeConfigSpec, root: &FieldPath) -> Vec<Violation> {
    [
        spec.os_disk_size_gb.and_then(|v| {
            check_range(&root.child("osDiskSizeGB"), v, &OS_DISK_SIZE_GB_RANGE)
        }),
        spec.max_pods
            .and_then(|v| check_range(&root.child("maxPods"), v, &MAX_PODS_RANGE)),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Optional top-level enums must hold a known value when set.
///
/// An empty string counts as unset.
pub fn validate_enums(spec: &NodeConfigSpec, root: &FieldPath) -> Vec<Violation> {
    [
        check_optional_enum(&root.child("imageFamily"), spec.image_family.as_ref()),
        check_optional_enum(&root.child("securityMode"), spec.security_mode.as_ref()),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Report an unknown value of an optional enum field, ignoring empty strings.
pub(crate) fn check_optional_enum<E: KnownValues>(
    path: &FieldPath,
    value: Option<&EnumValue<E>>,
) -> Option<Violation> {
    match value {
        Some(EnumValue::Unknown(raw)) if !raw.is_empty() => {
            Some(Violation::not_supported::<E>(path, raw))
        }
        _ => None,
    }
}

/// Report an unknown or empty value of a required enum field.
pub(crate) fn check_required_enum<E: KnownValues>(
    path: &FieldPath,
    value: &EnumValue<E>,
) -> Option<Violation> {
    match value {
        EnumValue::Known(_) => None,
        EnumValue::Unknown(raw) if raw.is_empty() => Some(Violation::required(path)),
        EnumValue::Unknown(raw) => Some(Violation::not_supported::<E>(path, raw)),
    }
}
