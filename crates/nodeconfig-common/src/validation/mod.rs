//! Validation of NodeConfig specs
//!
//! Every rule is an independent function returning the violations it found.
//! [`validate`] runs all of them and concatenates the results; no rule can
//! suppress another, so callers always see the complete violation set.
//!
//! - [`fields`] - subnet reference, tags, numeric ranges, top-level enums
//! - [`kubelet`] - kubelet option ranges and cross-field rules
//! - [`image_security`] - image family / security mode compatibility table
//! - [`local_dns`] - DNS override constraint passes and per-record checks

pub mod fields;
pub mod image_security;
pub mod kubelet;
pub mod local_dns;

mod path;

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crd::{KnownValues, NodeConfigSpec};

pub use path::FieldPath;

/// Signature shared by every spec-level validator
pub type Validator = fn(&NodeConfigSpec, &FieldPath) -> Vec<Violation>;

/// Validators run by [`validate`], in reporting order
pub const VALIDATORS: &[Validator] = &[
    fields::validate_subnet_reference,
    fields::validate_tags,
    fields::validate_ranges,
    fields::validate_enums,
    image_security::validate,
    kubelet::validate,
    local_dns::validate,
];

/// Run every validator against `spec` and collect all violations.
pub fn validate(spec: &NodeConfigSpec) -> ValidationResult {
    let root = FieldPath::root("spec");
    let violations: Vec<Violation> = VALIDATORS
        .iter()
        .flat_map(|validator| validator(spec, &root))
        .collect();

    debug!(violations = violations.len(), "validated node config spec");
    ValidationResult { violations }
}

/// Category of a violation
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum ViolationReason {
    /// A required value is missing or empty
    Required,
    /// The value has the wrong shape or is out of range
    Invalid,
    /// The value is not a member of the supported set
    NotSupported,
    /// The value repeats a key that must be unique
    Duplicate,
    /// The value exceeds a length limit
    TooLong,
    /// The value is well formed but not allowed in combination with others
    Forbidden,
}

/// A single failed rule
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Path of the offending field, e.g. `spec.tags["env"]`
    #[serde(rename = "fieldPath")]
    pub field: String,
    /// Category of the failure
    pub reason: ViolationReason,
    /// Human-readable description
    pub message: String,
}

impl Violation {
    /// Create a violation at `path`
    pub fn new(path: &FieldPath, reason: ViolationReason, message: impl Into<String>) -> Self {
        Self {
            field: path.to_string(),
            reason,
            message: message.into(),
        }
    }

    /// A required value is missing
    pub fn required(path: &FieldPath) -> Self {
        Self::new(path, ViolationReason::Required, "Required value")
    }

    /// The value is malformed or out of range
    pub fn invalid(path: &FieldPath, message: impl Into<String>) -> Self {
        Self::new(path, ViolationReason::Invalid, message)
    }

    /// The value is not one of `E`'s members
    pub fn not_supported<E: KnownValues>(path: &FieldPath, value: &str) -> Self {
        Self::new(
            path,
            ViolationReason::NotSupported,
            format!(
                "Unsupported value: \"{}\": supported values: {}",
                value,
                E::supported_values()
            ),
        )
    }

    /// The key repeats an earlier entry
    pub fn duplicate(path: &FieldPath, value: &str) -> Self {
        Self::new(
            path,
            ViolationReason::Duplicate,
            format!("Duplicate value: \"{value}\""),
        )
    }

    /// The value is longer than `max` characters
    pub fn too_long(path: &FieldPath, what: &str, max: usize) -> Self {
        Self::new(
            path,
            ViolationReason::TooLong,
            format!("{what} must have at most {max} characters"),
        )
    }

    /// The value is not allowed in combination with other fields
    pub fn forbidden(path: &FieldPath, message: impl Into<String>) -> Self {
        Self::new(path, ViolationReason::Forbidden, message)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All violations found for one spec
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ValidationResult {
    violations: Vec<Violation>,
}

impl ValidationResult {
    /// True when no rule failed
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of violations
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True when no rule failed
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Every violation, in validator order
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Iterate violations
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }

    /// Violations whose field path starts with `prefix`
    pub fn for_field<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations
            .iter()
            .filter(move |v| v.field.starts_with(prefix))
    }

    /// `Ok(())` when valid, otherwise [`Error::Validation`](crate::Error::Validation)
    pub fn into_result(self) -> crate::Result<()> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(crate::Error::validation(self.violations))
        }
    }
}

impl IntoIterator for ValidationResult {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationResult {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

/// Check `value` against a closed interval.
pub(crate) fn check_range<T>(
    path: &FieldPath,
    value: T,
    range: &RangeInclusive<T>,
) -> Option<Violation>
where
    T: PartialOrd + fmt::Display,
{
    if range.contains(&value) {
        None
    } else {
        Some(Violation::invalid(
            path,
            format!(
                "Invalid value: {}: must be between {} and {}",
                value,
                range.start(),
                range.end()
            ),
        ))
    }
}

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(s|m|h))+$").expect("duration pattern is a valid regex")
});

/// True for durations such as `90s`, `1h30m` or `0s`
pub(crate) fn is_duration(value: &str) -> bool {
    DURATION.is_match(value)
}

/// Check a duration field, reporting the raw value when it does not parse.
pub(crate) fn check_duration(path: &FieldPath, value: &str) -> Option<Violation> {
    (!is_duration(value)).then(|| {
        Violation::invalid(
            path,
            format!("Invalid value: \"{value}\": must be a duration such as 90s, 5m or 1h30m"),
        )
    })
}
