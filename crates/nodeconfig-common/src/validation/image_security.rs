//! Image family / security mode compatibility

use super::{FieldPath, Violation};
use crate::crd::{ImageFamily, KnownValues, NodeConfigSpec, SecurityMode};

/// Image families each security mode cannot run on.
///
/// Modes without an entry are compatible with every image family.
pub const INCOMPATIBLE_IMAGE_FAMILIES: &[(SecurityMode, &[ImageFamily])] = &[(
    SecurityMode::Fips,
    &[ImageFamily::Ubuntu2204, ImageFamily::Ubuntu2404],
)];

/// True when `mode` may be used with `family`
pub fn is_compatible(mode: SecurityMode, family: ImageFamily) -> bool {
    !INCOMPATIBLE_IMAGE_FAMILIES
        .iter()
        .any(|(m, families)| *m == mode && families.contains(&family))
}

/// Reject security modes the selected image family does not support.
///
/// Unset or unrecognised values are left to the enum validator.
pub fn validate(spec: &NodeConfigSpec, root: &FieldPath) -> Vec<Violation> {
    let (Some(mode), Some(family)) = (spec.security_mode(), spec.image_family()) else {
        return vec![];
    };

    if is_compatible(mode, family) {
        return vec![];
    }

    vec![Violation::forbidden(
        &root.child("securityMode"),
        format!(
            "securityMode {} is not supported for imageFamily {}",
            mode.as_str(),
            family.as_str()
        ),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ViolationReason;
    use rstest::rstest;

    fn spec(family: Option<&str>, mode: Option<&str>) -> NodeConfigSpec {
        NodeConfigSpec {
            image_family: family.map(Into::into),
            security_mode: mode.map(Into::into),
            ..Default::default()
        }
    }

    #[rstest]
    #[case("Ubuntu2204", "FIPS", 1)]
    #[case("Ubuntu2404", "FIPS", 1)]
    #[case("UbuntuGeneric", "FIPS", 0)]
    #[case("AzureLinux", "FIPS", 0)]
    #[case("Ubuntu2204", "Disabled", 0)]
    #[case("Ubuntu2404", "Disabled", 0)]
    #[case("UbuntuGeneric", "Disabled", 0)]
    #[case("AzureLinux", "Disabled", 0)]
    fn compatibility_matrix(#[case] family: &str, #[case] mode: &str, #[case] expected: usize) {
        let violations = validate(&spec(Some(family), Some(mode)), &FieldPath::root("spec"));
        assert_eq!(violations.len(), expected);
    }

    #[test]
    fn fips_on_ubuntu_2204_names_both_values() {
        let violations = validate(
            &spec(Some("Ubuntu2204"), Some("FIPS")),
            &FieldPath::root("spec"),
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "spec.securityMode");
        assert_eq!(violations[0].reason, ViolationReason::Forbidden);
        assert!(violations[0].message.contains("FIPS"));
        assert!(violations[0].message.contains("Ubuntu2204"));
    }

    #[rstest]
    #[case::no_mode(Some("Ubuntu2204"), None)]
    #[case::no_family(None, Some("FIPS"))]
    #[case::unknown_family(Some("Windows"), Some("FIPS"))]
    #[case::unknown_mode(Some("Ubuntu2204"), Some("fips"))]
    fn unset_or_unknown_values_are_skipped(
        #[case] family: Option<&str>,
        #[case] mode: Option<&str>,
    ) {
        assert!(validate(&spec(family, mode), &FieldPath::root("spec")).is_empty());
    }

    #[test]
    fn every_known_pair_is_covered_by_the_table() {
        for &mode in SecurityMode::ALL {
            for &family in ImageFamily::ALL {
                let expected = !(mode == SecurityMode::Fips
                    && matches!(family, ImageFamily::Ubuntu2204 | ImageFamily::Ubuntu2404));
                assert_eq!(is_compatible(mode, family), expected, "{mode:?} / {family:?}");
            }
        }
    }
}
