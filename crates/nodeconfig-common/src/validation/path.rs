//! Field paths for violation reporting

use std::fmt;

/// Path to a field in dot/bracket notation, e.g.
/// `spec.localDNS.vnetDNSOverrides["cluster.local"].forwardDestination`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPath {
    rendered: String,
}

impl FieldPath {
    /// Start a path at `name`
    pub fn root(name: &str) -> Self {
        Self {
            rendered: name.to_string(),
        }
    }

    /// Descend into a named field
    pub fn child(&self, name: &str) -> Self {
        Self {
            rendered: format!("{}.{}", self.rendered, name),
        }
    }

    /// Descend into a list element by position
    pub fn index(&self, i: usize) -> Self {
        Self {
            rendered: format!("{}[{}]", self.rendered, i),
        }
    }

    /// Descend into a map entry (or keyed list element) by key. The key is
    /// rendered as a JSON string.
    pub fn key(&self, key: &str) -> Self {
        Self {
            rendered: format!("{}[{}]", self.rendered, serde_json::Value::from(key)),
        }
    }

    /// Rendered path
    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_children_indices_and_keys() {
        let spec = FieldPath::root("spec");
        assert_eq!(
            spec.child("localDNS")
                .child("vnetDNSOverrides")
                .key("cluster.local")
                .child("forwardDestination")
                .as_str(),
            "spec.localDNS.vnetDNSOverrides[\"cluster.local\"].forwardDestination"
        );
        assert_eq!(
            spec.child("localDNS").child("kubeDNSOverrides").index(2).child("zone").to_string(),
            "spec.localDNS.kubeDNSOverrides[2].zone"
        );
    }

    #[test]
    fn keys_are_escaped() {
        let p = FieldPath::root("spec").child("tags").key("a\"b");
        assert_eq!(p.as_str(), "spec.tags[\"a\\\"b\"]");
    }

    #[test]
    fn control_and_non_ascii_keys_use_json_quoting() {
        let tags = FieldPath::root("spec").child("tags");
        assert_eq!(tags.key("a\u{1}b").as_str(), r#"spec.tags["a\u0001b"]"#);
        assert_eq!(tags.key("line\nbreak").as_str(), r#"spec.tags["line\nbreak"]"#);
        assert_eq!(tags.key("caf\u{e9}").as_str(), "spec.tags[\"caf\u{e9}\"]");
    }
}
