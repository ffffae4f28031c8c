//! Open enum fields
//!
//! User input may carry enum strings the model does not know. Rejecting them
//! in the decoder would stop at the first bad value, so enum fields are held
//! as [`EnumValue`] and the validators report unknown strings together with
//! every other violation.

use std::fmt;

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A closed set of string values with a fixed wire spelling.
pub trait KnownValues: Copy + PartialEq + fmt::Debug + 'static {
    /// Every member of the set, in documentation order
    const ALL: &'static [Self];

    /// Wire spelling of this member
    fn as_str(self) -> &'static str;

    /// Look up a member by its exact wire spelling
    fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }

    /// Comma-separated, quoted list of supported spellings for error messages
    fn supported_values() -> String {
        Self::ALL
            .iter()
            .map(|v| format!("\"{}\"", v.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// An enum-typed field value that may hold an unrecognised string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EnumValue<E> {
    /// A member of the known value set
    Known(E),
    /// Raw input that matched no known member (including the empty string)
    Unknown(String),
}

impl<E: KnownValues> EnumValue<E> {
    /// The known member, if any
    pub fn known(&self) -> Option<E> {
        match self {
            Self::Known(v) => Some(*v),
            Self::Unknown(_) => None,
        }
    }

    /// Wire spelling, raw input for unknown values
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(v) => v.as_str(),
            Self::Unknown(s) => s,
        }
    }

    /// True when this holds exactly `value`
    pub fn is(&self, value: E) -> bool {
        self.known() == Some(value)
    }

    /// True for the empty string, which callers treat as "unset"
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Unknown(s) if s.is_empty())
    }
}

impl<E: KnownValues> From<E> for EnumValue<E> {
    fn from(value: E) -> Self {
        Self::Known(value)
    }
}

impl<E: KnownValues> From<&str> for EnumValue<E> {
    fn from(s: &str) -> Self {
        match E::parse(s) {
            Some(v) => Self::Known(v),
            None => Self::Unknown(s.to_string()),
        }
    }
}

impl<E: KnownValues> fmt::Display for EnumValue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<E: KnownValues> Serialize for EnumValue<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de, E: KnownValues> Deserialize<'de> for EnumValue<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

// The published schema advertises only the known members.
impl<E: JsonSchema> JsonSchema for EnumValue<E> {
    fn schema_name() -> String {
        E::schema_name()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        E::json_schema(gen)
    }
}
