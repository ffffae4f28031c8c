//! YAML decoding for NodeConfig manifests
//!
//! Manifests are parsed with yaml-rust2, bridged into `serde_json::Value`, and
//! only then decoded into typed resources. Keeping serde_json as the single
//! typed layer means YAML and JSON inputs decode through the same code path.

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use yaml_rust2::{Yaml, YamlLoader};

/// Error type for YAML parsing
#[derive(Debug, Clone)]
pub struct YamlError(String);

impl std::fmt::Display for YamlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for YamlError {}

/// Parse a YAML string into a serde_json::Value.
///
/// For multi-document YAML, returns only the first document.
/// Returns `Value::Null` for empty input.
pub fn parse_yaml(input: &str) -> Result<Value, YamlError> {
    let docs = YamlLoader::load_from_str(input).map_err(|e| YamlError(e.to_string()))?;
    match docs.into_iter().next() {
        Some(doc) => yaml_to_json(doc),
        None => Ok(Value::Null),
    }
}

/// Parse a multi-document YAML string, one Value per `---` separated document.
///
/// Empty documents (e.g. a trailing `---`) are dropped.
pub fn parse_yaml_multi(input: &str) -> Result<Vec<Value>, YamlError> {
    let docs = YamlLoader::load_from_str(input).map_err(|e| YamlError(e.to_string()))?;
    docs.into_iter()
        .map(yaml_to_json)
        .filter(|doc| !matches!(doc, Ok(Value::Null)))
        .collect()
}

/// Decode the first YAML document into `T`.
pub fn from_yaml<T: DeserializeOwned>(input: &str) -> crate::Result<T> {
    let value = parse_yaml(input)?;
    Ok(serde_json::from_value(value)?)
}

fn yaml_to_json(yaml: Yaml) -> Result<Value, YamlError> {
    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Boolean(b) => Ok(Value::Bool(b)),
        Yaml::Integer(i) => Ok(Value::Number(i.into())),
        Yaml::Real(s) => {
            let f: f64 = s
                .parse()
                .map_err(|e: std::num::ParseFloatError| YamlError(format!("{s}: {e}")))?;
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| YamlError(format!("non-finite number {s} is not representable")))
        }
        Yaml::String(s) => Ok(Value::String(s)),
        Yaml::Array(arr) => arr
            .into_iter()
            .map(yaml_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Yaml::Hash(map) => map
            .into_iter()
            .map(|(k, v)| {
                let key = match k {
                    Yaml::String(s) => s,
                    Yaml::Integer(i) => i.to_string(),
                    Yaml::Real(r) => r,
                    Yaml::Boolean(b) => b.to_string(),
                    _ => return Err(YamlError("unsupported YAML key type".to_string())),
                };
                yaml_to_json(v).map(|v| (key, v))
            })
            .collect::<Result<Map<String, Value>, _>>()
            .map(Value::Object),
        Yaml::Alias(_) => Err(YamlError("YAML aliases not supported".to_string())),
        Yaml::BadValue => Err(YamlError("bad YAML value".to_string())),
    }
}
