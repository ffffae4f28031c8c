//! CLI commands
//!
//! Every command reads multi-document YAML files, decodes each `NodeConfig`
//! document and reports per document. Documents of other kinds are skipped.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use nodeconfig_common::crd::NodeConfig;
use nodeconfig_common::yaml::parse_yaml_multi;

use crate::{Error, Result};

pub mod drift;
pub mod fingerprint;
pub mod validate;

/// Exit status when every document passed
pub const EXIT_OK: u8 = 0;
/// Exit status when a document failed to decode or validate
pub const EXIT_FAILED: u8 = 1;
/// Exit status when a document drifted or its drift is unknown
pub const EXIT_DRIFT: u8 = 2;

const NODE_CONFIG_KIND: &str = "NodeConfig";

/// Manifest files to read
#[derive(Args, Debug)]
pub struct FileArgs {
    /// Manifest files; each may hold several YAML documents
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// One `NodeConfig` document and its decode outcome
#[derive(Debug)]
pub struct Document {
    /// File the document came from
    pub file: String,
    /// `metadata.name`, or `<unnamed>`
    pub name: String,
    /// Decoded resource, or the decode error message
    pub resource: std::result::Result<NodeConfig, String>,
}

/// Load every `NodeConfig` document from `files`, in order.
pub fn load_documents(files: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for path in files {
        documents.extend(load_file(path)?);
    }
    Ok(documents)
}

fn load_file(path: &Path) -> Result<Vec<Document>> {
    let text = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    let values = parse_yaml_multi(&text).map_err(nodeconfig_common::Error::from)?;
    let file = path.display().to_string();

    let mut documents = Vec::new();
    for (index, value) in values.into_iter().enumerate() {
        let kind = value.get("kind").and_then(Value::as_str).unwrap_or_default();
        if kind != NODE_CONFIG_KIND {
            debug!(file = %file, index, kind, "skipping document");
            continue;
        }

        let name = value
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();
        let resource = serde_json::from_value::<NodeConfig>(value).map_err(|e| {
            nodeconfig_common::Error::serialization_for_kind(NODE_CONFIG_KIND, e.to_string())
                .to_string()
        });

        documents.push(Document {
            file: file.clone(),
            name,
            resource,
        });
    }

    if documents.is_empty() {
        return Err(Error::input(format!(
            "{file}: no {NODE_CONFIG_KIND} documents found"
        )));
    }

    debug!(file = %file, documents = documents.len(), "loaded manifests");
    Ok(documents)
}

/// Write `value` as pretty JSON followed by a newline
pub fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
