//! Fingerprint command

use std::io::Write;

use serde::Serialize;

use super::{load_documents, write_json, FileArgs, EXIT_FAILED, EXIT_OK};
use crate::{CliConfig, OutputFormat, Result};

/// Fingerprint of one document
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintReport {
    pub file: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn run(args: &FileArgs, config: &CliConfig, out: &mut impl Write) -> Result<u8> {
    let reports: Vec<FingerprintReport> = load_documents(&args.files)?
        .into_iter()
        .map(|doc| {
            let (digest, version, error) = match &doc.resource {
                Ok(nc) => {
                    let fp = nc.fingerprint();
                    (Some(fp.digest), Some(fp.version), None)
                }
                Err(e) => (None, None, Some(e.clone())),
            };
            FingerprintReport {
                file: doc.file,
                name: doc.name,
                digest,
                version,
                error,
            }
        })
        .collect();

    match config.output {
        OutputFormat::Text => {
            for report in &reports {
                match (&report.digest, &report.version, &report.error) {
                    (Some(digest), Some(version), _) => writeln!(
                        out,
                        "{}:{}: {digest} {version}",
                        report.file, report.name
                    )?,
                    (_, _, error) => writeln!(
                        out,
                        "{}:{}: error: {}",
                        report.file,
                        report.name,
                        error.as_deref().unwrap_or("unknown")
                    )?,
                }
            }
        }
        OutputFormat::Json => write_json(out, &reports)?,
    }

    let failed = reports.iter().any(|r| r.error.is_some());
    Ok(if failed { EXIT_FAILED } else { EXIT_OK })
}
