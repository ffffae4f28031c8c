//! Drift command

use std::io::Write;

use serde::Serialize;
use tracing::info;

use nodeconfig_common::DriftStatus;

use super::{load_documents, write_json, FileArgs, EXIT_DRIFT, EXIT_FAILED, EXIT_OK};
use crate::{CliConfig, OutputFormat, Result};

/// Drift of one document against its recorded annotations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    pub file: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DriftStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn run(args: &FileArgs, config: &CliConfig, out: &mut impl Write) -> Result<u8> {
    let reports: Vec<DriftReport> = load_documents(&args.files)?
        .into_iter()
        .map(|doc| match &doc.resource {
            Ok(nc) => DriftReport {
                status: Some(nc.drift()),
                stored_digest: nc.stored_fingerprint().and_then(|s| s.digest),
                current_digest: Some(nc.fingerprint().digest),
                error: None,
                file: doc.file,
                name: doc.name,
            },
            Err(e) => DriftReport {
                status: None,
                stored_digest: None,
                current_digest: None,
                error: Some(e.clone()),
                file: doc.file,
                name: doc.name,
            },
        })
        .collect();

    match config.output {
        OutputFormat::Text => {
            for report in &reports {
                match (report.status, &report.error) {
                    (Some(status), _) => {
                        writeln!(out, "{}:{}: {status}", report.file, report.name)?
                    }
                    (None, error) => writeln!(
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

    let drifted = reports
        .iter()
        .filter(|r| matches!(r.status, Some(DriftStatus::Drifted | DriftStatus::Unknown)))
        .count();
    info!(documents = reports.len(), drifted, "drift check finished");

    Ok(if reports.iter().any(|r| r.error.is_some()) {
        EXIT_FAILED
    } else if drifted > 0 {
        EXIT_DRIFT
    } else {
        EXIT_OK
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{args, manifest, VALID};
    use nodeconfig_common::crd::NodeConfig;
    use nodeconfig_common::yaml::from_yaml;
    use nodeconfig_common::HASH_VERSION;

    /// VALID with its current fingerprint recorded in annotations
    fn annotated() -> String {
        let nc: NodeConfig = from_yaml(VALID).unwrap();
        let digest = nc.fingerprint().digest;
        VALID.replace(
            "  name: good\n",
            &format!(
                "  name: good\n  annotations:\n    nodeconfig.dev/spec-hash: \"{digest}\"\n    nodeconfig.dev/spec-hash-version: \"{HASH_VERSION}\"\n"
            ),
        )
    }

    /// Exit code and output lines with the file prefix stripped
    fn check(docs: &[&str]) -> (u8, String) {
        let file = manifest(docs);
        let mut out = Vec::new();
        let code = run(&args(&[&file]), &CliConfig::default(), &mut out).unwrap();
        let prefix = format!("{}:", file.path().display());
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out
            .lines()
            .map(|line| line.strip_prefix(&prefix).unwrap_or(line))
            .collect();
        (code, lines.join("\n"))
    }

    #[test]
    fn recorded_fingerprint_matches() {
        let (code, out) = check(&[&annotated()]);
        assert_eq!(code, EXIT_OK);
        assert_eq!(out, "good: Unchanged");
    }

    #[test]
    fn missing_annotations_are_unknown() {
        let (code, out) = check(&[VALID]);
        assert_eq!(code, EXIT_DRIFT);
        assert_eq!(out, "good: Unknown");
    }

    #[test]
    fn changed_spec_is_drifted() {
        let changed = annotated().replace("maxPods: 110", "maxPods: 120");
        let (code, out) = check(&[&changed]);
        assert_eq!(code, EXIT_DRIFT);
        assert_eq!(out, "good: Drifted");
    }

    #[test]
    fn stale_hash_version_is_unknown() {
        let stale = annotated().replace(
            &format!("spec-hash-version: \"{HASH_VERSION}\""),
            "spec-hash-version: \"v0\"",
        );
        let (code, out) = check(&[&stale]);
        assert_eq!(code, EXIT_DRIFT);
        assert_eq!(out, "good: Unknown");
    }

    #[test]
    fn same_name_in_two_files_is_told_apart() {
        let first = manifest(&[VALID]);
        let second = manifest(&[&annotated()]);
        let mut out = Vec::new();
        let code = run(&args(&[&first, &second]), &CliConfig::default(), &mut out).unwrap();
        assert_eq!(code, EXIT_DRIFT);

        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                format!("{}:good: Unknown", first.path().display()),
                format!("{}:good: Unchanged", second.path().display()),
            ]
        );
    }

    #[test]
    fn json_report_carries_both_digests() {
        let file = manifest(&[&annotated()]);
        let config = CliConfig {
            output: OutputFormat::Json,
            ..Default::default()
        };
        let mut out = Vec::new();
        run(&args(&[&file]), &config, &mut out).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json[0]["status"], "Unchanged");
        assert_eq!(json[0]["storedDigest"], json[0]["currentDigest"]);
    }
}
