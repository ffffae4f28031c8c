//! Validate command

use std::io::Write;

use serde::Serialize;
use tracing::info;

use nodeconfig_common::Violation;

use super::{load_documents, write_json, FileArgs, EXIT_FAILED, EXIT_OK};
use crate::{CliConfig, OutputFormat, Result};

/// Validation outcome for one document
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub file: String,
    pub name: String,
    pub valid: bool,
    pub violations: Vec<Violation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn run(args: &FileArgs, config: &CliConfig, out: &mut impl Write) -> Result<u8> {
    let reports: Vec<ValidationReport> = load_documents(&args.files)?
        .into_iter()
        .map(|doc| match &doc.resource {
            Ok(nc) => {
                let violations: Vec<Violation> = nc.validate().into_iter().collect();
                ValidationReport {
                    valid: violations.is_empty(),
                    violations,
                    error: None,
                    file: doc.file,
                    name: doc.name,
                }
            }
            Err(e) => ValidationReport {
                valid: false,
                violations: vec![],
                error: Some(e.clone()),
                file: doc.file,
                name: doc.name,
            },
        })
        .collect();

    match config.output {
        OutputFormat::Text => print_text(&reports, out)?,
        OutputFormat::Json => write_json(out, &reports)?,
    }

    let failed = reports.iter().filter(|r| !r.valid).count();
    info!(documents = reports.len(), failed, "validation finished");
    Ok(if failed == 0 { EXIT_OK } else { EXIT_FAILED })
}

fn print_text(reports: &[ValidationReport], out: &mut impl Write) -> Result<()> {
    for report in reports {
        let label = format!("{}:{}", report.file, report.name);
        if let Some(error) = &report.error {
            writeln!(out, "{label}: error: {error}")?;
        } else if report.valid {
            writeln!(out, "{label}: ok")?;
        } else {
            for violation in &report.violations {
                writeln!(out, "{label}: {}: {}", violation.field, violation.message)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{args, manifest, INVALID, VALID};

    fn run_to_string(files: &[&tempfile::NamedTempFile], output: OutputFormat) -> (u8, String) {
        let config = CliConfig {
            output,
            ..Default::default()
        };
        let mut out = Vec::new();
        let code = run(&args(files), &config, &mut out).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn valid_manifest_exits_zero() {
        let file = manifest(&[VALID]);
        let (code, out) = run_to_string(&[&file], OutputFormat::Text);
        assert_eq!(code, EXIT_OK);
        assert!(out.trim_end().ends_with(":good: ok"), "{out}");
    }

    #[test]
    fn every_violation_is_printed() {
        let file = manifest(&[VALID, INVALID]);
        let (code, out) = run_to_string(&[&file], OutputFormat::Text);
        assert_eq!(code, EXIT_FAILED);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3, "{out}");
        assert!(lines[1].contains(":bad: spec.maxPods: "));
        assert!(lines[2].contains(":bad: spec.securityMode: "));
    }

    #[test]
    fn json_output_lists_reports() {
        let valid = manifest(&[VALID]);
        let invalid = manifest(&[INVALID]);
        let (code, out) = run_to_string(&[&valid, &invalid], OutputFormat::Json);
        assert_eq!(code, EXIT_FAILED);

        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        let reports = json.as_array().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0]["valid"], true);
        assert_eq!(reports[1]["name"], "bad");
        assert_eq!(reports[1]["violations"][0]["fieldPath"], "spec.maxPods");
        assert!(reports[1].get("error").is_none());
    }

    #[test]
    fn decode_error_fails_validation() {
        let file = manifest(&[
            "apiVersion: nodeconfig.dev/v1alpha1\nkind: NodeConfig\nmetadata:\n  name: odd\nspec:\n  tags: [a, b]\n",
        ]);
        let (code, out) = run_to_string(&[&file], OutputFormat::Text);
        assert_eq!(code, EXIT_FAILED);
        assert!(out.contains(":odd: error: "), "{out}");
    }
}
