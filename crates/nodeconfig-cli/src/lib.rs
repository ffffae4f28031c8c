//! NodeConfig CLI library
//!
//! Lints NodeConfig manifests on disk: validation, fingerprints and drift.

pub mod commands;
pub mod config;
pub mod error;

pub use config::{CliConfig, LogFormat, OutputFormat};
pub use error::{Error, Result};

use std::io::Write;

use clap::{Parser, Subcommand};

/// nodeconfig - Validate and fingerprint NodeConfig manifests
#[derive(Parser, Debug)]
#[command(name = "nodeconfig")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Report format
    #[arg(long, value_enum, default_value = "text", env = "NODECONFIG_OUTPUT", global = true)]
    pub output: OutputFormat,

    /// Log filter directives, e.g. `debug` or `nodeconfig=trace` (overrides RUST_LOG)
    #[arg(long, env = "NODECONFIG_LOG", global = true)]
    pub log_level: Option<String>,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", env = "NODECONFIG_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate NodeConfig manifests and report every violation
    Validate(commands::FileArgs),
    /// Print the spec fingerprint of NodeConfig manifests
    Fingerprint(commands::FileArgs),
    /// Compare recorded fingerprint annotations with the current spec
    Drift(commands::FileArgs),
}

impl Cli {
    /// Resolve flags and environment into a [`CliConfig`]
    pub fn config(&self) -> CliConfig {
        let rust_log = std::env::var("RUST_LOG").ok();
        CliConfig {
            output: self.output,
            log_filter: config::resolve_log_filter(self.log_level.as_deref(), rust_log.as_deref()),
            log_format: self.log_format,
        }
    }

    /// Run the CLI command, writing reports to `out`. Returns the exit status.
    pub fn run(&self, config: &CliConfig, out: &mut impl Write) -> Result<u8> {
        match &self.command {
            Commands::Validate(args) => commands::validate::run(args, config, out),
            Commands::Fingerprint(args) => commands::fingerprint::run(args, config, out),
            Commands::Drift(args) => commands::drift::run(args, config, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "nodeconfig",
            "validate",
            "a.yaml",
            "b.yaml",
            "--output",
            "json",
            "--log-format",
            "json",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match &cli.command {
            Commands::Validate(args) => {
                assert_eq!(args.files, vec![PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.config().log_filter, "debug");
    }

    #[test]
    fn files_are_required() {
        assert!(Cli::try_parse_from(["nodeconfig", "drift"]).is_err());
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        assert!(Cli::try_parse_from(["nodeconfig", "--output", "yaml", "fingerprint", "x"]).is_err());
    }
}
