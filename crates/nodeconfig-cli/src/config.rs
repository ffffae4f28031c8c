//! Resolved CLI configuration
//!
//! Flags and their environment variables are parsed by clap; this module turns
//! them into the settings the commands and the tracing subscriber consume.
//!
//! The log filter resolution chain (highest priority first):
//! 1. `--log-level` flag or `NODECONFIG_LOG`
//! 2. `RUST_LOG`
//! 3. [`DEFAULT_LOG_FILTER`]

use clap::ValueEnum;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Filter used when neither `--log-level` nor `RUST_LOG` is set
pub const DEFAULT_LOG_FILTER: &str = "warn,nodeconfig=info";

/// Report format on stdout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ValueEnum)]
pub enum OutputFormat {
    /// One line per finding (default)
    #[default]
    Text,
    /// JSON array of reports
    Json,
}

/// Log line format on stderr
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines (default)
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Settings shared by every command
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CliConfig {
    /// Report format
    pub output: OutputFormat,
    /// `EnvFilter` directives
    pub log_filter: String,
    /// Log line format
    pub log_format: LogFormat,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output: OutputFormat::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl CliConfig {
    /// Build the tracing filter, falling back to the default on bad directives.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Pick the log filter from the flag, then `RUST_LOG`, then the default.
pub fn resolve_log_filter(flag: Option<&str>, rust_log: Option<&str>) -> String {
    flag.or(rust_log)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_LOG_FILTER)
        .to_string()
}
