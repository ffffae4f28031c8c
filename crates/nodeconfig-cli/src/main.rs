//! NodeConfig CLI
//!
//! Validate, fingerprint and drift-check NodeConfig manifests.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use nodeconfig_cli::{Cli, CliConfig, LogFormat};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config();
    init_tracing(&config);

    let mut stdout = std::io::stdout().lock();
    match cli.run(&config, &mut stdout) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &CliConfig) {
    let registry = tracing_subscriber::registry().with(config.env_filter());
    match config.log_format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
