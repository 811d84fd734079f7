//! `wizard-bind`: derive gateway routing configuration
//!
//! ```bash
//! # Emit the deployment manifest for the bundled definition
//! wizard-bind bind --config binder.toml --output manifest.json
//!
//! # Check handler completeness only
//! wizard-bind check --definition string-wizard.yaml --config binder.toml
//!
//! # Show the bound routing table
//! wizard-bind routes --config binder.toml --format table
//! ```
//!
//! Exit codes: 0 success, 3 invalid input, 4 file error, 6 binding failure,
//! 10 internal error.

use clap::Parser;
use string_wizard_binder::{run_cli, BindCli};

fn main() {
    let cli = BindCli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let exit_code = run_cli(cli);
    std::process::exit(exit_code.into());
}
