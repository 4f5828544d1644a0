//! # mcpreg-validate entry point
//!
//! Parses arguments, configures tracing, and runs a single validation.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mcpreg_cli::validate::{run_validate, ValidateArgs, EXIT_FAILURE};

/// Validate an MCP registry server.json against the JSON Schema named by
/// its `$schema` field.
#[derive(Parser, Debug)]
#[command(name = "mcpreg-validate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    validate: ValidateArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        "mcpreg-validate starting"
    );

    let mut out = std::io::stdout().lock();
    match run_validate(&cli.validate, &mut out) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
