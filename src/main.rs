//! sdgflow: a table-driven state controller for multi-agent synthetic data
//! generation workflows.
//!
//! Parses arguments, installs logging, dispatches to the command handlers
//! and maps errors to exit codes.

mod agent;
mod cli;
mod commands;
mod config;
mod context;
mod controller;
mod error;
mod events;
mod exit_codes;
mod fs;
mod locks;
mod session;
mod shell;
mod validate;
mod workflow;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // RUST_LOG wins over --log-level. Logs go to stderr; stdout carries
    // command output and --json.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
