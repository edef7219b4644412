//! Copatch: scan a container image for fixable vulnerabilities, then patch it.
//!
//! This is the main entry point for the `copatch` CLI. It parses arguments,
//! sets up diagnostic logging, dispatches to the appropriate command handler,
//! and handles errors with proper exit codes.

mod cli;
mod commands;
pub mod capability;
pub mod classify;
pub mod config;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod images;
pub mod invocation;
pub mod observer;
pub mod process;
pub mod report;
pub mod workflow;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter when `RUST_LOG` is unset, by `-v` count.
fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "copatch=warn",
        1 => "copatch=debug",
        _ => "copatch=trace",
    }
}

fn init_logging(verbose: u8) {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(verbose).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
