//! CLI argument parsing for copatch.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Copatch: scan a container image for fixable OS vulnerabilities and
/// patch it into a new image.
///
/// Both stages run as docker containers:
/// - the scanner writes a JSON report into a shared volume
/// - the patch tool reads it and builds `<image>:<tag>-patched`
#[derive(Parser, Debug)]
#[command(name = "copatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the settings file (default: ./copatch.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for copatch.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan an image and print its vulnerability counts.
    ///
    /// Only the scan stage runs; nothing is patched.
    Scan(ScanArgs),

    /// Scan an image, then patch it.
    ///
    /// Asks for confirmation before the patch stage unless `--yes` is given.
    Run(RunArgs),

    /// Show the detected patch backend and the resolved settings.
    Doctor,

    /// List local images that can be scanned.
    Images,

    /// Remove stale tool containers and the report volume.
    Clean,

    /// Write a settings file with the default values.
    Init(InitArgs),
}

/// Arguments for the `scan` command.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Image reference to scan (e.g., nginx:1.21.6).
    pub image: String,

    /// Timeout handed to the scanner (e.g., 5m, 90s).
    #[arg(long)]
    pub timeout: Option<String>,

    /// Echo the scanner output as it arrives.
    #[arg(long)]
    pub show_output: bool,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Image reference to scan and patch (e.g., nginx:1.21.6).
    pub image: String,

    /// Tag for the patched image (default: <tag>-patched).
    #[arg(long)]
    pub tag: Option<String>,

    /// Timeout handed to both tools (e.g., 5m, 90s).
    #[arg(long)]
    pub timeout: Option<String>,

    /// Patch without asking for confirmation.
    #[arg(short, long)]
    pub yes: bool,

    /// Allow patching even when the scan found no fixable vulnerabilities.
    #[arg(long)]
    pub force_patch: bool,

    /// Echo the tool output as it arrives.
    #[arg(long)]
    pub show_output: bool,

    /// Scan the patched image again after a successful patch.
    #[arg(long)]
    pub rescan: bool,
}

/// Arguments for the `init` command.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite an existing settings file.
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
