//! Command implementations for copatch.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the setup every command shares: resolving the
//! settings file, opening the event log and wiring a console workflow.

mod clean;
mod doctor;
mod images;
mod init;
mod run;
mod scan;

use crate::cli::{Cli, Command};
use crate::config::{DEFAULT_CONFIG_FILE, Settings};
use crate::error::{CopatchError, Result};
use crate::events::EventLog;
use crate::observer::{ConsoleObserver, Observer};
use crate::process::{DockerRunner, ProcessRunner};
use crate::report::SeverityCounts;
use crate::workflow::Workflow;
use std::path::{Path, PathBuf};

/// Workflow wired to the docker CLI and the terminal.
pub(crate) type ConsoleWorkflow = Workflow<DockerRunner, ConsoleObserver>;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Scan(args) => scan::cmd_scan(config, args),
        Command::Run(args) => run::cmd_run(config, args),
        Command::Doctor => doctor::cmd_doctor(config),
        Command::Images => images::cmd_images(config),
        Command::Clean => clean::cmd_clean(config),
        Command::Init(args) => init::cmd_init(config, args),
    }
}

/// Path of the settings file: `--config` if given, else `./copatch.yaml`.
pub(crate) fn settings_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load and validate the settings for this invocation.
pub(crate) fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let settings = Settings::resolve(explicit, Path::new(DEFAULT_CONFIG_FILE))?;
    settings.validate()?;
    tracing::debug!(
        path = %settings_path(explicit).display(),
        scanner_image = %settings.scanner_image,
        patch_image = %settings.patch_image,
        "settings resolved"
    );
    Ok(settings)
}

/// Open the event log under the working directory, or a disabled one.
pub(crate) fn open_event_log(settings: &Settings) -> Result<EventLog> {
    if !settings.events_enabled {
        return Ok(EventLog::disabled());
    }
    let cwd = std::env::current_dir().map_err(|e| {
        CopatchError::UserError(format!("failed to determine current directory: {}", e))
    })?;
    Ok(EventLog::new(settings.events_path(&cwd)))
}

pub(crate) fn docker_runner(settings: &Settings) -> DockerRunner {
    DockerRunner::new(settings.docker_binary.clone())
}

pub(crate) fn console_workflow(settings: Settings, show_output: bool) -> Result<ConsoleWorkflow> {
    let events = open_event_log(&settings)?;
    let runner = docker_runner(&settings);
    Ok(Workflow::new(
        runner,
        ConsoleObserver::new(show_output),
        settings,
        events,
    ))
}

/// Return to Idle if a result is waiting. Cancelled stages are already there.
pub(crate) fn acknowledge_pending<R: ProcessRunner, O: Observer>(
    wf: &mut Workflow<R, O>,
) -> Result<()> {
    if wf.state().is_terminal() {
        wf.acknowledge()?;
    }
    Ok(())
}

/// Render severity counts as an aligned table, most severe first.
pub(crate) fn format_counts(counts: &SeverityCounts) -> String {
    let mut out = String::new();
    for (severity, count) in counts.iter_most_severe_first() {
        out.push_str(&format!("  {:<10} {:>5}\n", severity.label(), count));
    }
    out.push_str(&format!("  {:<10} {:>5}\n", "TOTAL", counts.total()));
    out
}
