//! Event logging subsystem for copatch.
//!
//! Every workflow transition is appended to an NDJSON file (one JSON object
//! per line), by default `.copatch/events.ndjson`, so past runs can be
//! audited after the terminal output is gone.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: the transition (scan_started, patch_failed, ...)
//! - `actor`: the owner string (e.g., `user@HOST`)
//! - `image`: image reference the event concerns, if any
//! - `details`: freeform object with action-specific details
//!
//! Writing the log is best-effort: a failure is reported through `tracing`
//! and never changes workflow state.

use crate::error::{CopatchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Scan invocation started (Idle -> ScanRunning)
    ScanStarted,
    /// Scan finished and report loaded (ScanRunning -> ScanLoaded)
    ScanLoaded,
    /// Scan exited non-zero or could not be launched
    ScanFailed,
    /// Patch invocation started (ScanLoaded -> PatchRunning)
    PatchStarted,
    /// Patch produced a new image (PatchRunning -> PatchSucceeded)
    PatchSucceeded,
    /// Patch exited non-zero or could not be launched
    PatchFailed,
    /// A tool was killed on purpose
    Cancelled,
    /// The user abandoned an in-flight workflow
    Abandoned,
    /// The user acknowledged a result (-> Idle)
    Acknowledged,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::ScanStarted => write!(f, "scan_started"),
            EventAction::ScanLoaded => write!(f, "scan_loaded"),
            EventAction::ScanFailed => write!(f, "scan_failed"),
            EventAction::PatchStarted => write!(f, "patch_started"),
            EventAction::PatchSucceeded => write!(f, "patch_succeeded"),
            EventAction::PatchFailed => write!(f, "patch_failed"),
            EventAction::Cancelled => write!(f, "cancelled"),
            EventAction::Abandoned => write!(f, "abandoned"),
            EventAction::Acknowledged => write!(f, "acknowledged"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor who performed the action (e.g., `user@HOST`).
    pub actor: String,

    /// Image reference the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action, timestamped now.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: current_actor(),
            image: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            CopatchError::UserError(format!("failed to encode {} event: {}", self.action, e))
        })
    }
}

/// `user@host` of whoever runs copatch.
fn current_actor() -> String {
    let user = ["USER", "USERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .unwrap_or_else(|| "unknown".to_string());
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}@{}", user, host)
}

fn log_io_error(what: &str, path: &Path, err: std::io::Error) -> CopatchError {
    CopatchError::UserError(format!("failed to {} '{}': {}", what, path.display(), err))
}

/// Append an event to the NDJSON file at `path`, creating parent
/// directories and the file as needed.
pub fn append_event(path: &Path, event: &Event) -> Result<()> {
    let line = event.to_ndjson_line()?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| log_io_error("create event log directory", dir, e))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| log_io_error("open event log", path, e))?;
    writeln!(file, "{}", line).map_err(|e| log_io_error("append to event log", path, e))
}

/// Destination for workflow events. Disabled logs drop everything.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an event, logging instead of failing.
    pub fn record(&self, event: Event) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(err) = append_event(path, &event) {
            tracing::warn!(action = %event.action, error = %err, "failed to record event");
        }
    }

    /// Read every event back, skipping lines that fail to parse.
    pub fn read_all(&self) -> Result<Vec<Event>> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content =
            fs::read_to_string(path).map_err(|e| log_io_error("read event log", path, e))?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}
