//! Presentation boundary of the workflow.
//!
//! The coordinator reports every state transition, every output increment
//! and every user-facing notification through an [`Observer`]. Delivery is
//! fire-and-forget; nothing the observer does feeds back into the workflow.

use crate::process::StreamKind;
use crate::workflow::WorkflowState;
use std::cell::{Cell, RefCell};
use std::io::Write;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Receives workflow progress.
pub trait Observer {
    /// Called after every state transition.
    fn state_changed(&self, _state: &WorkflowState) {}

    /// Called for every output increment of the tracked invocation.
    fn output(&self, _kind: StreamKind, _text: &str) {}

    /// Called with success and failure notifications.
    fn notify(&self, notification: &Notification);
}

/// Erases the current terminal line and returns the cursor to its start.
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Observer printing live progress to the terminal.
///
/// With `stream_output` every increment is echoed as it arrives (stdout to
/// stdout, stderr to stderr). Otherwise the latest stdout line is kept as a
/// single progress line on stderr, rewritten in place and cleared before
/// the next state change or notification.
pub struct ConsoleObserver {
    stream_output: bool,
    out: RefCell<Box<dyn Write>>,
    err: RefCell<Box<dyn Write>>,
    progress_shown: Cell<bool>,
}

impl ConsoleObserver {
    pub fn new(stream_output: bool) -> Self {
        Self::with_writers(
            stream_output,
            Box::new(std::io::stdout()),
            Box::new(std::io::stderr()),
        )
    }

    /// Observer writing to the given sinks instead of the process streams.
    pub fn with_writers(stream_output: bool, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self {
            stream_output,
            out: RefCell::new(out),
            err: RefCell::new(err),
            progress_shown: Cell::new(false),
        }
    }

    fn show_progress(&self, text: &str) {
        let Some(line) = text.lines().rev().map(str::trim).find(|l| !l.is_empty()) else {
            return;
        };
        let mut err = self.err.borrow_mut();
        let _ = write!(err, "{}  {}", CLEAR_LINE, line).and_then(|_| err.flush());
        self.progress_shown.set(true);
    }

    fn clear_progress(&self) {
        if self.progress_shown.replace(false) {
            let mut err = self.err.borrow_mut();
            let _ = write!(err, "{}", CLEAR_LINE).and_then(|_| err.flush());
        }
    }
}

impl Observer for ConsoleObserver {
    fn state_changed(&self, state: &WorkflowState) {
        self.clear_progress();
        tracing::debug!(state = state.name(), "workflow state changed");
    }

    fn output(&self, kind: StreamKind, text: &str) {
        if !self.stream_output {
            if kind == StreamKind::Stdout {
                self.show_progress(text);
            }
            return;
        }
        // Increments already carry their newline.
        let sink = match kind {
            StreamKind::Stdout => &self.out,
            StreamKind::Stderr => &self.err,
        };
        let mut sink = sink.borrow_mut();
        let _ = sink.write_all(text.as_bytes()).and_then(|_| sink.flush());
    }

    fn notify(&self, notification: &Notification) {
        self.clear_progress();
        let mut err = self.err.borrow_mut();
        let _ = match notification.level {
            NotificationLevel::Success => writeln!(err, "[copatch] {}", notification.message),
            NotificationLevel::Error => writeln!(err, "[copatch] error: {}", notification.message),
        };
    }
}
