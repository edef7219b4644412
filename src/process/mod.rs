//! External process invocation.
//!
//! A [`ProcessRunner`] starts a tool with an argument list and hands back an
//! [`OutputStream`]: a lazy, finite, non-restartable sequence of
//! [`ProcessEvent`]s. Output increments arrive in order and the stream ends
//! with exactly one [`ProcessEvent::Closed`] carrying the exit code.
//!
//! - **docker**: the real runner backed by the docker CLI
//! - **aggregator**: transcript accumulation and diagnostic tracking

pub mod aggregator;
mod docker;

pub use aggregator::{Disposition, OutputAggregator, RunOutcome, RunTranscript, StreamKind};
pub use docker::DockerRunner;

use crate::error::{CopatchError, Result};

/// Exit code reserved for an intentionally killed tool (128 + SIGKILL).
pub const CANCELLED_EXIT_CODE: i32 = 137;

/// Exit code reported when the real status of a process is unavailable.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// One increment of tool output. Either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputChunk {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl OutputChunk {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stdout: Some(text.into()),
            stderr: None,
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stdout: None,
            stderr: Some(text.into()),
        }
    }
}

/// Event produced by a running tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// An output increment.
    Output(OutputChunk),
    /// A best-effort diagnostic from the runner itself. Never used for control flow.
    Error(String),
    /// The process ended. Always the last event.
    Closed(i32),
}

/// Stream of events for one invocation.
pub type OutputStream = Box<dyn Iterator<Item = ProcessEvent> + Send>;

/// Capability to start external tools.
pub trait ProcessRunner {
    /// Start the tool with `argv` and return its event stream.
    ///
    /// An `Err` means the process could not be launched at all; once a
    /// stream is returned, the exit code in its `Closed` event is authoritative.
    fn run(&self, argv: &[String]) -> Result<OutputStream>;

    /// Program name used when rendering commands for logs.
    fn program(&self) -> &str {
        "docker"
    }
}

/// Fully collected output of a short-lived invocation.
#[derive(Debug, Clone, Default)]
pub struct CollectedOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CollectedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run an invocation to completion and collect its output.
///
/// Used for short helper queries (report read-back, introspection, image
/// listing) where live progress is not needed.
pub fn run_to_completion<R: ProcessRunner + ?Sized>(
    runner: &R,
    argv: &[String],
) -> Result<CollectedOutput> {
    let mut collected = CollectedOutput {
        exit_code: UNKNOWN_EXIT_CODE,
        ..Default::default()
    };

    for event in runner.run(argv)? {
        match event {
            ProcessEvent::Output(chunk) => {
                if let Some(out) = chunk.stdout {
                    collected.stdout.push_str(&out);
                }
                if let Some(err) = chunk.stderr {
                    collected.stderr.push_str(&err);
                }
            }
            ProcessEvent::Error(message) => {
                tracing::debug!(%message, "runner reported an error");
            }
            ProcessEvent::Closed(code) => {
                collected.exit_code = code;
                break;
            }
        }
    }

    Ok(collected)
}

/// Like [`run_to_completion`] but maps a non-zero exit to `ProcessError`.
pub fn run_checked<R: ProcessRunner + ?Sized>(runner: &R, argv: &[String]) -> Result<String> {
    let output = run_to_completion(runner, argv)?;
    if output.success() {
        Ok(output.stdout)
    } else {
        let message = if output.stderr.trim().is_empty() {
            output.stdout.trim().to_string()
        } else {
            output.stderr.trim().to_string()
        };
        Err(CopatchError::ProcessError(format!(
            "{} {} failed (exit code {}): {}",
            runner.program(),
            argv.first().map(String::as_str).unwrap_or(""),
            output.exit_code,
            message
        )))
    }
}
