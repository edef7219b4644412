//! Scripted collaborators for workflow tests.

use crate::error::{CopatchError, Result};
use crate::observer::{Notification, Observer};
use crate::process::{OutputChunk, OutputStream, ProcessEvent, ProcessRunner, StreamKind};
use crate::workflow::WorkflowState;
use std::cell::RefCell;

struct Script {
    key: String,
    response: Response,
}

enum Response {
    Run {
        chunks: Vec<OutputChunk>,
        exit_code: i32,
    },
    LaunchFailure(String),
}

/// Process runner replaying canned output.
///
/// A script matches an invocation when any argv element equals its key;
/// scripts are tried in registration order. Unmatched invocations succeed
/// silently. Every argv is recorded.
#[derive(Default)]
pub(crate) struct FakeRunner {
    scripts: Vec<Script>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(mut self, key: &str, chunks: Vec<OutputChunk>, exit_code: i32) -> Self {
        self.scripts.push(Script {
            key: key.to_string(),
            response: Response::Run { chunks, exit_code },
        });
        self
    }

    pub(crate) fn fail_launch(mut self, key: &str, message: &str) -> Self {
        self.scripts.push(Script {
            key: key.to_string(),
            response: Response::LaunchFailure(message.to_string()),
        });
        self
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// Number of recorded invocations containing `key`.
    pub(crate) fn count(&self, key: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|argv| argv.iter().any(|a| a == key))
            .count()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, argv: &[String]) -> Result<OutputStream> {
        self.calls.borrow_mut().push(argv.to_vec());

        let script = self
            .scripts
            .iter()
            .find(|s| argv.iter().any(|a| *a == s.key));

        let events = match script.map(|s| &s.response) {
            Some(Response::LaunchFailure(message)) => {
                return Err(CopatchError::ProcessError(message.clone()));
            }
            Some(Response::Run { chunks, exit_code }) => chunks
                .iter()
                .cloned()
                .map(ProcessEvent::Output)
                .chain(std::iter::once(ProcessEvent::Closed(*exit_code)))
                .collect::<Vec<_>>(),
            None => vec![ProcessEvent::Closed(0)],
        };

        Ok(Box::new(events.into_iter()))
    }
}

/// Observer recording everything it is told.
#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub(crate) states: RefCell<Vec<String>>,
    pub(crate) output: RefCell<Vec<(StreamKind, String)>>,
    pub(crate) notifications: RefCell<Vec<Notification>>,
}

impl Observer for RecordingObserver {
    fn state_changed(&self, state: &WorkflowState) {
        self.states.borrow_mut().push(state.name().to_string());
    }

    fn output(&self, kind: StreamKind, text: &str) {
        self.output.borrow_mut().push((kind, text.to_string()));
    }

    fn notify(&self, notification: &Notification) {
        self.notifications.borrow_mut().push(notification.clone());
    }
}
