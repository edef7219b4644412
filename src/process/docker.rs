//! Process runner backed by the docker CLI.
//!
//! Each invocation spawns the docker binary with piped stdout/stderr. Two
//! reader threads forward output line by line over a channel; a waiter
//! thread joins them, reaps the child and sends the single `Closed` event,
//! so the close always follows every output increment.

use super::{OutputChunk, OutputStream, ProcessEvent, ProcessRunner, UNKNOWN_EXIT_CODE};
use crate::error::{CopatchError, Result};
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// Runs tools through a docker-compatible CLI.
#[derive(Debug, Clone)]
pub struct DockerRunner {
    binary: String,
}

impl DockerRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl ProcessRunner for DockerRunner {
    fn run(&self, argv: &[String]) -> Result<OutputStream> {
        let mut child = Command::new(&self.binary)
            .args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CopatchError::ProcessError(format!(
                    "failed to execute {} {}: {}\n\
                     Fix: ensure the docker CLI is installed and in PATH.",
                    self.binary,
                    argv.first().map(String::as_str).unwrap_or(""),
                    e
                ))
            })?;

        let (tx, rx) = mpsc::channel();

        let stdout = child.stdout.take().map(|out| {
            let tx = tx.clone();
            thread::spawn(move || forward_lines(out, tx, |line| OutputChunk::stdout(line)))
        });
        let stderr = child.stderr.take().map(|err| {
            let tx = tx.clone();
            thread::spawn(move || forward_lines(err, tx, |line| OutputChunk::stderr(line)))
        });

        thread::spawn(move || {
            for reader in [stdout, stderr].into_iter().flatten() {
                let _ = reader.join();
            }
            let code = match child.wait() {
                Ok(status) => exit_code(status),
                Err(e) => {
                    let _ = tx.send(ProcessEvent::Error(format!(
                        "failed waiting for process: {}",
                        e
                    )));
                    UNKNOWN_EXIT_CODE
                }
            };
            let _ = tx.send(ProcessEvent::Closed(code));
        });

        Ok(Box::new(ChannelStream { rx, closed: false }))
    }

    fn program(&self) -> &str {
        &self.binary
    }
}

/// Forward every line of `source` as an output chunk until EOF.
fn forward_lines<R: Read>(source: R, tx: Sender<ProcessEvent>, wrap: fn(String) -> OutputChunk) {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(ProcessEvent::Output(wrap(line))).is_err() {
                    // Receiver dropped: the invocation was abandoned.
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(ProcessEvent::Error(format!("failed to read output: {}", e)));
                break;
            }
        }
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => UNKNOWN_EXIT_CODE,
    }
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(UNKNOWN_EXIT_CODE)
}

/// Iterator over the channel fed by the reader and waiter threads.
struct ChannelStream {
    rx: Receiver<ProcessEvent>,
    closed: bool,
}

impl Iterator for ChannelStream {
    type Item = ProcessEvent;

    fn next(&mut self) -> Option<ProcessEvent> {
        if self.closed {
            return None;
        }
        match self.rx.recv() {
            Ok(event) => {
                if matches!(event, ProcessEvent::Closed(_)) {
                    self.closed = true;
                }
                Some(event)
            }
            Err(_) => {
                // All senders gone without a close; synthesize one.
                self.closed = true;
                Some(ProcessEvent::Closed(UNKNOWN_EXIT_CODE))
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::process::{CANCELLED_EXIT_CODE, run_to_completion};

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_streams_lines_then_closes() {
        let runner = DockerRunner::new("sh");
        let events: Vec<_> = runner
            .run(&argv(&["-c", "echo one; echo two"]))
            .unwrap()
            .collect();

        assert_eq!(
            events,
            vec![
                ProcessEvent::Output(OutputChunk::stdout("one\n")),
                ProcessEvent::Output(OutputChunk::stdout("two\n")),
                ProcessEvent::Closed(0),
            ]
        );
    }

    #[test]
    fn test_captures_stderr_and_exit_code() {
        let runner = DockerRunner::new("sh");
        let output = run_to_completion(&runner, &argv(&["-c", "echo oops >&2; exit 3"])).unwrap();
        assert_eq!(output.stderr, "oops\n");
        assert_eq!(output.exit_code, 3);
    }

    #[test]
    fn test_killed_process_reports_cancel_code() {
        let runner = DockerRunner::new("sh");
        let output = run_to_completion(&runner, &argv(&["-c", "kill -9 $$"])).unwrap();
        assert_eq!(output.exit_code, CANCELLED_EXIT_CODE);
    }

    #[test]
    fn test_missing_binary_is_launch_failure() {
        let runner = DockerRunner::new("nonexistent_binary_xyz_123");
        let result = runner.run(&argv(&["info"]));
        assert!(matches!(result, Err(CopatchError::ProcessError(_))));
    }

    #[test]
    fn test_stream_is_not_restartable() {
        let runner = DockerRunner::new("sh");
        let mut stream = runner.run(&argv(&["-c", "true"])).unwrap();
        assert_eq!(stream.next(), Some(ProcessEvent::Closed(0)));
        assert_eq!(stream.next(), None);
        assert_eq!(stream.next(), None);
    }
}
