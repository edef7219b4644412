//! Accumulation of streamed tool output.
//!
//! The aggregator keeps one append-only transcript per invocation and the
//! most recent stderr increment, which is what the error classifier sees
//! when the invocation fails.

use super::{CANCELLED_EXIT_CODE, OutputChunk};
use crate::classify::{ErrorCategory, classify};
use serde::Serialize;

/// Which stream a transcript entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One appended piece of output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub kind: StreamKind,
    pub text: String,
}

/// Ordered record of everything an invocation printed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTranscript {
    entries: Vec<TranscriptEntry>,
}

impl RunTranscript {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All output concatenated in arrival order.
    pub fn text(&self) -> String {
        self.entries.iter().map(|e| e.text.as_str()).collect()
    }

    /// The most recent stdout increment, used as a one-line progress indicator.
    pub fn latest_stdout(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.kind == StreamKind::Stdout)
            .map(|e| e.text.trim_end())
    }

    fn push(&mut self, kind: StreamKind, text: &str) {
        self.entries.push(TranscriptEntry {
            kind,
            text: text.to_string(),
        });
    }
}

/// Final view of a closed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub transcript: RunTranscript,
    pub last_diagnostic: Option<String>,
    pub exit_code: i32,
}

/// How a closed invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Succeeded,
    /// Killed on purpose; not an error.
    Cancelled,
    Failed {
        category: ErrorCategory,
        diagnostic: String,
    },
}

impl RunOutcome {
    pub fn disposition(&self) -> Disposition {
        match self.exit_code {
            0 => Disposition::Succeeded,
            CANCELLED_EXIT_CODE => Disposition::Cancelled,
            code => {
                let diagnostic = self
                    .last_diagnostic
                    .clone()
                    .unwrap_or_else(|| format!("process exited with code {}", code));
                Disposition::Failed {
                    category: classify(&diagnostic),
                    diagnostic,
                }
            }
        }
    }
}

/// Accumulates the output of one invocation.
#[derive(Debug, Default)]
pub struct OutputAggregator {
    transcript: RunTranscript,
    last_diagnostic: Option<String>,
}

impl OutputAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard everything; called when a new invocation starts.
    pub fn reset(&mut self) {
        self.transcript = RunTranscript::default();
        self.last_diagnostic = None;
    }

    /// Append a chunk, stdout before stderr, and return the new entries.
    ///
    /// Empty strings are treated as absent.
    pub fn on_chunk(&mut self, chunk: &OutputChunk) -> &[TranscriptEntry] {
        let start = self.transcript.entries.len();

        if let Some(out) = chunk.stdout.as_deref().filter(|s| !s.is_empty()) {
            self.transcript.push(StreamKind::Stdout, out);
        }
        if let Some(err) = chunk.stderr.as_deref().filter(|s| !s.is_empty()) {
            self.transcript.push(StreamKind::Stderr, err);
            self.last_diagnostic = Some(err.trim_end_matches(['\r', '\n']).to_string());
        }

        &self.transcript.entries[start..]
    }

    /// Close the invocation.
    pub fn on_close(&self, exit_code: i32) -> RunOutcome {
        RunOutcome {
            transcript: self.transcript.clone(),
            last_diagnostic: self.last_diagnostic.clone(),
            exit_code,
        }
    }

    pub fn transcript(&self) -> &RunTranscript {
        &self.transcript
    }

    pub fn last_diagnostic(&self) -> Option<&str> {
        self.last_diagnostic.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_are_kept_in_arrival_order() {
        let mut agg = OutputAggregator::new();
        agg.on_chunk(&OutputChunk::stdout("a"));
        agg.on_chunk(&OutputChunk::stderr("b"));
        agg.on_chunk(&OutputChunk::stdout("c"));
        let outcome = agg.on_close(0);

        assert_eq!(outcome.transcript.text(), "abc");
        assert_eq!(outcome.last_diagnostic.as_deref(), Some("b"));
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.disposition(), Disposition::Succeeded);
    }

    #[test]
    fn test_stdout_precedes_stderr_within_a_chunk() {
        let mut agg = OutputAggregator::new();
        let appended = agg
            .on_chunk(&OutputChunk {
                stdout: Some("out".to_string()),
                stderr: Some("err".to_string()),
            })
            .to_vec();

        assert_eq!(appended.len(), 2);
        assert_eq!(appended[0].kind, StreamKind::Stdout);
        assert_eq!(appended[1].kind, StreamKind::Stderr);
    }

    #[test]
    fn test_last_diagnostic_is_last_write_wins() {
        let mut agg = OutputAggregator::new();
        agg.on_chunk(&OutputChunk::stderr("first\n"));
        agg.on_chunk(&OutputChunk::stdout("progress\n"));
        agg.on_chunk(&OutputChunk::stderr("second\n"));

        assert_eq!(agg.last_diagnostic(), Some("second"));
        assert_eq!(agg.transcript().text(), "first\nprogress\nsecond\n");
    }

    #[test]
    fn test_empty_chunks_append_nothing() {
        let mut agg = OutputAggregator::new();
        let appended = agg.on_chunk(&OutputChunk::default()).len();
        assert_eq!(appended, 0);
        agg.on_chunk(&OutputChunk::stderr(""));
        assert!(agg.transcript().is_empty());
        assert_eq!(agg.last_diagnostic(), None);
    }

    #[test]
    fn test_reset_clears_transcript_and_diagnostic() {
        let mut agg = OutputAggregator::new();
        agg.on_chunk(&OutputChunk::stderr("boom"));
        agg.reset();
        assert!(agg.transcript().is_empty());
        assert_eq!(agg.last_diagnostic(), None);
    }

    #[test]
    fn test_cancelled_exit_is_not_a_failure() {
        let mut agg = OutputAggregator::new();
        agg.on_chunk(&OutputChunk::stderr("Killed"));
        assert_eq!(agg.on_close(CANCELLED_EXIT_CODE).disposition(), Disposition::Cancelled);
    }

    #[test]
    fn test_failure_is_classified_from_last_diagnostic() {
        let mut agg = OutputAggregator::new();
        agg.on_chunk(&OutputChunk::stderr("pulling\n"));
        agg.on_chunk(&OutputChunk::stderr("Error: No such image: nginx:9\n"));

        match agg.on_close(1).disposition() {
            Disposition::Failed {
                category,
                diagnostic,
            } => {
                assert_eq!(category, ErrorCategory::ImageNotFound);
                assert_eq!(diagnostic, "Error: No such image: nginx:9");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_without_stderr_mentions_exit_code() {
        let agg = OutputAggregator::new();
        match agg.on_close(2).disposition() {
            Disposition::Failed {
                category,
                diagnostic,
            } => {
                assert_eq!(category, ErrorCategory::Unclassified);
                assert!(diagnostic.contains("code 2"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_latest_stdout() {
        let mut agg = OutputAggregator::new();
        assert_eq!(agg.transcript().latest_stdout(), None);
        agg.on_chunk(&OutputChunk::stdout("step 1\n"));
        agg.on_chunk(&OutputChunk::stderr("noise\n"));
        agg.on_chunk(&OutputChunk::stdout("step 2\n"));
        assert_eq!(agg.transcript().latest_stdout(), Some("step 2"));
    }
}
