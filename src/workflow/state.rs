//! Workflow state as a single tagged union.

use crate::classify::ErrorCategory;
use crate::report::SeverityCounts;
use serde::Serialize;

/// Identifier of one tool invocation.
///
/// Every event handled by the coordinator carries the id of the invocation
/// that produced it; ids are never reused within a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RunId(pub(crate) u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// The two stages of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Scan,
    Patch,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageKind::Scan => write!(f, "scan"),
            StageKind::Patch => write!(f, "patch"),
        }
    }
}

/// Current phase of the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    /// Nothing in flight; a scan may be submitted.
    Idle,
    /// The scanner is running.
    ScanRunning { run: RunId },
    /// The scan finished.
    ///
    /// `counts` is `None` when the report could not be read; patching stays
    /// possible in that case.
    ScanLoaded {
        counts: Option<SeverityCounts>,
        patch_enabled: bool,
    },
    /// The patch tool is running.
    PatchRunning { run: RunId },
    /// A patched image was produced.
    PatchSucceeded { patched_image: String },
    /// The patch tool failed.
    PatchFailed {
        category: ErrorCategory,
        diagnostic: String,
    },
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::ScanRunning { .. } => "scan_running",
            WorkflowState::ScanLoaded { .. } => "scan_loaded",
            WorkflowState::PatchRunning { .. } => "patch_running",
            WorkflowState::PatchSucceeded { .. } => "patch_succeeded",
            WorkflowState::PatchFailed { .. } => "patch_failed",
        }
    }

    /// The tracked invocation, if a stage is running.
    pub fn running(&self) -> Option<(StageKind, RunId)> {
        match self {
            WorkflowState::ScanRunning { run } => Some((StageKind::Scan, *run)),
            WorkflowState::PatchRunning { run } => Some((StageKind::Patch, *run)),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running().is_some()
    }

    /// Whether a result is waiting to be acknowledged.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::ScanLoaded { .. }
                | WorkflowState::PatchSucceeded { .. }
                | WorkflowState::PatchFailed { .. }
        )
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
