//! Scan-then-patch workflow orchestration.
//!
//! This module provides:
//! - `WorkflowConfig`: per-run configuration and patched-tag derivation
//! - `WorkflowState`: the single state value of a workflow
//! - `Workflow`: the coordinator driving scan, report read-back and patch
//!   through an injected process runner and observer

mod config;
mod machine;
mod state;


pub use config::{PatchBackend, Scanner, WorkflowConfig};
pub use machine::{Invocation, StageFailure, StageOutcome, Workflow};
pub use state::{RunId, StageKind, WorkflowState};
