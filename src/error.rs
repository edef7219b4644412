//! Error types for the copatch CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::classify::ErrorCategory;
use crate::exit_codes;
use crate::report::ReportError;
use thiserror::Error;

/// Main error type for copatch operations.
///
/// Each variant maps to a specific process exit code.
#[derive(Error, Debug)]
pub enum CopatchError {
    /// User provided invalid arguments or the workflow is in the wrong state.
    #[error("{0}")]
    UserError(String),

    /// An image reference or a settings value failed validation.
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// A docker invocation could not be launched or read back.
    #[error("Docker operation failed: {0}")]
    ProcessError(String),

    /// The scan report could not be parsed or reduced.
    #[error("Malformed scan report: {0}")]
    ReportError(#[from] ReportError),

    /// The scan stage exited with a non-zero status.
    #[error("Scan of {image} failed ({category}): {diagnostic}")]
    ScanFailed {
        image: String,
        category: ErrorCategory,
        diagnostic: String,
    },

    /// The patch stage exited with a non-zero status.
    #[error("Patch of {image} failed ({category}): {diagnostic}")]
    PatchFailed {
        image: String,
        category: ErrorCategory,
        diagnostic: String,
    },
}

impl CopatchError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CopatchError::UserError(_) => exit_codes::USER_ERROR,
            CopatchError::ValidationError(_) => exit_codes::VALIDATION_FAILURE,
            CopatchError::ProcessError(_) => exit_codes::PROCESS_FAILURE,
            CopatchError::ReportError(_) => exit_codes::SCAN_FAILURE,
            CopatchError::ScanFailed { .. } => exit_codes::SCAN_FAILURE,
            CopatchError::PatchFailed { .. } => exit_codes::PATCH_FAILURE,
        }
    }
}

/// Result type alias for copatch operations.
pub type Result<T> = std::result::Result<T, CopatchError>;
