//! Exit code constants for the copatch CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state)
//! - 2: Validation failure (image reference or settings rejected)
//! - 3: Docker/process failure (could not launch or talk to docker)
//! - 4: Scan stage failed
//! - 5: Patch stage failed

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or a command issued in the wrong workflow state.
pub const USER_ERROR: i32 = 1;

/// Validation failure: image reference or settings failed validation.
pub const VALIDATION_FAILURE: i32 = 2;

/// Docker or process failure: a tool could not be launched or read back.
pub const PROCESS_FAILURE: i32 = 3;

/// The scan stage exited with a non-zero status.
pub const SCAN_FAILURE: i32 = 4;

/// The patch stage exited with a non-zero status.
pub const PATCH_FAILURE: i32 = 5;
