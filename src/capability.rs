//! Detection of daemon capabilities that change how the patch tool runs.
//!
//! When the docker daemon uses the containerd image store, the patch tool
//! has to talk to buildkit through a custom socket instead of buildx. The
//! daemon advertises this through its driver status, which is queried once
//! per workflow. Any failure falls back to the default backend.

use crate::invocation::{CONTAINERD_SNAPSHOTTER_MARKER, build_probe_command};
use crate::process::{ProcessRunner, run_checked};
use crate::workflow::PatchBackend;

/// Query the daemon and pick the patch backend.
pub fn detect_patch_backend<R: ProcessRunner + ?Sized>(runner: &R) -> PatchBackend {
    match run_checked(runner, &build_probe_command()) {
        Ok(driver_status) => {
            let backend = backend_from_driver_status(&driver_status);
            tracing::debug!(%backend, "detected patch backend");
            backend
        }
        Err(err) => {
            tracing::warn!(error = %err, "capability probe failed; using default patch backend");
            PatchBackend::Default
        }
    }
}

/// Inspect `docker info` driver status output for the snapshotter marker.
///
/// The output is a JSON array of `[key, value]` pairs, but only the marker
/// substring matters, so the text is not parsed.
pub fn backend_from_driver_status(driver_status: &str) -> PatchBackend {
    if driver_status.contains(CONTAINERD_SNAPSHOTTER_MARKER) {
        PatchBackend::AlternateSocket
    } else {
        PatchBackend::Default
    }
}
