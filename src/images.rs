//! Enumeration of locally known images.
//!
//! Used only to help the user pick an image; the workflow never depends on it.

use crate::error::Result;
use crate::invocation::build_list_images_command;
use crate::process::{ProcessRunner, run_checked};

/// Placeholder docker prints for a missing repository or tag.
const DANGLING_MARKER: &str = "<none>";

/// List local image references, sorted and without dangling entries.
pub fn list_local_images<R: ProcessRunner + ?Sized>(runner: &R) -> Result<Vec<String>> {
    let stdout = run_checked(runner, &build_list_images_command())?;
    Ok(parse_image_list(&stdout))
}

fn parse_image_list(stdout: &str) -> Vec<String> {
    let mut images: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(DANGLING_MARKER))
        .map(str::to_string)
        .collect();
    images.sort();
    images.dedup();
    images
}
