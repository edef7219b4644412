//! Implementation of the `copatch clean` command.
//!
//! Removes the scan and patch containers and the report volume left by a
//! previous run. The scanner cache volume is kept. Safe to run repeatedly.

use super::{console_workflow, load_settings};
use crate::error::Result;
use std::path::Path;

/// Execute the `copatch clean` command.
pub fn cmd_clean(config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;
    let wf = console_workflow(settings, false)?;

    wf.cleanup();

    let settings = wf.settings();
    println!(
        "Removed containers '{}', '{}' and volume '{}' (if present).",
        settings.scan_container, settings.patch_container, settings.report_volume
    );
    Ok(())
}
