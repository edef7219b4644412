//! Implementation of the `copatch init` command.
//!
//! Writes a settings file holding every default value, so it can be edited
//! instead of written from scratch. An existing file is only replaced with
//! `--force`.

use super::settings_path;
use crate::cli::InitArgs;
use crate::config::Settings;
use crate::error::Result;
use std::path::Path;

/// Execute the `copatch init` command.
pub fn cmd_init(config: Option<&Path>, args: InitArgs) -> Result<()> {
    let path = settings_path(config);
    write_default_settings(&path, args.force)?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

fn write_default_settings(path: &Path, force: bool) -> Result<()> {
    let settings = Settings::default();
    settings.write(path, force)?;
    tracing::debug!(path = %path.display(), "settings file written");
    Ok(())
}
