//! Implementation of the `copatch images` command.

use super::{docker_runner, load_settings};
use crate::error::Result;
use crate::images::list_local_images;
use std::path::Path;

/// Print one local image reference per line.
pub fn cmd_images(config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;
    let images = list_local_images(&docker_runner(&settings))?;

    if images.is_empty() {
        println!("No local images found.");
        return Ok(());
    }
    for image in images {
        println!("{}", image);
    }
    Ok(())
}
