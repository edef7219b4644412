//! Settings loading, validation, and utility operations.

use super::model::Settings;
use crate::error::{CopatchError, Result};
use std::path::{Path, PathBuf};

impl Settings {
    /// Load settings from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - Successfully loaded and validated settings
    /// * `Err(CopatchError::UserError)` - Read or parse error
    /// * `Err(CopatchError::ValidationError)` - A value failed validation
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            CopatchError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Resolve settings for a CLI invocation.
    ///
    /// An explicit path must exist. Without one, `copatch.yaml` in the working
    /// directory is used when present and defaults otherwise.
    pub fn resolve(explicit: Option<&Path>, default_path: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if default_path.exists() => Self::load(default_path),
            None => Ok(Self::default()),
        }
    }

    /// Parse settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // serde_yaml treats an empty document as null rather than an empty map.
        let settings: Settings = if yaml.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                CopatchError::UserError(format!("failed to parse config YAML: {}", e))
            })?
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            CopatchError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Write settings to `path`, refusing to overwrite unless `force` is set.
    pub fn write<P: AsRef<Path>>(&self, path: P, force: bool) -> Result<()> {
        let path = path.as_ref();
        if path.exists() && !force {
            return Err(CopatchError::UserError(format!(
                "config file '{}' already exists. Use --force to overwrite it.",
                path.display()
            )));
        }

        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml).map_err(|e| {
            CopatchError::UserError(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Validate values that are spliced into docker argument lists.
    ///
    /// Validation rules:
    /// - image, container and volume names must be non-empty and free of whitespace
    /// - `report_file_name` must be a bare file name (no `/`)
    /// - `default_timeout` must be non-empty
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("docker_binary", &self.docker_binary),
            ("scanner_image", &self.scanner_image),
            ("patch_image", &self.patch_image),
            ("reader_image", &self.reader_image),
            ("scan_container", &self.scan_container),
            ("patch_container", &self.patch_container),
            ("report_volume", &self.report_volume),
            ("cache_volume", &self.cache_volume),
            ("report_file_name", &self.report_file_name),
        ];

        for (field, value) in names {
            if value.is_empty() {
                return Err(CopatchError::ValidationError(format!(
                    "config field {} must not be empty",
                    field
                )));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(CopatchError::ValidationError(format!(
                    "config field {} must not contain whitespace (found '{}')",
                    field, value
                )));
            }
        }

        if self.report_file_name.contains('/') {
            return Err(CopatchError::ValidationError(format!(
                "config field report_file_name must be a file name, not a path (found '{}')",
                self.report_file_name
            )));
        }

        if self.default_timeout.trim().is_empty() {
            return Err(CopatchError::ValidationError(
                "config field default_timeout must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Path of the NDJSON event log, relative to `base`.
    pub fn events_path(&self, base: &Path) -> PathBuf {
        base.join(&self.state_dir).join("events.ndjson")
    }
}
