//! Settings struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Tool settings for copatch.
///
/// This struct represents the contents of `copatch.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // =========================================================================
    // Tool images
    // =========================================================================
    /// Docker CLI used to run every tool.
    #[serde(default = "default_docker_binary")]
    pub docker_binary: String,

    /// Scanner image (trivy).
    #[serde(default = "default_scanner_image")]
    pub scanner_image: String,

    /// Patch tool image.
    #[serde(default = "default_patch_image")]
    pub patch_image: String,

    /// Minimal image used to read the report back out of the report volume.
    #[serde(default = "default_reader_image")]
    pub reader_image: String,

    // =========================================================================
    // Containers and volumes
    // =========================================================================
    /// Container name for the scan stage. Stale containers with this name are
    /// removed before every scan.
    #[serde(default = "default_scan_container")]
    pub scan_container: String,

    /// Container name for the patch stage.
    #[serde(default = "default_patch_container")]
    pub patch_container: String,

    /// Volume shared between the scanner (writer) and the patcher (reader).
    #[serde(default = "default_report_volume")]
    pub report_volume: String,

    /// Volume holding the scanner's vulnerability database cache.
    #[serde(default = "default_cache_volume")]
    pub cache_volume: String,

    // =========================================================================
    // Workflow settings
    // =========================================================================
    /// File name of the scan report inside the report volume.
    #[serde(default = "default_report_file_name")]
    pub report_file_name: String,

    /// Timeout handed to the tools when none is given on the command line.
    #[serde(default = "default_timeout")]
    pub default_timeout: String,

    /// Whether a scan with zero findings disables the patch action.
    #[serde(default)]
    pub zero_vulnerability_policy: ZeroVulnerabilityPolicy,

    // =========================================================================
    // Event log
    // =========================================================================
    /// Whether workflow transitions are appended to the event log.
    #[serde(default = "default_true")]
    pub events_enabled: bool,

    /// Directory (relative to the working directory) holding the event log.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            docker_binary: default_docker_binary(),
            scanner_image: default_scanner_image(),
            patch_image: default_patch_image(),
            reader_image: default_reader_image(),
            scan_container: default_scan_container(),
            patch_container: default_patch_container(),
            report_volume: default_report_volume(),
            cache_volume: default_cache_volume(),
            report_file_name: default_report_file_name(),
            default_timeout: default_timeout(),
            zero_vulnerability_policy: ZeroVulnerabilityPolicy::default(),
            events_enabled: default_true(),
            state_dir: default_state_dir(),
        }
    }
}
