//! Settings enums, constants and default value functions.

use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "copatch.yaml";

/// What to do with the patch action when a scan finds nothing to fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZeroVulnerabilityPolicy {
    /// Disable patching for this run (default).
    #[default]
    DisablePatch,
    /// Allow the user to patch anyway.
    AllowPatch,
}

// Default value functions for serde
pub(crate) fn default_docker_binary() -> String {
    "docker".to_string()
}
pub(crate) fn default_scanner_image() -> String {
    "aquasec/trivy:latest".to_string()
}
pub(crate) fn default_patch_image() -> String {
    "ghcr.io/project-copacetic/copacetic:latest".to_string()
}
pub(crate) fn default_reader_image() -> String {
    "busybox:latest".to_string()
}
pub(crate) fn default_scan_container() -> String {
    "copatch-scan".to_string()
}
pub(crate) fn default_patch_container() -> String {
    "copatch-patch".to_string()
}
pub(crate) fn default_report_volume() -> String {
    "copatch-reports".to_string()
}
pub(crate) fn default_cache_volume() -> String {
    "copatch-trivy-cache".to_string()
}
pub(crate) fn default_report_file_name() -> String {
    "scan.json".to_string()
}
pub(crate) fn default_timeout() -> String {
    "5m".to_string()
}
pub(crate) fn default_state_dir() -> String {
    ".copatch".to_string()
}
pub(crate) fn default_true() -> bool {
    true
}
