//! Tests for settings functionality.

use crate::config::{Settings, ZeroVulnerabilityPolicy};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();

    assert_eq!(settings.docker_binary, "docker");
    assert_eq!(settings.scanner_image, "aquasec/trivy:latest");
    assert_eq!(settings.reader_image, "busybox:latest");
    assert_eq!(settings.scan_container, "copatch-scan");
    assert_eq!(settings.patch_container, "copatch-patch");
    assert_eq!(settings.report_volume, "copatch-reports");
    assert_eq!(settings.report_file_name, "scan.json");
    assert_eq!(settings.default_timeout, "5m");
    assert_eq!(
        settings.zero_vulnerability_policy,
        ZeroVulnerabilityPolicy::DisablePatch
    );
    assert!(settings.events_enabled);
    assert_eq!(settings.state_dir, ".copatch");
}

#[test]
fn test_parse_empty_yaml() {
    let settings = Settings::from_yaml("").unwrap();
    assert_eq!(settings.docker_binary, "docker");
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
default_timeout: 10m
zero_vulnerability_policy: allow_patch
"#;
    let settings = Settings::from_yaml(yaml).unwrap();

    assert_eq!(settings.default_timeout, "10m");
    assert_eq!(
        settings.zero_vulnerability_policy,
        ZeroVulnerabilityPolicy::AllowPatch
    );
    // Unspecified values should use defaults
    assert_eq!(settings.report_volume, "copatch-reports");
}

#[test]
fn test_parse_yaml_with_unknown_fields() {
    let yaml = r#"
docker_binary: podman
future_feature_x: enabled
nested_unknown:
  a: 1
"#;
    let settings = Settings::from_yaml(yaml).unwrap();
    assert_eq!(settings.docker_binary, "podman");
}

#[test]
fn test_parse_invalid_policy_fails() {
    let result = Settings::from_yaml("zero_vulnerability_policy: sometimes");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("failed to parse"));
}

#[test]
fn test_validate_rejects_empty_names() {
    let result = Settings::from_yaml("report_volume: \"\"");
    let err = result.unwrap_err();
    assert!(err.to_string().contains("report_volume"));
    assert!(err.to_string().contains("must not be empty"));
}

#[test]
fn test_validate_rejects_whitespace_in_names() {
    let result = Settings::from_yaml("scan_container: \"copatch scan\"");
    let err = result.unwrap_err();
    assert!(err.to_string().contains("whitespace"));
}

#[test]
fn test_validate_rejects_report_path() {
    let result = Settings::from_yaml("report_file_name: out/scan.json");
    let err = result.unwrap_err();
    assert!(err.to_string().contains("not a path"));
}

#[test]
fn test_yaml_roundtrip_preserves_values() {
    let settings = Settings {
        default_timeout: "15m".to_string(),
        events_enabled: false,
        ..Default::default()
    };
    let yaml = settings.to_yaml().unwrap();
    let parsed = Settings::from_yaml(&yaml).unwrap();
    assert_eq!(parsed.default_timeout, "15m");
    assert!(!parsed.events_enabled);
}

#[test]
fn test_resolve_missing_default_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let default_path = temp_dir.path().join("copatch.yaml");
    let settings = Settings::resolve(None, &default_path).unwrap();
    assert_eq!(settings.default_timeout, "5m");
}

#[test]
fn test_resolve_explicit_missing_file_fails() {
    let result = Settings::resolve(Some(Path::new("/nonexistent/copatch.yaml")), Path::new("x"));
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("failed to read"));
}

#[test]
fn test_write_refuses_to_overwrite_without_force() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("copatch.yaml");

    Settings::default().write(&path, false).unwrap();
    let second = Settings::default().write(&path, false);
    assert!(second.unwrap_err().to_string().contains("--force"));

    Settings::default().write(&path, true).unwrap();
    let loaded = Settings::load(&path).unwrap();
    assert_eq!(loaded.patch_container, "copatch-patch");
}

#[test]
fn test_events_path_is_under_state_dir() {
    let settings = Settings::default();
    let path = settings.events_path(Path::new("/work"));
    assert_eq!(path, Path::new("/work/.copatch/events.ndjson"));
}
