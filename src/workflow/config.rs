//! Per-run workflow configuration and patched-tag derivation.

use crate::error::{CopatchError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Image references: no whitespace, at most one `:`, non-empty name before it
/// and a non-empty tag without `/` after it.
static IMAGE_REFERENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s:]+(:[^\s:/]+)?$").expect("Invalid image reference regex"));

/// Suffix appended to the original tag to name the patched image.
const PATCHED_SUFFIX: &str = "-patched";

/// Tag used as the base when the reference carries no tag at all.
const IMPLICIT_TAG: &str = "latest";

/// Vulnerability scanner used for the scan stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scanner {
    #[default]
    Trivy,
}

impl std::fmt::Display for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scanner::Trivy => write!(f, "trivy"),
        }
    }
}

/// Image storage mechanism the patch tool should target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PatchBackend {
    /// Patch through buildx against the classic image store.
    #[default]
    Default,
    /// Patch through a custom buildkit socket (containerd snapshotter active).
    AlternateSocket,
}

impl PatchBackend {
    /// The positional flag understood by the patch tool.
    pub fn flag(&self) -> &'static str {
        match self {
            PatchBackend::Default => "buildx",
            PatchBackend::AlternateSocket => "custom-socket",
        }
    }
}

impl std::fmt::Display for PatchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.flag())
    }
}

/// Configuration of one scan-then-patch run.
///
/// `image_tag` and `timeout` may be empty; the patched tag is then derived
/// from the reference and the timeout falls back to the configured default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowConfig {
    pub image_reference: String,
    pub image_tag: String,
    pub timeout: String,
    pub scanner: Scanner,
    pub patch_backend: PatchBackend,
    pub report_file_name: String,
}

impl WorkflowConfig {
    pub fn new(image_reference: impl Into<String>, report_file_name: impl Into<String>) -> Self {
        Self {
            image_reference: image_reference.into(),
            image_tag: String::new(),
            timeout: String::new(),
            scanner: Scanner::default(),
            patch_backend: PatchBackend::default(),
            report_file_name: report_file_name.into(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.image_tag = tag.into();
        self
    }

    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn with_backend(mut self, backend: PatchBackend) -> Self {
        self.patch_backend = backend;
        self
    }

    /// Validate the configuration before any process is started.
    ///
    /// Rules:
    /// - `image_reference` is non-empty, has no whitespace, at most one `:`,
    ///   a non-empty name before the `:` and a non-empty tag after it; a tag
    ///   never contains `/`, so `host:port/name` references are rejected
    /// - an explicit `image_tag` has no whitespace, `:` or `/`
    /// - `timeout` has no whitespace
    pub fn validate(&self) -> Result<()> {
        validate_image_reference(&self.image_reference)?;

        if self
            .image_tag
            .chars()
            .any(|c| c.is_whitespace() || c == ':' || c == '/')
        {
            return Err(CopatchError::ValidationError(format!(
                "patched image tag '{}' must not contain whitespace, ':' or '/'",
                self.image_tag
            )));
        }

        if self.timeout.chars().any(char::is_whitespace) {
            return Err(CopatchError::ValidationError(format!(
                "timeout '{}' must not contain whitespace (e.g. 5m, 90s)",
                self.timeout
            )));
        }

        Ok(())
    }

    /// Name portion of the reference (everything before `:`).
    pub fn base_name(&self) -> &str {
        split_reference(&self.image_reference).0
    }

    /// Tag of the patched image.
    ///
    /// - explicit tag set: that tag
    /// - reference without `:`: `latest-patched`
    /// - otherwise: `<original tag>-patched`
    pub fn derived_tag(&self) -> String {
        if !self.image_tag.is_empty() {
            return self.image_tag.clone();
        }
        match split_reference(&self.image_reference).1 {
            None => format!("{}{}", IMPLICIT_TAG, PATCHED_SUFFIX),
            Some(tag) => format!("{}{}", tag, PATCHED_SUFFIX),
        }
    }

    /// Full reference of the image the patch stage produces.
    pub fn patched_image(&self) -> String {
        format!("{}:{}", self.base_name(), self.derived_tag())
    }
}

/// Check an image reference against the accepted shape.
fn validate_image_reference(reference: &str) -> Result<()> {
    if reference.is_empty() {
        return Err(CopatchError::ValidationError(
            "image reference must not be empty".to_string(),
        ));
    }

    if !IMAGE_REFERENCE_REGEX.is_match(reference) {
        return Err(CopatchError::ValidationError(format!(
            "invalid image reference '{}'. Expected NAME or NAME:TAG without whitespace.",
            reference
        )));
    }

    Ok(())
}

fn split_reference(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once(':') {
        Some((name, tag)) => (name, Some(tag)),
        None => (reference, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(image: &str) -> WorkflowConfig {
        WorkflowConfig::new(image, "scan.json")
    }

    #[test]
    fn test_derived_tag_without_colon() {
        assert_eq!(config("image").derived_tag(), "latest-patched");
    }

    #[test]
    fn test_derived_tag_from_original_tag() {
        assert_eq!(config("image:1.2.3").derived_tag(), "1.2.3-patched");
    }

    #[test]
    fn test_derived_tag_explicit_wins() {
        assert_eq!(config("image:1.2.3").with_tag("custom").derived_tag(), "custom");
    }

    #[test]
    fn test_derived_tag_follows_input_changes() {
        let mut cfg = config("nginx:1.21.6");
        assert_eq!(cfg.derived_tag(), "1.21.6-patched");

        cfg.image_reference = "nginx:1.23".to_string();
        assert_eq!(cfg.derived_tag(), "1.23-patched");

        cfg.image_tag = "hotfix".to_string();
        assert_eq!(cfg.derived_tag(), "hotfix");

        cfg.image_tag.clear();
        assert_eq!(cfg.derived_tag(), "1.23-patched");
    }

    #[test]
    fn test_patched_image() {
        assert_eq!(config("nginx:1.21.6").patched_image(), "nginx:1.21.6-patched");
        assert_eq!(config("nginx").patched_image(), "nginx:latest-patched");
        assert_eq!(
            config("registry/app:2").with_tag("fixed").patched_image(),
            "registry/app:fixed"
        );
    }

    #[test]
    fn test_validate_accepts_common_references() {
        for image in ["nginx", "nginx:1.21.6", "docker.io/library/nginx:latest", "a:1"] {
            assert!(config(image).validate().is_ok(), "{} should be valid", image);
        }
    }

    #[test]
    fn test_validate_rejects_invalid_references() {
        for image in ["", "nginx 1.21", " nginx", "nginx:1:2", ":latest", "nginx\t"] {
            let result = config(image).validate();
            assert!(
                matches!(result, Err(CopatchError::ValidationError(_))),
                "{:?} should be rejected",
                image
            );
        }
    }

    #[test]
    fn test_validate_rejects_bad_tag_and_timeout() {
        assert!(config("nginx").with_tag("a b").validate().is_err());
        assert!(config("nginx").with_tag("a:b").validate().is_err());
        assert!(config("nginx").with_tag("a/b").validate().is_err());
        assert!(config("nginx").with_timeout("5 m").validate().is_err());
        assert!(config("nginx").with_timeout("").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_references_that_derive_invalid_tags() {
        // `a:` would patch to `a:-patched`; `localhost:5000/nginx` to a tag with `/`.
        for image in ["a:", "nginx:", "localhost:5000/nginx", "localhost:5000/nginx:1.0"] {
            assert!(
                matches!(config(image).validate(), Err(CopatchError::ValidationError(_))),
                "{:?} should be rejected",
                image
            );
        }
    }

    #[test]
    fn test_backend_flags() {
        assert_eq!(PatchBackend::Default.flag(), "buildx");
        assert_eq!(PatchBackend::AlternateSocket.flag(), "custom-socket");
    }
}
