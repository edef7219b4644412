//! Classification of tool diagnostics into user-facing error categories.
//!
//! The scanner and patcher report failures as free text on stderr. The
//! classifier is a best-effort substring match over the last diagnostic
//! line; anything it does not recognise falls through to `Unclassified`.

use serde::{Deserialize, Serialize};

/// Marker emitted when the requested tag does not exist.
const UNKNOWN_TAG_MARKER: &str = "unknown tag";

/// Marker emitted by docker when the image is not present locally.
const IMAGE_NOT_FOUND_MARKER: &str = "No such image";

/// User-facing category of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The image reference names a tag the registry does not know.
    UnknownTag,
    /// The image could not be found locally or remotely.
    ImageNotFound,
    /// Anything else.
    Unclassified,
}

impl ErrorCategory {
    /// Short advice shown next to the failure message.
    pub fn summary(&self) -> &'static str {
        match self {
            ErrorCategory::UnknownTag => {
                "the image tag does not exist; check the tag and try again"
            }
            ErrorCategory::ImageNotFound => {
                "the image was not found; pull it first or check the name"
            }
            ErrorCategory::Unclassified => "see the full output for details",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::UnknownTag => write!(f, "unknown tag"),
            ErrorCategory::ImageNotFound => write!(f, "image not found"),
            ErrorCategory::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// Classify a diagnostic line.
///
/// Matching is case-sensitive and checked in priority order, so a line
/// mentioning both markers is an `UnknownTag`.
pub fn classify(diagnostic: &str) -> ErrorCategory {
    if diagnostic.contains(UNKNOWN_TAG_MARKER) {
        ErrorCategory::UnknownTag
    } else if diagnostic.contains(IMAGE_NOT_FOUND_MARKER) {
        ErrorCategory::ImageNotFound
    } else {
        ErrorCategory::Unclassified
    }
}
