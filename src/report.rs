//! Scan report parsing and severity reduction.
//!
//! The scanner writes a JSON report shaped like:
//!
//! ```json
//! {
//!   "Results": [
//!     { "Target": "nginx:1.21.6 (debian 11.3)",
//!       "Vulnerabilities": [ { "VulnerabilityID": "CVE-...", "Severity": "HIGH" } ] }
//!   ]
//! }
//! ```
//!
//! Every level of nesting is optional. Missing collections and missing
//! severity fields contribute zero; an unrecognised severity label is a
//! data-integrity fault and is reported as [`ReportError::UnknownSeverity`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while reading a scan report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// The report text is not valid JSON of the expected shape.
    #[error("failed to parse scan report: {0}")]
    Parse(String),

    /// A vulnerability carried a severity outside the five known buckets.
    #[error("unrecognized severity label '{0}'")]
    UnknownSeverity(String),
}

/// The five fixed severity buckets, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

/// All severities in display order.
pub const SEVERITIES: [Severity; 5] = [
    Severity::Unknown,
    Severity::Low,
    Severity::Medium,
    Severity::High,
    Severity::Critical,
];

impl Severity {
    /// Parse a scanner severity label. Labels are matched exactly.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "UNKNOWN" => Some(Self::Unknown),
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Vulnerability counts per severity bucket.
///
/// Always holds an entry for each of the five severities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeverityCounts(BTreeMap<Severity, usize>);

impl SeverityCounts {
    /// Create a zero-initialized set of counts.
    pub fn new() -> Self {
        Self(SEVERITIES.iter().map(|s| (*s, 0)).collect())
    }

    /// Count for a single severity.
    pub fn get(&self, severity: Severity) -> usize {
        self.0.get(&severity).copied().unwrap_or(0)
    }

    fn increment(&mut self, severity: Severity) {
        *self.0.entry(severity).or_insert(0) += 1;
    }

    /// Total number of vulnerabilities across all buckets.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Iterate over `(severity, count)` pairs, most severe first.
    pub fn iter_most_severe_first(&self) -> impl Iterator<Item = (Severity, usize)> + '_ {
        SEVERITIES.iter().rev().map(|s| (*s, self.get(*s)))
    }
}

impl Default for SeverityCounts {
    fn default() -> Self {
        Self::new()
    }
}

/// Parsed scan report. Only the fields the reducer needs are modelled;
/// everything else in the scanner output is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanReport {
    #[serde(rename = "Results", default)]
    pub results: Option<Vec<ResultGroup>>,
}

/// One scanned target (an OS layer or a language package set).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultGroup {
    #[serde(rename = "Target", default)]
    pub target: Option<String>,

    #[serde(rename = "Vulnerabilities", default)]
    pub vulnerabilities: Option<Vec<VulnerabilityRecord>>,
}

/// A single finding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VulnerabilityRecord {
    #[serde(rename = "VulnerabilityID", default)]
    pub id: Option<String>,

    #[serde(rename = "Severity", default)]
    pub severity: Option<String>,
}

/// Parse raw report text.
pub fn parse_report(text: &str) -> Result<ScanReport, ReportError> {
    serde_json::from_str(text).map_err(|e| ReportError::Parse(e.to_string()))
}

/// Reduce a report to counts per severity bucket.
pub fn reduce(report: &ScanReport) -> Result<SeverityCounts, ReportError> {
    let mut counts = SeverityCounts::new();

    let groups = report.results.as_deref().unwrap_or_default();
    for group in groups {
        let records = group.vulnerabilities.as_deref().unwrap_or_default();
        for record in records {
            let Some(label) = record.severity.as_deref() else {
                continue;
            };
            let severity = Severity::from_label(label)
                .ok_or_else(|| ReportError::UnknownSeverity(label.to_string()))?;
            counts.increment(severity);
        }
    }

    Ok(counts)
}

/// Parse and reduce in one step.
pub fn count_severities(text: &str) -> Result<SeverityCounts, ReportError> {
    reduce(&parse_report(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_two_results_one_without_vulnerabilities() {
        let text = r#"{
            "Results": [
                {
                    "Target": "nginx:1.21.6 (debian 11.3)",
                    "Vulnerabilities": [
                        {"VulnerabilityID": "CVE-2022-0001", "Severity": "CRITICAL"},
                        {"VulnerabilityID": "CVE-2022-0002", "Severity": "LOW"}
                    ]
                },
                {"Target": "app/package-lock.json"}
            ]
        }"#;

        let counts = count_severities(text).unwrap();

        assert_eq!(counts.get(Severity::Unknown), 0);
        assert_eq!(counts.get(Severity::Low), 1);
        assert_eq!(counts.get(Severity::Medium), 0);
        assert_eq!(counts.get(Severity::High), 0);
        assert_eq!(counts.get(Severity::Critical), 1);
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn test_reduce_missing_results_is_all_zero() {
        let counts = count_severities("{}").unwrap();
        assert_eq!(counts, SeverityCounts::new());
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn test_reduce_null_collections_contribute_zero() {
        let text = r#"{"Results": [{"Vulnerabilities": null}], "SchemaVersion": 2}"#;
        let counts = count_severities(text).unwrap();
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn test_reduce_skips_records_without_severity() {
        let text = r#"{"Results": [{"Vulnerabilities": [
            {"VulnerabilityID": "CVE-1"},
            {"VulnerabilityID": "CVE-2", "Severity": "MEDIUM"}
        ]}]}"#;
        let counts = count_severities(text).unwrap();
        assert_eq!(counts.get(Severity::Medium), 1);
        assert_eq!(counts.total(), 1);
    }

    #[test]
    fn test_reduce_unknown_label_is_an_error() {
        let text = r#"{"Results": [{"Vulnerabilities": [{"Severity": "SEVERE"}]}]}"#;
        let err = count_severities(text).unwrap_err();
        assert_eq!(err, ReportError::UnknownSeverity("SEVERE".to_string()));
    }

    #[test]
    fn test_reduce_labels_are_case_sensitive() {
        let text = r#"{"Results": [{"Vulnerabilities": [{"Severity": "high"}]}]}"#;
        assert!(matches!(
            count_severities(text),
            Err(ReportError::UnknownSeverity(_))
        ));
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_report("not json").unwrap_err();
        assert!(matches!(err, ReportError::Parse(_)));
    }

    #[test]
    fn test_counts_always_fully_populated() {
        let counts = SeverityCounts::new();
        let listed: Vec<_> = counts.iter_most_severe_first().collect();
        assert_eq!(listed.len(), 5);
        assert_eq!(listed[0], (Severity::Critical, 0));
        assert_eq!(listed[4], (Severity::Unknown, 0));
    }

    #[test]
    fn test_counts_serialize_every_bucket() {
        let counts = count_severities(r#"{"Results":[{"Vulnerabilities":[{"Severity":"LOW"}]}]}"#)
            .unwrap();
        let json = serde_json::to_value(&counts).unwrap();
        let buckets = json.as_object().unwrap();
        assert_eq!(buckets.len(), SEVERITIES.len());
        for severity in SEVERITIES {
            assert!(buckets.contains_key(severity.label()), "{} missing", severity);
        }
    }

    #[test]
    fn test_counts_serialize_with_scanner_labels() {
        let counts = count_severities(r#"{"Results":[{"Vulnerabilities":[{"Severity":"HIGH"}]}]}"#)
            .unwrap();
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["HIGH"], 1);
        assert_eq!(json["UNKNOWN"], 0);
    }
}
