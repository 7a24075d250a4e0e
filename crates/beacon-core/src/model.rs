//! Scan jobs and the normalized accessibility result tree.
//!
//! A [`WebsiteResult`] owns its [`WebpageResult`]s, which own their
//! [`Rule`]s, which own their [`Check`]s. The tree is built bottom-up by the
//! scanner and handed to the queue layer once, by value.

use crate::error::{BeaconError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Version of the result model produced by this worker.
pub const MODEL_VERSION: &str = "1.0";

/// One request to audit all listed pages of a website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanJob {
    /// Identifier used to correlate the result with the job
    pub job_id: i64,
    /// Model version requested by the producer
    pub model_version: String,
    /// When the producer created the job
    pub job_timestamp: DateTime<Utc>,
    /// Website domain the pages belong to
    pub domain: String,
    /// Page URLs to scan
    pub webpages: Vec<String>,
}

impl ScanJob {
    /// Create a job stamped with the current time and [`MODEL_VERSION`].
    #[must_use]
    pub fn new(job_id: i64, domain: impl Into<String>, webpages: Vec<String>) -> Self {
        Self {
            job_id,
            model_version: MODEL_VERSION.to_string(),
            job_timestamp: Utc::now(),
            domain: domain.into(),
            webpages,
        }
    }

    /// The page set in submission order with duplicates removed.
    #[must_use]
    pub fn unique_webpages(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.webpages
            .iter()
            .filter(|url| seen.insert(url.as_str()))
            .cloned()
            .collect()
    }

    /// Reject jobs that cannot be attributed to a website.
    pub fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(BeaconError::Validation(format!(
                "job {} has an empty domain",
                self.job_id
            )));
        }
        Ok(())
    }
}

/// Outcome of a page or website scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// The scan produced results
    Success,
    /// The scan gave up; see the error message
    Failed,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of scanning a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpageResult {
    /// Page URL as requested in the job
    pub url: String,
    /// Whether the page was audited
    pub scan_status: ScanStatus,
    /// Normalized failure message for failed pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Rules that produced findings on the page
    pub rules: Vec<Rule>,
}

impl WebpageResult {
    /// A successfully audited page.
    #[must_use]
    pub fn success(url: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            url: url.into(),
            scan_status: ScanStatus::Success,
            error_message: None,
            rules,
        }
    }

    /// A page whose scan gave up.
    #[must_use]
    pub fn failed(url: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            scan_status: ScanStatus::Failed,
            error_message: Some(error_message.into()),
            rules: Vec::new(),
        }
    }

    /// Check if the page was audited.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.scan_status == ScanStatus::Success
    }
}

/// One accessibility rule that produced findings on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Rule identifier, e.g. `image-alt`
    pub code: String,
    /// Human-readable rule description
    pub description: String,
    /// Documentation link for the rule
    pub axe_url: String,
    /// WCAG success criteria the rule maps to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wcag_references: Option<WcagReferences>,
    /// Checks evaluated for the rule
    pub checks: Vec<Check>,
}

/// WCAG version, conformance level and criteria referenced by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WcagReferences {
    /// WCAG version, e.g. `2.1`
    pub version: String,
    /// Conformance level
    pub level: WcagLevel,
    /// Success criteria, e.g. `1.4.3`
    pub criteria: BTreeSet<String>,
}

/// WCAG conformance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WcagLevel {
    /// Level A
    A,
    /// Level AA
    AA,
    /// Level AAA
    AAA,
}

/// How a check participates in its rule's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    /// At least one check of the group must pass
    Any,
    /// Every check of the group must pass
    All,
    /// No check of the group may match
    None,
}

/// Severity reported for a failing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    /// Minor
    Minor,
    /// Moderate
    Moderate,
    /// Serious
    Serious,
    /// Critical
    Critical,
}

impl Impact {
    /// Parse an audit-engine impact string.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "minor" => Some(Self::Minor),
            "moderate" => Some(Self::Moderate),
            "serious" => Some(Self::Serious),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Statistics for one check of one rule on one page.
///
/// `tested_count == passed_count + violated_count + incomplete_count`, and
/// every violated or incomplete node has exactly one element in the
/// matching list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    /// Check identifier, e.g. `has-alt`
    pub code: String,
    /// Check group the check was evaluated in
    #[serde(rename = "type")]
    pub check_type: CheckType,
    /// Severity of a failure
    pub impact: Impact,
    /// Nodes the check was evaluated against
    pub tested_count: u32,
    /// Nodes that passed
    pub passed_count: u32,
    /// Nodes that violated the check
    pub violated_count: u32,
    /// Nodes that need manual review
    pub incomplete_count: u32,
    /// One element per violating node
    pub violating_elements: Vec<CheckElement>,
    /// One element per incomplete node
    pub incomplete_elements: Vec<CheckElement>,
}

/// A page element that violated a check or could not be decided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckElement {
    /// Selector locating the element
    pub target: String,
    /// Outer HTML snippet
    pub html: String,
    /// Check message explaining the finding
    pub issue_description: String,
    /// Check-specific data reported by the audit engine
    #[serde(default)]
    pub data: serde_json::Value,
    /// Other elements involved in the finding
    pub related_elements: Vec<Element>,
}

/// A page element referenced by a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Selector locating the element
    pub target: String,
    /// Outer HTML snippet
    pub html: String,
}

/// Result of scanning every page of a website for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteResult {
    /// Model version of the result
    pub model_version: String,
    /// Website domain
    pub domain: String,
    /// When the scan completed
    pub scan_timestamp: DateTime<Utc>,
    /// Whether the website scan ran
    pub scan_status: ScanStatus,
    /// Normalized failure message for failed scans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// The job this result answers, if it was known when the scan failed
    pub scan_job: Option<ScanJob>,
    /// Page results in job order
    pub webpages: Vec<WebpageResult>,
}

impl WebsiteResult {
    /// A completed website scan, stamped now.
    #[must_use]
    pub fn success(job: &ScanJob, webpages: Vec<WebpageResult>) -> Self {
        Self {
            model_version: job.model_version.clone(),
            domain: job.domain.clone(),
            scan_timestamp: Utc::now(),
            scan_status: ScanStatus::Success,
            error_message: None,
            scan_job: Some(job.clone()),
            webpages,
        }
    }

    /// A website scan that failed before any page was scanned.
    #[must_use]
    pub fn failed(job: Option<&ScanJob>, error_message: impl Into<String>) -> Self {
        Self {
            model_version: job.map_or_else(|| MODEL_VERSION.to_string(), |j| j.model_version.clone()),
            domain: job.map(|j| j.domain.clone()).unwrap_or_default(),
            scan_timestamp: Utc::now(),
            scan_status: ScanStatus::Failed,
            error_message: Some(error_message.into()),
            scan_job: job.cloned(),
            webpages: Vec::new(),
        }
    }

    /// Number of pages whose scan failed.
    #[must_use]
    pub fn failed_page_count(&self) -> usize {
        self.webpages.iter().filter(|p| !p.is_success()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_webpages_keeps_first_occurrence() {
        let job = ScanJob::new(
            1,
            "example.com",
            vec![
                "https://example.com/b".to_string(),
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string(),
            ],
        );
        assert_eq!(
            job.unique_webpages(),
            vec!["https://example.com/b", "https://example.com/a"]
        );
    }

    #[test]
    fn test_validate_rejects_blank_domain() {
        let job = ScanJob::new(3, "  ", vec![]);
        assert!(matches!(job.validate(), Err(BeaconError::Validation(_))));
        assert!(ScanJob::new(3, "example.com", vec![]).validate().is_ok());
    }

    #[test]
    fn test_job_deserializes_from_producer_json() {
        let json = r#"{
            "jobId": 42,
            "modelVersion": "1.0",
            "jobTimestamp": "2026-03-01T10:00:00Z",
            "domain": "example.com",
            "webpages": ["https://example.com/"]
        }"#;
        let job: ScanJob = serde_json::from_str(json).expect("parse job");
        assert_eq!(job.job_id, 42);
        assert_eq!(job.domain, "example.com");
        assert_eq!(job.webpages.len(), 1);
    }

    #[test]
    fn test_check_serializes_type_and_impact_lowercase() {
        let check = Check {
            code: "has-alt".to_string(),
            check_type: CheckType::Any,
            impact: Impact::Critical,
            tested_count: 1,
            passed_count: 1,
            violated_count: 0,
            incomplete_count: 0,
            violating_elements: vec![],
            incomplete_elements: vec![],
        };
        let value = serde_json::to_value(&check).expect("serialize check");
        assert_eq!(value["type"], "any");
        assert_eq!(value["impact"], "critical");
        assert_eq!(value["testedCount"], 1);
    }

    #[test]
    fn test_failed_page_has_no_rules() {
        let page = WebpageResult::failed("https://example.com/", "boom");
        assert!(!page.is_success());
        assert_eq!(page.error_message.as_deref(), Some("boom"));
        assert!(page.rules.is_empty());
    }

    #[test]
    fn test_failed_website_without_job() {
        let result = WebsiteResult::failed(None, "launch failed");
        assert_eq!(result.scan_status, ScanStatus::Failed);
        assert!(result.scan_job.is_none());
        assert_eq!(result.model_version, MODEL_VERSION);
        assert!(result.webpages.is_empty());
    }

    #[test]
    fn test_impact_parse() {
        assert_eq!(Impact::parse("serious"), Some(Impact::Serious));
        assert_eq!(Impact::parse("unknown"), None);
    }
}
