//! Wire shapes exchanged with the backend over the queues.
//!
//! Job messages are [`ScanJob`](crate::ScanJob) values as-is. Result
//! messages flatten the answered job into `jobId`, with sentinel values when
//! the scan failed without a job context.

use crate::model::{ScanStatus, WebpageResult, WebsiteResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `jobId` reported when the result has no job context.
pub const NO_JOB_ID: i64 = 0;

/// `domain` reported when the result has no job context.
pub const NO_DOMAIN: &str = "N/A";

/// Result message published once per consumed job message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteResultMessage {
    /// Model version of the result tree
    pub model_version: String,
    /// Job this result answers
    pub job_id: i64,
    /// Website domain
    pub domain: String,
    /// When the scan completed
    pub scan_timestamp: DateTime<Utc>,
    /// `success` or `failed`
    pub scan_status: ScanStatus,
    /// Normalized failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Page results in job order
    pub webpages: Vec<WebpageResult>,
}

impl From<WebsiteResult> for WebsiteResultMessage {
    fn from(result: WebsiteResult) -> Self {
        let (job_id, domain) = match &result.scan_job {
            Some(job) => (job.job_id, result.domain),
            None => (NO_JOB_ID, NO_DOMAIN.to_string()),
        };

        Self {
            model_version: result.model_version,
            job_id,
            domain,
            scan_timestamp: result.scan_timestamp,
            scan_status: result.scan_status,
            error_message: result.error_message,
            webpages: result.webpages,
        }
    }
}

impl WebsiteResultMessage {
    /// Serialize to the JSON payload published on the result queue.
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
