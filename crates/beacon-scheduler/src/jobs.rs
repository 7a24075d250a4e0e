//! Rescan candidate definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored website that may be scanned again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RescanCandidate {
    pub website_id: i64,
    pub owner_id: i64,
    pub domain: String,
    pub webpages: Vec<String>,
    #[serde(default)]
    pub last_scanned_at: Option<DateTime<Utc>>,
}

impl RescanCandidate {
    /// Pages this site would consume from the budget.
    pub fn page_count(&self) -> usize {
        self.webpages.len()
    }
}
