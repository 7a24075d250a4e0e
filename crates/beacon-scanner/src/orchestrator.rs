//! Scan orchestrator for coordinating website scans.
//!
//! This module provides the `ScanOrchestrator` which launches one browser per
//! scan job, fans the job's pages out to the `PageScanner` with bounded
//! concurrency, and assembles the website result.

use crate::aggregator::{format_failed_website_result, format_website_result};
use crate::error::{Result, ScanError};
use crate::page::{PageScanner, ScanPolicy};
use beacon_browser::{BrowserLauncher, BrowserSession, PageOptions};
use beacon_core::config::default_page_concurrency;
use beacon_core::{ScanJob, WebsiteResult};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;

/// Orchestrates page scans for whole websites.
pub struct ScanOrchestrator {
    /// Starts one browser per job
    launcher: Arc<dyn BrowserLauncher>,
    /// Scans individual pages
    scanner: PageScanner,
    /// Maximum pages scanned at once within a job
    max_concurrent_pages: usize,
}

impl ScanOrchestrator {
    /// Create a new scan orchestrator.
    #[must_use]
    pub fn new(launcher: Arc<dyn BrowserLauncher>, policy: ScanPolicy) -> Self {
        Self {
            launcher,
            scanner: PageScanner::new(policy),
            max_concurrent_pages: default_page_concurrency(),
        }
    }

    /// Set the maximum number of pages scanned at once.
    #[must_use]
    pub fn with_max_concurrent_pages(mut self, max: usize) -> Self {
        self.max_concurrent_pages = max.max(1);
        self
    }

    /// Set the options each page is opened with.
    #[must_use]
    pub fn with_page_options(mut self, options: PageOptions) -> Self {
        self.scanner = self.scanner.with_page_options(options);
        self
    }

    /// Scan every page of `job`.
    ///
    /// Never fails: a job that cannot be started yields a failed result
    /// without pages, and failed pages are reported individually.
    pub async fn scan_website(&self, job: &ScanJob) -> WebsiteResult {
        let started = Instant::now();
        let webpages = job.unique_webpages();

        tracing::info!(
            job_id = job.job_id,
            domain = %job.domain,
            pages = webpages.len(),
            "Starting website scan"
        );

        let mut session = match self.prepare(job, webpages.is_empty()).await {
            Ok(Some(session)) => session,
            Ok(None) => return format_website_result(job, Vec::new()),
            Err(e) => return self.fail(job, &e),
        };

        let shared: &dyn BrowserSession = session.as_ref();
        // Built up front so the stream holds plain futures, not a borrowing closure
        let scans: Vec<_> = webpages
            .iter()
            .map(|url| self.scanner.scan(shared, url))
            .collect();
        let results = stream::iter(scans)
            .buffered(self.max_concurrent_pages)
            .collect::<Vec<_>>()
            .await;

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close browser for job {}: {}", job.job_id, e);
        }

        let result = format_website_result(job, results);
        tracing::info!(
            job_id = job.job_id,
            domain = %job.domain,
            failed_pages = result.failed_page_count(),
            elapsed = ?started.elapsed(),
            "Website scan finished"
        );
        result
    }

    /// Validate the job and launch its browser, unless there is nothing to scan.
    async fn prepare(
        &self,
        job: &ScanJob,
        nothing_to_scan: bool,
    ) -> Result<Option<Box<dyn BrowserSession>>> {
        job.validate()?;
        if nothing_to_scan {
            return Ok(None);
        }
        Ok(Some(self.launcher.launch().await?))
    }

    fn fail(&self, job: &ScanJob, error: &ScanError) -> WebsiteResult {
        tracing::error!("Scan job {} failed: {}", job.job_id, error);
        format_failed_website_result(Some(job), error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_browser::BrowserError;

    struct NoBrowser;

    #[async_trait::async_trait]
    impl BrowserLauncher for NoBrowser {
        async fn launch(&self) -> beacon_browser::Result<Box<dyn BrowserSession>> {
            Err(BrowserError::Launch("chrome not found".to_string()))
        }
    }

    fn orchestrator() -> ScanOrchestrator {
        ScanOrchestrator::new(Arc::new(NoBrowser), ScanPolicy::default())
    }

    #[test]
    fn test_max_concurrent_pages_is_at_least_one() {
        let orchestrator = orchestrator().with_max_concurrent_pages(0);
        assert_eq!(orchestrator.max_concurrent_pages, 1);
    }

    #[tokio::test]
    async fn test_launch_failure_fails_job() {
        let job = ScanJob::new(4, "example.com", vec!["https://example.com/".to_string()]);
        let result = orchestrator().scan_website(&job).await;

        assert_eq!(result.scan_status, beacon_core::ScanStatus::Failed);
        assert!(result.webpages.is_empty());
        assert_eq!(result.scan_job.as_ref().map(|j| j.job_id), Some(4));
        assert!(result
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("chrome not found")));
    }

    #[tokio::test]
    async fn test_invalid_job_fails_before_launch() {
        let job = ScanJob::new(5, "", vec!["https://example.com/".to_string()]);
        let result = orchestrator().scan_website(&job).await;
        assert_eq!(result.scan_status, beacon_core::ScanStatus::Failed);
        assert!(result
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("empty domain")));
    }
}
