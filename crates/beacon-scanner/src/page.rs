//! Single-page scanning with retry and navigation-timeout escalation.
//!
//! Each attempt is described by an immutable [`ScanRequest`]. After a
//! failed attempt, [`ScanRequest::next_attempt`] decides from the classified
//! error whether and how to try again:
//!
//! - an interrupted navigation is retried once, waiting for navigation to
//!   settle, without spending the retry budget;
//! - any other failure spends one retry, and a navigation timeout also
//!   raises the next attempt's timeout;
//! - an exhausted budget ends the scan with a failed page result.

use crate::aggregator::{format_failed_webpage_result, format_webpage_result};
use beacon_browser::{
    parse_page_url, AuditPage, BrowserError, BrowserSession, NavigationOptions, PageOptions,
    RawAuditOutput,
};
use beacon_core::{ScanningConfig, WebpageResult};
use std::time::Duration;

/// Retry and timeout policy applied to every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy {
    /// Retries allowed after the first attempt
    pub retry_budget: u32,
    /// Navigation timeout of the first attempt
    pub navigation_timeout: Duration,
    /// Added to the timeout after a timed-out attempt
    pub timeout_increment: Duration,
    /// Wait after stopping a timed-out navigation before auditing
    pub settle_delay: Duration,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self::from(&ScanningConfig::default())
    }
}

impl From<&ScanningConfig> for ScanPolicy {
    fn from(config: &ScanningConfig) -> Self {
        Self {
            retry_budget: config.retry_budget,
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            timeout_increment: Duration::from_millis(config.timeout_increment_ms),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        }
    }
}

/// One attempt at scanning a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub url: String,
    /// 1-based attempt number
    pub attempt: u32,
    pub retries_left: u32,
    pub navigation_timeout: Duration,
    pub wait_for_navigation: bool,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(ScanRequest),
    GiveUp,
}

impl ScanRequest {
    /// The first attempt for `url` under `policy`.
    #[must_use]
    pub fn new(url: impl Into<String>, policy: &ScanPolicy) -> Self {
        Self {
            url: url.into(),
            attempt: 1,
            retries_left: policy.retry_budget,
            navigation_timeout: policy.navigation_timeout,
            wait_for_navigation: false,
        }
    }

    /// Navigation settings for this attempt.
    #[must_use]
    pub fn navigation_options(&self) -> NavigationOptions {
        NavigationOptions {
            timeout: self.navigation_timeout,
            wait_for_navigation: self.wait_for_navigation,
        }
    }

    /// Decide the follow-up to this attempt failing with `failure`.
    #[must_use]
    pub fn next_attempt(&self, failure: &BrowserError, policy: &ScanPolicy) -> RetryDecision {
        if failure.is_navigation_interrupted() && !self.wait_for_navigation {
            return RetryDecision::Retry(Self {
                attempt: self.attempt + 1,
                wait_for_navigation: true,
                ..self.clone()
            });
        }

        if self.retries_left == 0 {
            return RetryDecision::GiveUp;
        }

        let navigation_timeout = if failure.is_navigation_timeout() {
            self.navigation_timeout + policy.timeout_increment
        } else {
            self.navigation_timeout
        };

        RetryDecision::Retry(Self {
            attempt: self.attempt + 1,
            retries_left: self.retries_left - 1,
            navigation_timeout,
            ..self.clone()
        })
    }
}

/// Scans single pages in isolated browsing contexts.
///
/// [`PageScanner::scan`] never fails: every failure path ends in a failed
/// [`WebpageResult`].
#[derive(Debug, Clone)]
pub struct PageScanner {
    policy: ScanPolicy,
    page_options: PageOptions,
}

impl PageScanner {
    /// Create a scanner with the given policy.
    #[must_use]
    pub fn new(policy: ScanPolicy) -> Self {
        Self {
            policy,
            page_options: PageOptions::for_audit(),
        }
    }

    /// Set the options each page is opened with.
    #[must_use]
    pub fn with_page_options(mut self, page_options: PageOptions) -> Self {
        self.page_options = page_options;
        self
    }

    /// Scan `url` using a tab of `session`.
    pub async fn scan(&self, session: &dyn BrowserSession, url: &str) -> WebpageResult {
        if let Err(e) = parse_page_url(url) {
            tracing::error!("Refusing to scan {}: {}", url, e);
            return format_failed_webpage_result(url, &e);
        }

        let mut request = ScanRequest::new(url, &self.policy);
        loop {
            tracing::debug!(
                url,
                attempt = request.attempt,
                timeout = ?request.navigation_timeout,
                "Scanning page"
            );

            let failure = match self.attempt(session, &request).await {
                Ok(output) => return format_webpage_result(url, &output),
                Err(e) => e,
            };

            match request.next_attempt(&failure, &self.policy) {
                RetryDecision::Retry(next) => {
                    tracing::warn!(
                        url,
                        attempt = request.attempt,
                        retries_left = next.retries_left,
                        "Page scan failed, retrying: {}",
                        failure
                    );
                    request = next;
                }
                RetryDecision::GiveUp => {
                    tracing::error!(
                        url,
                        attempt = request.attempt,
                        "Page scan failed, giving up: {}",
                        failure
                    );
                    return format_failed_webpage_result(url, &failure);
                }
            }
        }
    }

    async fn attempt(
        &self,
        session: &dyn BrowserSession,
        request: &ScanRequest,
    ) -> Result<RawAuditOutput, BrowserError> {
        let mut page = session.open_page(&self.page_options).await?;
        let result = self.audit(page.as_mut(), request).await;

        if let Err(e) = page.close().await {
            tracing::warn!("Failed to close page for {}: {}", request.url, e);
        }
        result
    }

    async fn audit(
        &self,
        page: &mut dyn AuditPage,
        request: &ScanRequest,
    ) -> Result<RawAuditOutput, BrowserError> {
        let timed_out = match page
            .navigate(&request.url, &request.navigation_options())
            .await
        {
            Ok(()) => None,
            Err(timeout) if timeout.is_navigation_timeout() => {
                // Audit whatever rendered before the timeout
                if let Err(e) = page.stop_loading().await {
                    tracing::debug!("Could not stop loading {}: {}", request.url, e);
                    return Err(timeout);
                }
                tracing::debug!(
                    "Navigation to {} timed out, auditing partial page after {:?}",
                    request.url,
                    self.policy.settle_delay
                );
                tokio::time::sleep(self.policy.settle_delay).await;
                Some(timeout)
            }
            Err(e) => return Err(e),
        };

        match (page.run_audit().await, timed_out) {
            // A failed partial audit still counts as a timeout so the next
            // attempt gets a longer one
            (Err(e), Some(timeout)) if !e.is_navigation_interrupted() => {
                tracing::debug!("Audit of partial page {} failed: {}", request.url, e);
                Err(timeout)
            }
            (result, _) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout_error() -> BrowserError {
        BrowserError::NavigationTimeout {
            url: "https://example.com/".to_string(),
            timeout_ms: 10_000,
        }
    }

    fn interrupted_error() -> BrowserError {
        BrowserError::NavigationInterrupted {
            url: "https://example.com/".to_string(),
        }
    }

    fn retried(decision: RetryDecision) -> ScanRequest {
        match decision {
            RetryDecision::Retry(request) => request,
            RetryDecision::GiveUp => panic!("expected a retry"),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = ScanPolicy::default();
        assert_eq!(policy.retry_budget, 2);
        assert_eq!(policy.navigation_timeout, Duration::from_secs(10));
        assert_eq!(policy.timeout_increment, Duration::from_secs(10));
        assert_eq!(policy.settle_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_timeout_escalates_and_spends_budget() {
        let policy = ScanPolicy::default();
        let first = ScanRequest::new("https://example.com/", &policy);

        let second = retried(first.next_attempt(&timeout_error(), &policy));
        assert_eq!(second.attempt, 2);
        assert_eq!(second.retries_left, 1);
        assert_eq!(second.navigation_timeout, Duration::from_secs(20));

        let third = retried(second.next_attempt(&timeout_error(), &policy));
        assert_eq!(third.retries_left, 0);
        assert_eq!(third.navigation_timeout, Duration::from_secs(30));

        assert_eq!(
            third.next_attempt(&timeout_error(), &policy),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn test_other_failures_keep_timeout() {
        let policy = ScanPolicy::default();
        let first = ScanRequest::new("https://example.com/", &policy);
        let second = retried(first.next_attempt(&BrowserError::Audit("x".to_string()), &policy));
        assert_eq!(second.retries_left, 1);
        assert_eq!(second.navigation_timeout, Duration::from_secs(10));
        assert!(!second.wait_for_navigation);
    }

    #[test]
    fn test_interrupted_navigation_retries_once_for_free() {
        let policy = ScanPolicy::default();
        let first = ScanRequest::new("https://example.com/", &policy);

        let second = retried(first.next_attempt(&interrupted_error(), &policy));
        assert!(second.wait_for_navigation);
        assert_eq!(second.retries_left, policy.retry_budget);

        // A second interruption is an ordinary failure
        let third = retried(second.next_attempt(&interrupted_error(), &policy));
        assert!(third.wait_for_navigation);
        assert_eq!(third.retries_left, policy.retry_budget - 1);
    }

    #[test]
    fn test_interrupted_retry_available_with_zero_budget() {
        let policy = ScanPolicy {
            retry_budget: 0,
            ..ScanPolicy::default()
        };
        let first = ScanRequest::new("https://example.com/", &policy);
        let second = retried(first.next_attempt(&interrupted_error(), &policy));
        assert_eq!(
            second.next_attempt(&interrupted_error(), &policy),
            RetryDecision::GiveUp
        );
    }
}
