use crate::audit::RawAuditOutput;
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use std::time::Duration;

/// Starts one browser process per scan job.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a browser and return a session owning it
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// A running browser shared by the page scans of one job.
#[async_trait::async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open a tab in a fresh, isolated browsing context
    async fn open_page(&self, options: &PageOptions) -> Result<Box<dyn AuditPage>>;

    /// Shut the browser down. Calls after the first are no-ops.
    async fn close(&mut self) -> Result<()>;
}

/// One tab in its own browsing context.
#[async_trait::async_trait]
pub trait AuditPage: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&mut self, url: &str, options: &NavigationOptions) -> Result<()>;

    /// Stop any in-flight loading, keeping what has rendered so far
    async fn stop_loading(&self) -> Result<()>;

    /// Run the accessibility audit against the current document
    async fn run_audit(&self) -> Result<RawAuditOutput>;

    /// Close the tab and dispose its browsing context
    async fn close(&mut self) -> Result<()>;
}

/// Settings for a newly opened page.
#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    pub fingerprint: FingerprintConfig,
    /// Needed so the audit engine can be injected on strict-CSP sites
    pub bypass_csp: bool,
}

impl PageOptions {
    /// Options every audited page is opened with.
    #[must_use]
    pub fn for_audit() -> Self {
        Self {
            fingerprint: FingerprintConfig::desktop(),
            bypass_csp: true,
        }
    }
}

/// Settings for a single navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationOptions {
    pub timeout: Duration,
    /// Also wait for a follow-up navigation to settle
    pub wait_for_navigation: bool,
}

/// Validate that a page URL can be navigated to.
pub fn parse_page_url(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url)
        .map_err(|e| BrowserError::Navigation(format!("Invalid URL {url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        "http" | "https" => Err(BrowserError::Navigation(format!("No host in URL {url}"))),
        scheme => Err(BrowserError::Navigation(format!(
            "Unsupported scheme '{scheme}' in URL {url}"
        ))),
    }
}
