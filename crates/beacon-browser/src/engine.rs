use crate::actions::{AuditPage, BrowserLauncher, BrowserSession, NavigationOptions, PageOptions};
use crate::audit::{AxeScript, RawAuditOutput};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use beacon_core::BrowserConfig as LaunchSettings;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{SetBypassCspParams, StopLoadingParams};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Chromium-backed browser launcher.
///
/// Holds the launch settings and the audit script; every call to
/// [`BrowserLauncher::launch`] starts a fresh browser process.
pub struct BrowserEngine {
    settings: LaunchSettings,
    fingerprint: FingerprintConfig,
    script: AxeScript,
}

impl BrowserEngine {
    /// Create an engine, loading the audit script from the configured path.
    pub fn new(settings: LaunchSettings) -> Result<Self> {
        let script = AxeScript::load(&settings.axe_script_path)?;
        Ok(Self::with_script(settings, script))
    }

    /// Create an engine with an already loaded audit script.
    #[must_use]
    pub fn with_script(settings: LaunchSettings, script: AxeScript) -> Self {
        let fingerprint = FingerprintConfig::desktop()
            .with_viewport(settings.window_width, settings.window_height);
        Self {
            settings,
            fingerprint,
            script,
        }
    }

    /// Options pages should be opened with to match this engine's window.
    #[must_use]
    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            fingerprint: self.fingerprint.clone(),
            ..PageOptions::for_audit()
        }
    }

    fn launch_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder().window_size(
            self.fingerprint.viewport_width,
            self.fingerprint.viewport_height,
        );
        if !self.settings.headless {
            builder = builder.with_head();
        }
        if !self.settings.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(executable) = &self.settings.executable {
            builder = builder.chrome_executable(executable);
        }
        builder.build().map_err(BrowserError::Launch)
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for BrowserEngine {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let config = self.launch_config()?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // Drive the CDP connection until the browser goes away
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("CDP handler event error: {}", e);
                }
            }
        });

        tracing::debug!("Browser launched");

        Ok(Box::new(ChromiumSession {
            browser: Arc::new(RwLock::new(browser)),
            handler_task,
            script: self.script.clone(),
            closed: false,
        }))
    }
}

/// One Chromium process and the task driving its CDP connection.
struct ChromiumSession {
    browser: Arc<RwLock<Browser>>,
    handler_task: JoinHandle<()>,
    script: AxeScript,
    closed: bool,
}

#[async_trait::async_trait]
impl BrowserSession for ChromiumSession {
    async fn open_page(&self, options: &PageOptions) -> Result<Box<dyn AuditPage>> {
        let browser = self.browser.read().await;

        let context_id = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| BrowserError::Context(e.to_string()))?
            .result
            .browser_context_id;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(BrowserError::Context)?;

        let page = match browser.new_page(target).await {
            Ok(page) => page,
            Err(e) => {
                if let Err(dispose_err) = browser
                    .execute(DisposeBrowserContextParams::new(context_id))
                    .await
                {
                    tracing::debug!("Failed to dispose unused browser context: {}", dispose_err);
                }
                return Err(BrowserError::Context(e.to_string()));
            }
        };
        drop(browser);

        let mut audit_page = ChromiumPage {
            page,
            context_id,
            browser: Arc::clone(&self.browser),
            script: self.script.clone(),
            current_url: String::from("about:blank"),
            closed: false,
        };

        if let Err(e) = audit_page.apply(options).await {
            if let Err(close_err) = audit_page.close().await {
                tracing::debug!("Failed to close page after setup error: {}", close_err);
            }
            return Err(e);
        }

        Ok(Box::new(audit_page))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut browser = self.browser.write().await;
        let result = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Chromium(e.to_string()));
        if let Err(e) = browser.wait().await {
            tracing::warn!("Failed to reap browser process: {}", e);
        }
        self.handler_task.abort();

        tracing::debug!("Browser closed");
        result
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

/// A tab living in its own browser context.
struct ChromiumPage {
    page: Page,
    context_id: BrowserContextId,
    browser: Arc<RwLock<Browser>>,
    script: AxeScript,
    current_url: String,
    closed: bool,
}

impl ChromiumPage {
    async fn apply(&self, options: &PageOptions) -> Result<()> {
        let fingerprint = &options.fingerprint;

        self.page
            .execute(SetUserAgentOverrideParams::new(
                fingerprint.user_agent.clone(),
            ))
            .await
            .map_err(|e| BrowserError::Context(e.to_string()))?;

        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(fingerprint.viewport_width),
                i64::from(fingerprint.viewport_height),
                1.0,
                false,
            ))
            .await
            .map_err(|e| BrowserError::Context(e.to_string()))?;

        if options.bypass_csp {
            self.page
                .execute(SetBypassCspParams::new(true))
                .await
                .map_err(|e| BrowserError::Context(e.to_string()))?;
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl AuditPage for ChromiumPage {
    async fn navigate(&mut self, url: &str, options: &NavigationOptions) -> Result<()> {
        self.current_url = url.to_string();
        let timeout_ms = u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX);

        let navigation = async {
            self.page.goto(url).await?;
            if options.wait_for_navigation {
                self.page.wait_for_navigation().await?;
            }
            Ok::<_, CdpError>(())
        };

        match tokio::time::timeout(options.timeout, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(classify(url, timeout_ms, &e)
                .unwrap_or_else(|| BrowserError::Navigation(e.to_string()))),
            Err(_) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms,
            }),
        }
    }

    async fn stop_loading(&self) -> Result<()> {
        self.page
            .execute(StopLoadingParams::default())
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Chromium(e.to_string()))
    }

    async fn run_audit(&self) -> Result<RawAuditOutput> {
        // A redirect can still tear down the document while the audit runs
        let audit_error = |e: CdpError| {
            let message = e.to_string();
            if is_context_destroyed(&message) {
                BrowserError::NavigationInterrupted {
                    url: self.current_url.clone(),
                }
            } else {
                BrowserError::Audit(message)
            }
        };

        self.page
            .evaluate_expression(self.script.injection_source())
            .await
            .map_err(audit_error)?;

        let run = EvaluateParams::builder()
            .expression(self.script.run_expression())
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(BrowserError::Audit)?;

        let value: serde_json::Value = self
            .page
            .evaluate_expression(run)
            .await
            .map_err(audit_error)?
            .into_value()
            .map_err(|e| BrowserError::Audit(e.to_string()))?;

        RawAuditOutput::from_value(value)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let closed_tab = self.page.clone().close().await;
        let disposed = self
            .browser
            .read()
            .await
            .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
            .await;

        closed_tab.map_err(|e| BrowserError::Chromium(e.to_string()))?;
        disposed
            .map(|_| ())
            .map_err(|e| BrowserError::Chromium(e.to_string()))
    }
}

/// Map CDP failures with navigation meaning onto typed errors.
///
/// This is the only place that looks at CDP error text.
fn classify(url: &str, timeout_ms: u64, err: &CdpError) -> Option<BrowserError> {
    if matches!(err, CdpError::Timeout) {
        return Some(BrowserError::NavigationTimeout {
            url: url.to_string(),
            timeout_ms,
        });
    }
    is_context_destroyed(&err.to_string()).then(|| BrowserError::NavigationInterrupted {
        url: url.to_string(),
    })
}

fn is_context_destroyed(message: &str) -> bool {
    message.contains("Execution context was destroyed")
        || message.contains("Cannot find context with specified id")
}
