//! The long-running scan worker.

use anyhow::{Context, Result};
use beacon_browser::BrowserEngine;
use beacon_core::WorkerConfig;
use beacon_queue::JobChannel;
use beacon_scanner::{ScanOrchestrator, ScanPolicy};
use std::sync::Arc;
use tracing::info;

/// Consume scan jobs until the process receives Ctrl-C.
pub async fn run(config: &WorkerConfig) -> Result<()> {
    let transport = super::transport(config)?;

    let engine =
        BrowserEngine::new(config.browser.clone()).context("Failed to prepare browser engine")?;
    let page_options = engine.page_options();
    let pages = config.scanning.page_concurrency();

    let orchestrator = ScanOrchestrator::new(Arc::new(engine), ScanPolicy::from(&config.scanning))
        .with_max_concurrent_pages(pages)
        .with_page_options(page_options);

    info!(
        pages,
        retry_budget = config.scanning.retry_budget,
        "Scan worker ready"
    );

    let channel = JobChannel::new(
        Arc::new(transport),
        Arc::new(orchestrator),
        config.queue.reconnect_delay(),
    )
    .with_progress_interval(config.queue.progress_interval());

    tokio::select! {
        () = channel.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Shutting down");
        }
    }
    Ok(())
}
