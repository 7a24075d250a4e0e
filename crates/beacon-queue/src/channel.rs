//! Long-lived job consumption loop.
//!
//! The channel connects, takes one job at a time, hands it to the
//! [`JobHandler`], publishes the result and only then acknowledges the job.
//! While the handler runs the delivery's deadline is extended with periodic
//! heartbeats. Any transport failure ends the session; the channel waits the
//! reconnect delay and starts a new one, forever.

use crate::error::Result;
use crate::transport::{Delivery, JobConnection, JobTransport};
use async_trait::async_trait;
use beacon_core::{ScanJob, WebsiteResult, WebsiteResultMessage, NO_JOB_ID};
use beacon_scanner::{format_failed_website_result, FailureCause, ScanOrchestrator};
use std::sync::Arc;
use std::time::Duration;

/// Turns a scan job into a website result. Must not fail.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Process one job.
    async fn handle(&self, job: ScanJob) -> WebsiteResult;
}

#[async_trait]
impl JobHandler for ScanOrchestrator {
    async fn handle(&self, job: ScanJob) -> WebsiteResult {
        self.scan_website(&job).await
    }
}

/// Default period between in-progress heartbeats.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Consumes scan jobs and publishes their results.
pub struct JobChannel {
    transport: Arc<dyn JobTransport>,
    handler: Arc<dyn JobHandler>,
    reconnect_delay: Duration,
    progress_interval: Duration,
}

impl JobChannel {
    /// Create a channel over `transport` feeding jobs to `handler`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn JobTransport>,
        handler: Arc<dyn JobHandler>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            transport,
            handler,
            reconnect_delay,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Set how often a running job's deadline is extended. Must be shorter
    /// than the broker's ack wait.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Consume jobs until the process exits, reconnecting after every
    /// session failure.
    pub async fn run(&self) {
        loop {
            match self.serve().await {
                Ok(()) => tracing::warn!("Job subscription ended"),
                Err(e) => tracing::error!("Job channel failed: {}", e),
            }

            tracing::info!("Reconnecting in {:?}", self.reconnect_delay);
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Run one broker session until the subscription ends or fails.
    pub async fn serve(&self) -> Result<()> {
        let mut connection = self.transport.connect().await?;
        tracing::info!("Waiting for scan jobs");

        while let Some(delivery) = connection.next_delivery().await? {
            self.process_delivery(connection.as_mut(), delivery).await?;
        }
        Ok(())
    }

    /// Handle one delivery: decode, scan, publish, then acknowledge.
    ///
    /// Undecodable payloads still get a failed result without job context.
    /// A failed publish rejects the delivery so another worker picks it up.
    pub async fn process_delivery(
        &self,
        connection: &mut dyn JobConnection,
        delivery: Delivery,
    ) -> Result<()> {
        let result = match serde_json::from_slice::<ScanJob>(delivery.payload()) {
            Ok(job) => {
                tracing::info!(job_id = job.job_id, domain = %job.domain, "Received scan job");
                self.handle_with_progress(&delivery, job).await
            }
            Err(e) => {
                tracing::warn!("Received malformed scan job: {}", e);
                format_failed_website_result(None, FailureCause::error(&e))
            }
        };

        let job_id = result.scan_job.as_ref().map_or(NO_JOB_ID, |job| job.job_id);
        let status = result.scan_status;
        let published = match WebsiteResultMessage::from(result).to_payload() {
            Ok(payload) => connection.publish_result(payload.into()).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = published {
            if let Err(nak_err) = delivery.nak().await {
                tracing::warn!(job_id, "Failed to reject scan job: {}", nak_err);
            }
            return Err(e);
        }
        delivery.ack().await?;

        tracing::info!(job_id, %status, "Published website result");
        Ok(())
    }

    /// Run the handler, sending a heartbeat every progress interval until it
    /// finishes.
    async fn handle_with_progress(&self, delivery: &Delivery, job: ScanJob) -> WebsiteResult {
        let job_id = job.job_id;
        let mut handling = std::pin::pin!(self.handler.handle(job));
        let mut heartbeat = tokio::time::interval_at(
            tokio::time::Instant::now() + self.progress_interval,
            self.progress_interval,
        );

        loop {
            tokio::select! {
                result = &mut handling => return result,
                _ = heartbeat.tick() => {
                    if let Err(e) = delivery.progress().await {
                        tracing::warn!(job_id, "Failed to extend scan job deadline: {}", e);
                    }
                }
            }
        }
    }
}

/// Publish `job` to the job queue through a fresh session.
pub async fn enqueue_job(transport: &dyn JobTransport, job: &ScanJob) -> Result<()> {
    enqueue_jobs(transport, std::slice::from_ref(job)).await
}

/// Publish `jobs` in order through one session.
pub async fn enqueue_jobs(transport: &dyn JobTransport, jobs: &[ScanJob]) -> Result<()> {
    let mut connection = transport.connect().await?;
    for job in jobs {
        let payload = serde_json::to_vec(job)?;
        connection.publish_job(payload.into()).await?;
        tracing::info!(job_id = job.job_id, domain = %job.domain, "Enqueued scan job");
    }
    Ok(())
}
