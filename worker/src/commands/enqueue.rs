use anyhow::Result;
use beacon_core::{ScanJob, WorkerConfig};

/// Publish one scan job built from the command line.
pub async fn enqueue(
    config: &WorkerConfig,
    job_id: i64,
    domain: String,
    pages: Vec<String>,
) -> Result<()> {
    let job = ScanJob::new(job_id, domain, pages);
    job.validate()?;

    let transport = super::transport(config)?;
    beacon_queue::enqueue_job(&transport, &job).await?;
    Ok(())
}
