//! Monthly rescan run: pick due websites within the page budget and publish
//! their jobs.

use anyhow::{Context, Result};
use beacon_core::{ScanJob, WorkerConfig, MODEL_VERSION};
use beacon_scheduler::{allocate_fair_share, build_scan_jobs, RescanCandidate};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::info;

/// Read rescan candidates from a JSON array file.
pub fn load_candidates(path: &Path) -> Result<Vec<RescanCandidate>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid candidate list in {}", path.display()))
}

/// Jobs for the candidates that fit `budget` at `now`.
pub fn plan(
    candidates: &[RescanCandidate],
    budget: usize,
    first_job_id: i64,
    now: DateTime<Utc>,
) -> Vec<ScanJob> {
    let selected = allocate_fair_share(candidates, budget, now);
    build_scan_jobs(&selected, first_job_id, MODEL_VERSION, now)
}

/// Plan a rescan run and publish (or print) its jobs.
pub async fn schedule(
    config: &WorkerConfig,
    candidates: &Path,
    budget: usize,
    first_job_id: i64,
    dry_run: bool,
) -> Result<()> {
    let candidates = load_candidates(candidates)?;
    let jobs = plan(&candidates, budget, first_job_id, Utc::now());

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    let transport = super::transport(config)?;
    beacon_queue::enqueue_jobs(&transport, &jobs)
        .await
        .context("Failed to publish scan jobs")?;

    info!("Scheduled {} scan jobs", jobs.len());
    Ok(())
}
