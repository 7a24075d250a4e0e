//! Beacon Worker Application Shell
//!
//! This is the thin application shell that loads configuration, installs
//! logging and dispatches CLI commands. Core logic lives in the `crates/`
//! directory.

pub mod cli;
pub mod commands;

use anyhow::{Context, Result};
use beacon_core::WorkerConfig;
use cli::{Cli, Commands};
use tracing::info;

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,beacon=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Run the command selected on the command line.
pub async fn run(cli: Cli) -> Result<()> {
    init_tracing();

    info!("Starting Beacon worker v{}", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::load_with_env(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(&config).await,
        Commands::Enqueue {
            job_id,
            domain,
            pages,
        } => commands::enqueue::enqueue(&config, job_id, domain, pages).await,
        Commands::Schedule {
            candidates,
            budget,
            first_job_id,
            dry_run,
        } => {
            commands::schedule::schedule(&config, &candidates, budget, first_job_id, dry_run)
                .await
        }
    }
}
