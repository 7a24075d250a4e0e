//! Command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "beacon-worker")]
#[command(version, about = "Accessibility scan worker")]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "BEACON_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Consume scan jobs until terminated (default)
    Run,

    /// Publish a single scan job
    Enqueue {
        #[arg(long)]
        job_id: i64,
        #[arg(long)]
        domain: String,
        /// Page URL to scan; repeat for several pages
        #[arg(long = "page")]
        pages: Vec<String>,
    },

    /// Select websites due for a rescan and publish their jobs
    Schedule {
        /// JSON file with the rescan candidates
        #[arg(long)]
        candidates: PathBuf,
        /// Total pages this run may scan
        #[arg(long)]
        budget: usize,
        #[arg(long, default_value_t = 1)]
        first_job_id: i64,
        /// Print the jobs instead of publishing them
        #[arg(long)]
        dry_run: bool,
    },
}
