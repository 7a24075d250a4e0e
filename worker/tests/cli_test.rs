//! Command-line parsing and rescan planning tests.

use beacon_worker::cli::{Cli, Commands};
use beacon_worker::commands::schedule::{load_candidates, plan};
use chrono::{TimeZone, Utc};
use clap::Parser;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_run_is_default() {
    let cli = Cli::try_parse_from(["beacon-worker"]).unwrap();
    assert!(cli.command.is_none());
    assert!(cli.config.is_none());
}

#[test]
fn test_enqueue_collects_pages() {
    let cli = Cli::try_parse_from([
        "beacon-worker",
        "enqueue",
        "--job-id",
        "12",
        "--domain",
        "example.com",
        "--page",
        "https://example.com/",
        "--page",
        "https://example.com/about",
        "--config",
        "/etc/beacon/worker.toml",
    ])
    .unwrap();

    assert_eq!(
        cli.config.as_deref(),
        Some(std::path::Path::new("/etc/beacon/worker.toml"))
    );
    match cli.command {
        Some(Commands::Enqueue {
            job_id,
            domain,
            pages,
        }) => {
            assert_eq!(job_id, 12);
            assert_eq!(domain, "example.com");
            assert_eq!(pages.len(), 2);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_schedule_requires_budget() {
    assert!(Cli::try_parse_from(["beacon-worker", "schedule", "--candidates", "c.json"]).is_err());

    let cli = Cli::try_parse_from([
        "beacon-worker",
        "schedule",
        "--candidates",
        "c.json",
        "--budget",
        "500",
        "--dry-run",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Schedule {
            budget: 500,
            first_job_id: 1,
            dry_run: true,
            ..
        })
    ));
}

#[test]
fn test_plan_from_candidate_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{"websiteId": 1, "ownerId": 1, "domain": "a.example", "webpages": ["https://a.example/", "https://a.example/b"], "lastScannedAt": "2026-01-10T08:00:00Z"}},
            {{"websiteId": 2, "ownerId": 2, "domain": "b.example", "webpages": ["https://b.example/"]}},
            {{"websiteId": 3, "ownerId": 2, "domain": "c.example", "webpages": ["https://c.example/"], "lastScannedAt": "2026-02-03T08:00:00Z"}}
        ]"#
    )
    .unwrap();

    let candidates = load_candidates(file.path()).unwrap();
    assert_eq!(candidates.len(), 3);

    let now = Utc.with_ymd_and_hms(2026, 2, 20, 0, 0, 0).unwrap();
    let jobs = plan(&candidates, 10, 40, now);

    let domains: Vec<&str> = jobs.iter().map(|j| j.domain.as_str()).collect();
    assert_eq!(domains, vec!["a.example", "b.example"]);
    assert_eq!(jobs[0].job_id, 40);
    assert_eq!(jobs[1].job_id, 41);
}

#[test]
fn test_invalid_candidate_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();
    assert!(load_candidates(file.path()).is_err());
}
