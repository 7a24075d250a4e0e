//! Rescan scheduling: which websites are due, and which fit this run.

use crate::jobs::RescanCandidate;
use beacon_core::ScanJob;
use chrono::{DateTime, Datelike, Utc};
use std::collections::{BTreeMap, VecDeque};

/// Returns true if a site last scanned at `last_scanned_at` should be scanned
/// again at `now`: never scanned, or last scanned in an earlier month.
pub fn is_rescan_due(last_scanned_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_scanned_at {
        None => true,
        Some(last) => (last.year(), last.month()) < (now.year(), now.month()),
    }
}

/// Select due candidates within `page_budget`, sharing it fairly between owners.
///
/// Owners take turns in id order, each offering its least recently scanned
/// site. A site that does not fit the remaining budget is skipped and the
/// owner's turn passes.
pub fn allocate_fair_share(
    candidates: &[RescanCandidate],
    page_budget: usize,
    now: DateTime<Utc>,
) -> Vec<RescanCandidate> {
    let mut by_owner: BTreeMap<i64, Vec<&RescanCandidate>> = BTreeMap::new();
    for candidate in candidates
        .iter()
        .filter(|c| is_rescan_due(c.last_scanned_at, now))
    {
        by_owner.entry(candidate.owner_id).or_default().push(candidate);
    }

    let mut queues: Vec<VecDeque<&RescanCandidate>> = by_owner
        .into_values()
        .map(|mut sites| {
            sites.sort_by_key(|c| (c.last_scanned_at, c.website_id));
            VecDeque::from(sites)
        })
        .collect();

    let mut remaining = page_budget;
    let mut selected = Vec::new();

    while queues.iter().any(|q| !q.is_empty()) {
        for queue in &mut queues {
            let Some(site) = queue.pop_front() else {
                continue;
            };
            if site.page_count() <= remaining {
                remaining -= site.page_count();
                selected.push(site.clone());
            } else {
                tracing::debug!(
                    "Skipping {} ({} pages, {} left in budget)",
                    site.domain,
                    site.page_count(),
                    remaining
                );
            }
        }
    }

    tracing::info!(
        "Selected {} of {} candidates, {} of {} pages used",
        selected.len(),
        candidates.len(),
        page_budget - remaining,
        page_budget
    );
    selected
}

/// Build one scan job per selected site, numbered from `first_job_id`.
pub fn build_scan_jobs(
    selected: &[RescanCandidate],
    first_job_id: i64,
    model_version: &str,
    now: DateTime<Utc>,
) -> Vec<ScanJob> {
    (first_job_id..)
        .zip(selected)
        .map(|(job_id, site)| ScanJob {
            job_id,
            model_version: model_version.to_string(),
            job_timestamp: now,
            domain: site.domain.clone(),
            webpages: site.webpages.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn site(
        website_id: i64,
        owner_id: i64,
        pages: usize,
        last: Option<DateTime<Utc>>,
    ) -> RescanCandidate {
        RescanCandidate {
            website_id,
            owner_id,
            domain: format!("site{website_id}.example"),
            webpages: (0..pages)
                .map(|i| format!("https://site{website_id}.example/{i}"))
                .collect(),
            last_scanned_at: last,
        }
    }

    fn ids(selected: &[RescanCandidate]) -> Vec<i64> {
        selected.iter().map(|c| c.website_id).collect()
    }

    #[test]
    fn test_rescan_due() {
        let now = at(2026, 3, 2);
        assert!(is_rescan_due(None, now));
        assert!(is_rescan_due(Some(at(2026, 2, 28)), now));
        assert!(is_rescan_due(Some(at(2025, 3, 15)), now));
        assert!(!is_rescan_due(Some(at(2026, 3, 1)), now));
    }

    #[test]
    fn test_owners_share_budget() {
        let now = at(2026, 3, 2);
        let candidates = vec![
            site(1, 10, 3, Some(at(2026, 1, 5))),
            site(2, 10, 3, Some(at(2026, 1, 6))),
            site(3, 10, 3, Some(at(2026, 1, 7))),
            site(4, 20, 3, Some(at(2026, 2, 1))),
        ];

        let selected = allocate_fair_share(&candidates, 6, now);
        assert_eq!(ids(&selected), vec![1, 4]);
    }

    #[test]
    fn test_never_scanned_first_and_not_due_skipped() {
        let now = at(2026, 3, 2);
        let candidates = vec![
            site(1, 10, 1, Some(at(2026, 2, 1))),
            site(2, 10, 1, None),
            site(3, 10, 1, Some(at(2026, 3, 1))),
        ];

        let selected = allocate_fair_share(&candidates, 10, now);
        assert_eq!(ids(&selected), vec![2, 1]);
    }

    #[test]
    fn test_oversized_site_passes_turn() {
        let now = at(2026, 3, 2);
        let candidates = vec![
            site(1, 10, 50, None),
            site(2, 10, 2, Some(at(2026, 1, 1))),
            site(3, 20, 2, None),
        ];

        let selected = allocate_fair_share(&candidates, 5, now);
        assert_eq!(ids(&selected), vec![3, 2]);
    }

    #[test]
    fn test_zero_budget_selects_nothing() {
        let now = at(2026, 3, 2);
        let candidates = vec![site(1, 10, 1, None)];
        assert!(allocate_fair_share(&candidates, 0, now).is_empty());
    }

    #[test]
    fn test_build_scan_jobs_numbers_consecutively() {
        let now = at(2026, 3, 2);
        let selected = vec![site(1, 10, 2, None), site(2, 20, 1, None)];

        let jobs = build_scan_jobs(&selected, 100, "1.0", now);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_id, 100);
        assert_eq!(jobs[1].job_id, 101);
        assert_eq!(jobs[0].domain, "site1.example");
        assert_eq!(jobs[0].webpages.len(), 2);
        assert_eq!(jobs[1].job_timestamp, now);
        assert_eq!(jobs[1].model_version, "1.0");
    }

    #[test]
    fn test_candidate_json() {
        let json = r#"{"websiteId":1,"ownerId":2,"domain":"a.example","webpages":["https://a.example/"]}"#;
        let candidate: RescanCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.owner_id, 2);
        assert!(candidate.last_scanned_at.is_none());
    }
}
