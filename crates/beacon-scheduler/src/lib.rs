pub mod jobs;
pub mod scheduler;

pub use jobs::RescanCandidate;
pub use scheduler::{allocate_fair_share, build_scan_jobs, is_rescan_due};
