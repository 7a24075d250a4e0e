use beacon_browser::BrowserError;
use beacon_core::BeaconError;
use thiserror::Error;

/// Failures that end a website scan before its pages are scanned.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid scan job: {0}")]
    InvalidJob(#[from] BeaconError),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),
}

pub type Result<T> = std::result::Result<T, ScanError>;
