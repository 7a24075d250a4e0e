//! Beacon Scanner - Website accessibility scan pipeline.
//!
//! This crate turns a scan job into a website result. It coordinates the
//! browser session, scans every page with retry and timeout escalation, and
//! aggregates raw audit findings into normalized rule statistics.
//!
//! # Features
//!
//! - Concurrent page scans within a job with a bounded page pool
//! - Per-page retry budget with escalating navigation timeouts
//! - One-time recovery from navigations interrupted by client-side redirects
//! - Partial-page audits when a navigation times out
//! - Failures reported as failed results rather than errors
//!
//! # Example
//!
//! ```rust,ignore
//! use beacon_scanner::{ScanOrchestrator, ScanPolicy};
//! use std::sync::Arc;
//!
//! let orchestrator = ScanOrchestrator::new(Arc::new(browser_engine), ScanPolicy::default())
//!     .with_max_concurrent_pages(4);
//!
//! let result = orchestrator.scan_website(&job).await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod aggregator;
#[allow(missing_docs)]
pub mod error;
pub mod failure;
pub mod orchestrator;
#[allow(missing_docs)]
pub mod page;
pub mod wcag;

// Re-export commonly used types
pub use aggregator::{
    format_failed_webpage_result, format_failed_website_result, format_webpage_result,
    format_website_result, ResultBuilder,
};
pub use error::{Result, ScanError};
pub use failure::{normalize_error_message, FailureCause, UNKNOWN_ERROR_MESSAGE};
pub use orchestrator::ScanOrchestrator;
pub use page::{PageScanner, RetryDecision, ScanPolicy, ScanRequest};
