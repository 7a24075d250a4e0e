//! Beacon Core - Foundation crate for the Beacon accessibility scan worker.
//!
//! This crate provides the scan result model, the queue message schemas,
//! error handling and configuration management that all other Beacon crates
//! depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based worker configuration with environment overrides
//! - [`model`] - Scan jobs and the Rule/Check/Element result tree
//! - [`messages`] - Wire shapes exchanged over the job and result queues
//!
//! # Example
//!
//! ```rust
//! use beacon_core::{ScanJob, WebpageResult, WebsiteResult};
//!
//! let job = ScanJob::new(7, "example.com", vec!["https://example.com/".to_string()]);
//! let page = WebpageResult::failed("https://example.com/", "timeout");
//! let result = WebsiteResult::success(&job, vec![page]);
//! assert_eq!(result.webpages.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod messages;
pub mod model;

// Re-export commonly used types
pub use config::{BrokerConfig, BrowserConfig, QueueConfig, ScanningConfig, WorkerConfig};
pub use error::{BeaconError, ConfigError, ConfigResult, Result};
pub use messages::{WebsiteResultMessage, NO_DOMAIN, NO_JOB_ID};
pub use model::{
    Check, CheckElement, CheckType, Element, Impact, Rule, ScanJob, ScanStatus, WcagLevel,
    WcagReferences, WebpageResult, WebsiteResult, MODEL_VERSION,
};
