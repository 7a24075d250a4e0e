//! Headless browser automation and the accessibility audit adapter.
//!
//! Provides one Chromium process per scan job, isolated browsing contexts
//! per page, and the axe-core adapter that turns a loaded page into raw
//! audit findings.

pub mod actions;
pub mod audit;
pub mod engine;
pub mod error;
pub mod fingerprint;

pub use actions::{
    parse_page_url, AuditPage, BrowserLauncher, BrowserSession, NavigationOptions, PageOptions,
};
pub use audit::{AxeScript, RawAuditOutput, RawCheck, RawNode, RawRelatedNode, RawRuleResult};
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
