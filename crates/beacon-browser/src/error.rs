use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

/// Browser failures, classified once at the automation boundary.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("failed to open browsing context: {0}")]
    Context(String),

    #[error("navigation to {url} timed out after {timeout_ms} ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    /// The execution context was destroyed while the page was loading,
    /// typically by a client-side redirect racing the audit.
    #[error("navigation to {url} was interrupted by a same-document transition")]
    NavigationInterrupted { url: String },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("audit failed: {0}")]
    Audit(String),

    #[error("failed to load audit script {path}: {reason}")]
    ScriptLoad { path: String, reason: String },

    #[error("chromium error: {0}")]
    Chromium(String),
}

impl BrowserError {
    /// Check if the failure was a navigation timeout.
    #[must_use]
    pub fn is_navigation_timeout(&self) -> bool {
        matches!(self, Self::NavigationTimeout { .. })
    }

    /// Check if the failure was a navigation interrupted mid-flight.
    #[must_use]
    pub fn is_navigation_interrupted(&self) -> bool {
        matches!(self, Self::NavigationInterrupted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::NavigationTimeout {
            url: "https://example.com/".to_string(),
            timeout_ms: 10_000,
        };
        assert_eq!(
            err.to_string(),
            "navigation to https://example.com/ timed out after 10000 ms"
        );
    }

    #[test]
    fn test_classification_helpers() {
        let interrupted = BrowserError::NavigationInterrupted {
            url: "https://example.com/".to_string(),
        };
        assert!(interrupted.is_navigation_interrupted());
        assert!(!interrupted.is_navigation_timeout());
        assert!(!BrowserError::Audit("x".to_string()).is_navigation_timeout());
    }
}
