/// Realistic desktop Chrome user agent presented to every audited site.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Browser identity applied to each isolated page.
///
/// Audits must be reproducible, so the identity is fixed rather than
/// randomized per page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl FingerprintConfig {
    /// The desktop profile used for all scans.
    #[must_use]
    pub fn desktop() -> Self {
        Self {
            user_agent: DESKTOP_USER_AGENT.to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }

    /// The desktop profile with a configured window size.
    #[must_use]
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self::desktop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_fingerprint_is_stable() {
        let first = FingerprintConfig::desktop();
        let second = FingerprintConfig::desktop();
        assert_eq!(first, second);
        assert!(first.user_agent.contains("Chrome/"));
    }

    #[test]
    fn test_with_viewport() {
        let config = FingerprintConfig::desktop().with_viewport(1366, 768);
        assert_eq!(config.viewport_width, 1366);
        assert_eq!(config.viewport_height, 768);
        assert_eq!(config.user_agent, DESKTOP_USER_AGENT);
    }
}
