//! Configuration management for the scan worker.
//!
//! Tunables live in an optional TOML file with XDG-compliant default path
//! and `BEACON_*` environment overrides. Broker credentials are read from the
//! environment only and are required: the worker refuses to start without
//! them.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the broker user name.
pub const ENV_BROKER_USER: &str = "BROKER_USER";
/// Environment variable holding the broker password.
pub const ENV_BROKER_PASSWORD: &str = "BROKER_PASSWORD";
/// Environment variable holding the broker host name.
pub const ENV_BROKER_HOSTNAME: &str = "BROKER_HOSTNAME";
/// Environment variable holding the broker port.
pub const ENV_BROKER_PORT: &str = "BROKER_PORT";

/// Memory reserved per concurrently scanned page when sizing the page pool.
const MEMORY_PER_PAGE_BYTES: u64 = 512 * 1024 * 1024;

/// Upper bound for the memory-derived page pool size.
const MAX_DEFAULT_PAGES: usize = 8;

/// Page pool size used when available memory cannot be determined.
const FALLBACK_PAGES: usize = 4;

/// Worker tunables.
///
/// Loaded from `~/.config/beacon/worker.toml` (or platform equivalent) unless
/// an explicit path is given. Missing sections fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Page scan retry and timeout policy
    pub scanning: ScanningConfig,
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Queue names and reconnect behaviour
    pub queue: QueueConfig,
}

impl WorkerConfig {
    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicit path must exist; the default path falls back to defaults
    /// when absent.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let (config_path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path()?, false),
        };

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&contents)?)
        } else if required {
            Err(ConfigError::InvalidValue {
                field: "config".to_string(),
                reason: format!("{} does not exist", config_path.display()),
            })
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `BEACON_RETRY_BUDGET`: Override the per-page retry budget
    /// - `BEACON_MAX_CONCURRENT_PAGES`: Override the page pool size
    /// - `BEACON_AXE_SCRIPT`: Override the audit engine script path
    /// - `BEACON_HEADLESS`: Override browser headless mode (true/false)
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::load(path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(budget) = lookup("BEACON_RETRY_BUDGET").and_then(|v| v.parse().ok()) {
            self.scanning.retry_budget = budget;
            tracing::debug!("Override scanning.retry_budget from env: {}", budget);
        }

        if let Some(pages) = lookup("BEACON_MAX_CONCURRENT_PAGES").and_then(|v| v.parse().ok()) {
            self.scanning.max_concurrent_pages = Some(pages);
            tracing::debug!("Override scanning.max_concurrent_pages from env: {}", pages);
        }

        if let Some(path) = lookup("BEACON_AXE_SCRIPT") {
            tracing::debug!("Override browser.axe_script_path from env: {}", path);
            self.browser.axe_script_path = PathBuf::from(path);
        }

        if let Some(headless) = lookup("BEACON_HEADLESS").and_then(|v| v.parse().ok()) {
            self.browser.headless = headless;
            tracing::debug!("Override browser.headless from env: {}", headless);
        }
    }

    /// Get the path to the default configuration file.
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("org", "beacon", "beacon").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("worker.toml"))
    }
}

/// Page scan retry and timeout policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Retries allowed per page after the first attempt
    pub retry_budget: u32,
    /// Initial navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,
    /// Navigation timeout added after each timed-out attempt
    pub timeout_increment_ms: u64,
    /// Wait after stopping a timed-out navigation
    pub settle_delay_ms: u64,
    /// Page pool size; derived from available memory when unset
    pub max_concurrent_pages: Option<usize>,
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            retry_budget: 2,
            navigation_timeout_ms: 10_000,
            timeout_increment_ms: 10_000,
            settle_delay_ms: 3_000,
            max_concurrent_pages: None,
        }
    }
}

impl ScanningConfig {
    /// Configured page pool size, or one sized to available memory.
    #[must_use]
    pub fn page_concurrency(&self) -> usize {
        self.max_concurrent_pages
            .unwrap_or_else(default_page_concurrency)
            .max(1)
    }
}

/// Page pool size derived from `MemAvailable` in `/proc/meminfo`.
#[must_use]
pub fn default_page_concurrency() -> usize {
    fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|meminfo| available_memory_bytes(&meminfo))
        .map_or(FALLBACK_PAGES, |bytes| {
            usize::try_from(bytes / MEMORY_PER_PAGE_BYTES)
                .unwrap_or(MAX_DEFAULT_PAGES)
                .clamp(1, MAX_DEFAULT_PAGES)
        })
}

fn available_memory_bytes(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemAvailable:"))
        .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse::<u64>().ok())
        .map(|kib| kib * 1024)
}

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Keep the Chromium sandbox enabled
    pub sandbox: bool,
    /// Chromium executable; auto-detected when unset
    pub executable: Option<PathBuf>,
    /// Path to the axe-core bundle injected into every page
    pub axe_script_path: PathBuf,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
            executable: None,
            axe_script_path: PathBuf::from("axe.min.js"),
            window_width: 1920,
            window_height: 1080,
        }
    }
}

/// Queue names and reconnect behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Subject scan jobs are consumed from
    pub job_subject: String,
    /// Subject website results are published to
    pub result_subject: String,
    /// Stream backing the job subject
    pub job_stream: String,
    /// Stream backing the result subject
    pub result_stream: String,
    /// Durable consumer name shared by all workers
    pub consumer: String,
    /// Delay before reconnecting after a transport failure
    pub reconnect_delay_ms: u64,
    /// How long a delivered job may go without an ack or heartbeat before
    /// redelivery
    pub ack_wait_secs: u64,
    /// How often a worker reports that a job is still being scanned
    pub progress_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            job_subject: "scan.jobs".to_string(),
            result_subject: "scan.results".to_string(),
            job_stream: "SCAN_JOBS".to_string(),
            result_stream: "SCAN_RESULTS".to_string(),
            consumer: "scan-worker".to_string(),
            reconnect_delay_ms: 3_000,
            ack_wait_secs: 120,
            progress_interval_secs: 30,
        }
    }
}

impl QueueConfig {
    /// Reconnect delay as a duration.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Acknowledgement deadline as a duration.
    #[must_use]
    pub fn ack_wait(&self) -> Duration {
        Duration::from_secs(self.ack_wait_secs)
    }

    /// Heartbeat period while a job is in progress, at least one second.
    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs.max(1))
    }
}

/// Message broker credentials and address.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Broker user
    pub user: String,
    /// Broker password
    pub password: String,
    /// Broker host name
    pub hostname: String,
    /// Broker port
    pub port: u16,
}

impl std::fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .finish()
    }
}

impl BrokerConfig {
    /// Read broker settings from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read broker settings through `lookup`; every variable is required.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let require = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingEnv { name })
        };

        let user = require(ENV_BROKER_USER)?;
        let password = require(ENV_BROKER_PASSWORD)?;
        let hostname = require(ENV_BROKER_HOSTNAME)?;
        let port = require(ENV_BROKER_PORT)?;
        let port = port.parse().map_err(|_| ConfigError::InvalidValue {
            field: ENV_BROKER_PORT.to_string(),
            reason: format!("'{port}' is not a valid port"),
        })?;

        Ok(Self {
            user,
            password,
            hostname,
            port,
        })
    }

    /// Server address in `host:port` form.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn broker_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (ENV_BROKER_USER, "scanner".to_string()),
            (ENV_BROKER_PASSWORD, "secret".to_string()),
            (ENV_BROKER_HOSTNAME, "broker.local".to_string()),
            (ENV_BROKER_PORT, "4222".to_string()),
        ])
    }

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.scanning.retry_budget, 2);
        assert_eq!(config.scanning.navigation_timeout_ms, 10_000);
        assert_eq!(config.scanning.timeout_increment_ms, 10_000);
        assert_eq!(config.scanning.settle_delay_ms, 3_000);
        assert_eq!(config.queue.reconnect_delay(), Duration::from_secs(3));
        assert!(config.queue.progress_interval() < config.queue.ack_wait());
        assert!(config.browser.headless);
        assert!(config.browser.sandbox);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[scanning]
retry_budget = 5

[queue]
job_subject = "jobs.a11y"
"#;

        let config: WorkerConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.scanning.retry_budget, 5);
        assert_eq!(config.queue.job_subject, "jobs.a11y");
        // These should be defaults
        assert_eq!(config.scanning.navigation_timeout_ms, 10_000);
        assert_eq!(config.queue.result_subject, "scan.results");
    }

    #[test]
    fn test_zero_progress_interval_is_clamped() {
        let config: WorkerConfig =
            toml::from_str("[queue]\nprogress_interval_secs = 0\n").expect("parse config");
        assert_eq!(config.queue.progress_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_explicit_path() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("worker.toml");
        fs::write(&path, "[scanning]\nmax_concurrent_pages = 2\n").expect("write config");

        let config = WorkerConfig::load(Some(&path)).expect("load config");
        assert_eq!(config.scanning.page_concurrency(), 2);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("absent.toml");
        assert!(matches!(
            WorkerConfig::load(Some(&path)),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([
            ("BEACON_RETRY_BUDGET", "4"),
            ("BEACON_HEADLESS", "false"),
            ("BEACON_AXE_SCRIPT", "/opt/axe/axe.min.js"),
        ]);
        let mut config = WorkerConfig::default();
        config.apply_env(|name| env.get(name).map(ToString::to_string));

        assert_eq!(config.scanning.retry_budget, 4);
        assert!(!config.browser.headless);
        assert_eq!(
            config.browser.axe_script_path,
            PathBuf::from("/opt/axe/axe.min.js")
        );
    }

    #[test]
    fn test_broker_config_from_lookup() {
        let env = broker_env();
        let broker =
            BrokerConfig::from_lookup(|name| env.get(name).cloned()).expect("broker config");
        assert_eq!(broker.address(), "broker.local:4222");
        assert!(!format!("{broker:?}").contains("secret"));
    }

    #[test]
    fn test_broker_config_missing_variable() {
        let mut env = broker_env();
        env.remove(ENV_BROKER_HOSTNAME);
        let err = BrokerConfig::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnv {
                name: ENV_BROKER_HOSTNAME
            }
        ));
    }

    #[test]
    fn test_broker_config_invalid_port() {
        let mut env = broker_env();
        env.insert(ENV_BROKER_PORT, "amqp".to_string());
        let err = BrokerConfig::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_available_memory_parsing() {
        let meminfo = "MemTotal:       16000000 kB\nMemAvailable:    2097152 kB\n";
        assert_eq!(available_memory_bytes(meminfo), Some(2_147_483_648));
        assert_eq!(available_memory_bytes("MemTotal: 1 kB"), None);
    }

    #[test]
    fn test_default_page_concurrency_is_bounded() {
        let pages = default_page_concurrency();
        assert!((1..=MAX_DEFAULT_PAGES).contains(&pages));
    }
}
