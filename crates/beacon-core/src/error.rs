//! Core error types for the Beacon scan worker.
//!
//! This module defines the central error type used across all subsystems.
//! Each subsystem error is represented as a variant for clear error propagation.

use thiserror::Error;

/// Central error type for Beacon operations.
#[derive(Error, Debug)]
pub enum BeaconError {
    /// Configuration errors (file loading, parsing, missing environment)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Message encoding or decoding errors
    #[error("message error: {0}")]
    Message(#[from] serde_json::Error),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// A required environment variable is not set
    #[error("required environment variable {name} is not set")]
    MissingEnv {
        /// Variable name
        name: &'static str,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// I/O error reading config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `BeaconError`.
pub type Result<T> = std::result::Result<T, BeaconError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
