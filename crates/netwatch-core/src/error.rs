//! Error types for netwatch configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building a [`WatchdogConfig`](crate::WatchdogConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration {0:?}: expected a number with an optional ms/s/m/h suffix")]
    InvalidDuration(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
