//! Errors raised while loading or validating service configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by [`crate::loader`] and [`crate::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}")]
    Io {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The config file's contents were not valid JSON for [`crate::model::ServiceConfig`].
    #[error("failed to parse config file {path}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
    /// The config parsed but failed a semantic validation rule.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result alias for configuration loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;
