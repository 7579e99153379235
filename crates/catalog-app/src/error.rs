//! # Design
//!
//! - Centralize application-level errors for bootstrap and orchestration.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Environment configuration was missing.
    #[error("missing environment configuration")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: catalog_config::ConfigError,
    },
    /// Metadata store operations failed.
    #[error("store operation failed")]
    Store {
        /// Operation identifier.
        operation: &'static str,
        /// Source store error.
        source: catalog_store::StoreError,
    },
    /// Postgres pool construction failed.
    #[error("database connection failed")]
    Database {
        /// Operation identifier.
        operation: &'static str,
        /// Source sqlx error.
        source: sqlx::Error,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: catalog_api::ApiServerError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: anyhow::Error,
    },
    /// Configuration values were invalid.
    #[error("invalid configuration")]
    InvalidConfig {
        /// Field name that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Optional value associated with the failure.
        value: Option<String>,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: catalog_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn store(operation: &'static str, source: catalog_store::StoreError) -> Self {
        Self::Store { operation, source }
    }

    pub(crate) const fn database(operation: &'static str, source: sqlx::Error) -> Self {
        Self::Database { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: catalog_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }

    pub(crate) fn telemetry(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Telemetry {
            operation,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "load",
            catalog_config::ConfigError::Invalid("bad languages".to_string()),
        );
        assert!(matches!(config, AppError::Config { .. }));

        let api = AppError::api_server(
            "serve",
            catalog_api::ApiServerError::Serve {
                source: io::Error::other("io"),
            },
        );
        assert!(matches!(api, AppError::ApiServer { .. }));
    }
}
