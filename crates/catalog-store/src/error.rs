//! Error types for the metadata and content store layer.

use thiserror::Error;

/// Errors raised by a [`crate::MetadataStore`] or [`crate::ContentStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Migration execution failed.
    #[error("migration failed")]
    Migration(#[source] sqlx::migrate::MigrateError),
    /// A database operation failed.
    #[error("database operation failed: {operation}")]
    Query {
        /// Operation identifier, for log correlation.
        operation: &'static str,
        /// Underlying SQL error.
        #[source]
        source: sqlx::Error,
    },
    /// A stored payload could not be deserialized back into an `Update`.
    #[error("stored payload for {identity} is corrupt")]
    Corrupt {
        /// Identity whose payload failed to decode.
        identity: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// A filesystem write to the XML or content layout failed.
    #[error("filesystem operation failed: {operation}")]
    Io {
        /// Operation identifier, for log correlation.
        operation: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A digest did not have a recognized length (20 bytes for SHA-1, 32 for SHA-256).
    #[error("digest has unrecognized length {len} bytes")]
    MalformedDigest {
        /// Observed digest length in bytes.
        len: usize,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(source: sqlx::Error) -> Self {
        Self::Query {
            operation: "sqlx operation",
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn query_error_displays_operation_and_keeps_source() {
        let err = StoreError::Query {
            operation: "get_latest",
            source: sqlx::Error::RowNotFound,
        };
        assert_eq!(err.to_string(), "database operation failed: get_latest");
        assert!(err.source().is_some());
    }

    #[test]
    fn malformed_digest_reports_length() {
        let err = StoreError::MalformedDigest { len: 16 };
        assert_eq!(err.to_string(), "digest has unrecognized length 16 bytes");
    }

    #[test]
    fn from_sqlx_error_wraps_as_query() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Query { operation: "sqlx operation", .. }));
    }
}
