//! Error types for the package identity and catalog model.

use thiserror::Error;

/// Primary error type for package model operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A prerequisite referenced no identities at all.
    #[error("at-least-one prerequisite has no members")]
    EmptyAtLeastOne,
    /// A file carried no usable digest.
    #[error("file '{file_name}' has no recognized digest")]
    NoDigest {
        /// Name of the offending file.
        file_name: String,
    },
    /// An update variant was asked for a capability it does not carry.
    #[error("update does not support capability '{capability}'")]
    UnsupportedCapability {
        /// Capability that was requested.
        capability: &'static str,
    },
}

/// Convenience alias for package model results.
pub type CoreResult<T> = Result<T, CoreError>;
