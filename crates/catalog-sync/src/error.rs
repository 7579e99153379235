//! Wire fault taxonomy and engine-level error types (§7).

use thiserror::Error;

/// Fault kinds reported by the upstream server, mapped to a fixed taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The access cookie was rejected; recoverable once by forced re-auth.
    InvalidAuthorizationCookie,
    /// The caller's protocol version is incompatible with the server's.
    IncompatibleProtocolVersion,
    /// An unspecified server-side failure occurred.
    InternalServerError,
    /// The request carried invalid parameters; almost always a client bug.
    InvalidParameters,
    /// The call did not complete before the deadline.
    Timeout,
    /// A fault code the taxonomy does not recognize.
    Unknown,
}

/// Errors raised by the upstream sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The upstream returned a mapped fault.
    #[error("upstream fault: {kind:?} ({detail})")]
    Fault {
        /// Mapped fault kind.
        kind: FaultKind,
        /// Raw detail string from the upstream, for logs.
        detail: String,
    },
    /// A batch exhausted its retry budget.
    #[error("batch exhausted retry budget after {attempts} attempts")]
    RetryBudgetExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },
    /// The decoder rejected a fetched payload.
    #[error("failed to decode update {identity}")]
    Decode {
        /// Identity of the offending update.
        identity: String,
        /// Underlying decode error.
        #[source]
        source: catalog_xml::error::XmlError,
    },
    /// The metadata store rejected an operation.
    #[error("store operation failed")]
    Store(#[source] catalog_store::StoreError),
    /// The caller requested a batch request larger than the server's cap.
    #[error("batch size {requested} exceeds server cap {cap}")]
    BatchTooLarge {
        /// Size the caller attempted to request.
        requested: usize,
        /// `MaxNumberOfUpdatesPerRequest` advertised by the server.
        cap: u32,
    },
    /// No authentication plugin was returned by `GetAuthConfig`.
    #[error("upstream returned no authentication plugins")]
    NoAuthPlugins,
    /// The sync invocation was cancelled before completion.
    #[error("sync invocation cancelled")]
    Cancelled,
}

impl From<catalog_store::StoreError> for SyncError {
    fn from(source: catalog_store::StoreError) -> Self {
        Self::Store(source)
    }
}

impl SyncError {
    /// Whether this error should trigger a single bounded retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Fault {
                kind: FaultKind::Timeout,
                ..
            }
        )
    }

    /// Whether this error should trigger a single forced re-authentication
    /// followed by one retry of the call that failed.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Self::Fault {
                kind: FaultKind::InvalidAuthorizationCookie,
                ..
            }
        )
    }
}

/// Result alias for the upstream sync engine.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeout_is_retryable() {
        let timeout = SyncError::Fault {
            kind: FaultKind::Timeout,
            detail: "x".into(),
        };
        let internal = SyncError::Fault {
            kind: FaultKind::InternalServerError,
            detail: "x".into(),
        };
        assert!(timeout.is_retryable());
        assert!(!internal.is_retryable());
    }

    #[test]
    fn only_invalid_auth_cookie_requires_reauth() {
        let invalid_cookie = SyncError::Fault {
            kind: FaultKind::InvalidAuthorizationCookie,
            detail: "x".into(),
        };
        let params = SyncError::Fault {
            kind: FaultKind::InvalidParameters,
            detail: "x".into(),
        };
        assert!(invalid_cookie.requires_reauth());
        assert!(!params.requires_reauth());
    }
}
