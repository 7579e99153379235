//! Errors raised by the client-sync host.

use thiserror::Error;

/// Errors surfaced to a downstream `SyncUpdates`/`GetExtendedUpdateInfo` caller.
#[derive(Debug, Error)]
pub enum ClientSyncError {
    /// The supplied session cookie is unknown or expired.
    #[error("session cookie not found or expired")]
    UnknownSession,
    /// A requested revision index was never assigned in this session.
    #[error("revision index {index} was not assigned in this session")]
    UnknownRevisionIndex {
        /// The unrecognized index.
        index: u32,
    },
    /// The metadata store rejected an operation.
    #[error("store operation failed")]
    Store(#[source] catalog_store::StoreError),
    /// The stored XML for an offered update failed to fragment.
    #[error("failed to build XML fragment")]
    Fragment(#[source] catalog_xml::XmlError),
}

impl From<catalog_store::StoreError> for ClientSyncError {
    fn from(source: catalog_store::StoreError) -> Self {
        Self::Store(source)
    }
}

impl From<catalog_xml::XmlError> for ClientSyncError {
    fn from(source: catalog_xml::XmlError) -> Self {
        Self::Fragment(source)
    }
}

/// Result alias for the client-sync host.
pub type ClientSyncResult<T> = Result<T, ClientSyncError>;
