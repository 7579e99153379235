//! # Design
//!
//! - Provide structured, constant-message errors for the export pipeline.
//! - Capture operation context to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into messages.

use std::io;

use catalog_core::identity::PackageIdentity;
use thiserror::Error;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors produced while building an offline export archive.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Reading from the metadata store failed.
    #[error("export store operation failed")]
    Store {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Underlying store error.
        source: catalog_store::StoreError,
    },
    /// A selected update had no canonical XML recorded, which should not
    /// happen for anything the store accepted via `put`.
    #[error("export update missing canonical xml")]
    MissingXml {
        /// Identity of the update whose XML was missing.
        identity: PackageIdentity,
    },
    /// Writing the archive bytes failed.
    #[error("export archive io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Building the zip cabinet failed.
    #[error("export archive failure")]
    Zip {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use uuid::Uuid;

    #[test]
    fn missing_xml_carries_identity() {
        let identity = PackageIdentity::new(Uuid::from_u128(1), 3);
        let err = ExportError::MissingXml { identity };
        assert_eq!(err.to_string(), "export update missing canonical xml");
        assert!(matches!(err, ExportError::MissingXml { identity: got } if got == identity));
    }

    #[test]
    fn io_error_preserves_operation() {
        let err = ExportError::Io {
            operation: "write.metadata",
            source: io::Error::other("disk full"),
        };
        assert!(matches!(err, ExportError::Io { operation: "write.metadata", .. }));
    }
}
