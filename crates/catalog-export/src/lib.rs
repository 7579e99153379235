#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::multiple_crate_versions)]

//! Offline legacy import export: bundle closure, `metadata.txt` +
//! `package.xml`, packed into a zip cabinet (§4.6).
//! Layout: `model/` (request types), `error.rs` (error types), `service.rs`
//! (closure selection, rendering, packing).

pub mod error;
pub mod model;
pub mod service;

pub use error::{ExportError, ExportResult};
pub use model::ExportRequest;
pub use service::ExportService;
