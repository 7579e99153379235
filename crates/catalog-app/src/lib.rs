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
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Catalog sync application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (service wiring: config, metadata store, content
//! store, client-sync host, API server), `error.rs` (application-level error
//! type).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level error type.
pub mod error;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
