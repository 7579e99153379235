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

//! Binary entrypoint that wires the catalog sync services together and
//! launches the API listener.

mod bootstrap;
mod error;

use anyhow::Result;

/// Bootstraps the catalog sync application and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::run_app().await.map_err(anyhow::Error::from)
}
