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
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Service configuration (§6 "Config file (service)"): supported languages
//! and limits, loaded from a JSON file and shared by the client-sync API and
//! the offline export service.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod service;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::ServiceConfig;
pub use service::ConfigService;
