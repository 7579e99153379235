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
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Upstream server-to-server sync engine (§4.1, §5).
//!
//! Wires together the authentication state machine ([`auth::AuthManager`]),
//! the RPC boundary to the upstream ([`client::UpstreamClient`]), and the
//! fetch loop ([`engine::SyncEngine`]) that turns an anchored revision
//! listing into durable [`catalog_store::MetadataStore`] entries.

pub mod auth;
pub mod client;
pub mod engine;
pub mod error;
pub mod types;

pub use auth::AuthManager;
pub use client::UpstreamClient;
pub use engine::{SyncEngine, SyncSummary};
pub use error::{FaultKind, SyncError, SyncResult};
pub use types::{
    AccessCookie, AuthConfig, AuthPlugin, AuthorizationCookie, CallerIdentity, ConfigData, RevisionFilter,
    RevisionIdList, UpdatePayload, COOKIE_EXCHANGE_PROTOCOL_VERSION, DEFAULT_PROTOCOL_VERSION,
};
