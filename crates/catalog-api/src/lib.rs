#![forbid(unsafe_code)]
#![allow(unexpected_cfgs)]

//! Downstream client-sync RPC surface and content HTTP endpoint (§6).
//!
//! Layout: `state.rs` (shared handles), `http/router.rs` (`ApiServer`
//! construction and serve loop), `http/clientsync.rs` (the five implemented
//! downstream RPCs plus the fault handler for everything else named in §6),
//! `http/content.rs` (the content-addressed download endpoint), `http/health.rs`
//! and `http/telemetry.rs` (ambient diagnostics), `http/errors.rs` (RFC9457
//! problem responses).

pub mod error;
pub mod http;
mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
