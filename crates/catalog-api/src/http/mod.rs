//! HTTP surface: downstream client-sync RPCs and the content endpoint.

/// Client-sync RPC handlers (`GetConfig`, `GetCookie`, `SyncUpdates`, `GetExtendedUpdateInfo`).
pub mod clientsync;
/// Content-addressed file download endpoint.
pub mod content;
/// Problem response helpers and error types.
pub mod errors;
/// Health and diagnostics endpoints.
pub mod health;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
