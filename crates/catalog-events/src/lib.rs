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

//! Progress/event bus for the catalog sync engine.
//!
//! The bus provides a typed event enum, sequential identifiers, and support
//! for replaying recent events when subscribers reconnect (e.g. SSE clients
//! that supply `Last-Event-ID`). Internally it uses `tokio::broadcast` with a
//! bounded buffer; when the channel overflows, the oldest events are dropped,
//! matching the desired backpressure behaviour. This is the sync engine's
//! analogue of a progress-reporting channel: the fetch loop, the auth state
//! machine, and the client-sync host all publish to one shared bus.

pub mod error;
pub mod payloads;
pub mod routing;
pub mod topics;

pub use error::{EventBusError, EventBusResult};
pub use payloads::{DEFAULT_REPLAY_CAPACITY, EventEnvelope, EventId, SyncEvent};
pub use routing::{EventBus, EventStream};
pub use topics::event_kind;
