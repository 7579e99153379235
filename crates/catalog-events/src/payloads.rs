//! Event payload types carried across the sync engine and its consumers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use catalog_core::identity::PackageIdentity;

/// Identifier assigned to each event emitted by the platform.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Progress events emitted by the upstream sync engine and client-sync host.
///
/// These are the single-producer-per-operation signal described for the
/// fetch loop: subscribers (an SSE endpoint, a CLI-equivalent progress bar)
/// must not block the producer, so publication never waits on delivery.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// The authentication state machine obtained or refreshed an access cookie.
    AuthRefreshed {
        /// Expiry hint reported by the upstream for the new access cookie.
        expires_at: DateTime<Utc>,
    },
    /// `GetConfigData` returned (or re-confirmed) the server's config blob.
    ConfigRefreshed {
        /// Per-request update cap reported by the upstream.
        max_number_of_updates_per_request: u32,
    },
    /// A `GetRevisionIdList` call returned the set of identities to fetch.
    RevisionsListed {
        /// Filter scope the anchor was requested for (e.g. `"categories"`).
        scope: String,
        /// Number of revisions returned that are not already in the store.
        to_fetch: usize,
    },
    /// A single `GetUpdateData` batch completed (after any retries).
    BatchFetched {
        /// Number of identities requested in this batch.
        requested: usize,
        /// Number of payloads actually returned.
        fetched: usize,
        /// Number of `Timeout` retries consumed before this batch succeeded.
        retries: u32,
    },
    /// An update payload was decoded and inserted into the store.
    Decoded {
        /// Identity of the inserted update.
        identity: PackageIdentity,
        /// Update-type tag (`detectoid`, `classification`, `product`,
        /// `software_update`, `driver_update`).
        update_type: &'static str,
    },
    /// The sync invocation's final anchor was committed for a filter scope.
    AnchorCommitted {
        /// Filter scope the anchor belongs to.
        scope: String,
        /// New opaque anchor token.
        anchor: String,
    },
    /// The sync invocation failed and no anchor was committed.
    Failed {
        /// Stage at which the failure occurred (`auth`, `config`, `list`,
        /// `fetch`, `decode`).
        stage: String,
        /// Human-readable failure detail.
        message: String,
    },
    /// A client-sync request produced an offering batch.
    ClientOffered {
        /// Device/computer identifier the offer was computed for.
        device_id: Uuid,
        /// Number of update records offered.
        offered: usize,
        /// Whether the response was truncated at the layer cap.
        truncated: bool,
    },
}

impl SyncEvent {
    /// Machine-friendly discriminator for SSE consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AuthRefreshed { .. } => "auth_refreshed",
            Self::ConfigRefreshed { .. } => "config_refreshed",
            Self::RevisionsListed { .. } => "revisions_listed",
            Self::BatchFetched { .. } => "batch_fetched",
            Self::Decoded { .. } => "decoded",
            Self::AnchorCommitted { .. } => "anchor_committed",
            Self::Failed { .. } => "failed",
            Self::ClientOffered { .. } => "client_offered",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: SyncEvent,
}
