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

//! Metadata and content store contracts for the catalog sync engine.
//!
//! [`MetadataStore`] is the one component of the store layer that is in
//! scope here: put/get of update payloads, existence checks keyed on
//! `(id, revision)`, a full snapshot for index construction, and append-only
//! delta anchors. The derived indices described in the data model
//! (categories, supersedence, bundles, prerequisites, files, KB articles) are
//! not persisted by the store itself — they are a pure function of the
//! stored payloads (invariant 4) and are rebuilt on demand by
//! `catalog-graph` and `catalog-query` from a [`MetadataStore::snapshot`].
//!
//! [`ContentStore`] is a thin contract only: the actual byte transfer for
//! update content is out of scope (§1), but the content-addressed path
//! layout and completion-marker semantics it exposes (§6) are part of this
//! system and are implemented by [`filesystem::FilesystemContentStore`].

pub mod error;
pub mod filesystem;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use catalog_core::file::FileDigest;
use catalog_core::identity::PackageIdentity;
use catalog_core::update::Update;
use uuid::Uuid;

pub use error::{StoreError, StoreResult};
pub use filesystem::FilesystemContentStore;
pub use memory::InMemoryMetadataStore;
pub use postgres::PgMetadataStore;

/// Scope key an anchor is filed under: `("categories", None)` or
/// `("updates", Some(filter_hash))` per §3.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnchorScope {
    /// Top-level scope name (`"categories"` or `"updates"`).
    pub kind: String,
    /// Stable hash of the filter the anchor was requested under, if any.
    pub filter_hash: Option<String>,
}

impl AnchorScope {
    /// The single anchor scope for category/classification/detectoid sync.
    #[must_use]
    pub fn categories() -> Self {
        Self {
            kind: "categories".to_string(),
            filter_hash: None,
        }
    }

    /// The anchor scope for an update sync filtered by `filter_hash`.
    #[must_use]
    pub fn updates(filter_hash: impl Into<String>) -> Self {
        Self {
            kind: "updates".to_string(),
            filter_hash: Some(filter_hash.into()),
        }
    }

    /// Stable string key used as the storage row key.
    #[must_use]
    pub fn key(&self) -> String {
        match &self.filter_hash {
            Some(hash) => format!("{}:{hash}", self.kind),
            None => self.kind.clone(),
        }
    }
}

/// Indexed, content-addressable store for update payloads and sync anchors.
///
/// Implementations must uphold invariant 1 (at most one stored payload per
/// `(id, revision)`, `put` is idempotent) and invariant 5 (anchors are
/// append-only: a newer anchor replaces the older only on success; a failed
/// sync leaves the previous anchor intact — callers simply never call
/// [`Self::commit_anchor`] on failure).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert `update`, stored alongside its canonical XML stream.
    ///
    /// A duplicate `(id, revision)` is a no-op: idempotent re-insertion must
    /// never error, matching the "skip without an extra RPC" fetch-loop
    /// behavior when a revision is already present.
    async fn put(&self, update: &Update, xml: &str) -> StoreResult<()>;

    /// The latest stored revision for `id`, if any.
    async fn get_latest(&self, id: Uuid) -> StoreResult<Option<Update>>;

    /// The exact stored revision `identity`, if present.
    async fn get_revision(&self, identity: PackageIdentity) -> StoreResult<Option<Update>>;

    /// The raw canonical XML stream for `identity`, if present.
    async fn get_xml(&self, identity: PackageIdentity) -> StoreResult<Option<String>>;

    /// Whether `identity`'s exact `(id, revision)` is already stored.
    ///
    /// Used by the fetch loop to compute `to_fetch = ids \ existing` without
    /// an extra RPC round-trip.
    async fn contains(&self, identity: PackageIdentity) -> StoreResult<bool>;

    /// A full snapshot of the latest revision of every stored update.
    ///
    /// Callers build derived indices (categories, supersedence, bundles,
    /// prerequisites, driver metadata, KB articles) from this snapshot; a
    /// client-sync request takes this once and evaluates entirely against
    /// the resulting in-memory view, so it never observes a partial ingest
    /// (§5: "a request in progress must not observe a partial ingest").
    async fn snapshot(&self) -> StoreResult<Vec<Update>>;

    /// The anchor currently recorded for `scope`, if any.
    async fn get_anchor(&self, scope: &AnchorScope) -> StoreResult<Option<String>>;

    /// Record `anchor` as the new anchor for `scope`, replacing any prior
    /// value. Callers must only invoke this after every payload in the
    /// sync invocation it concludes has been durably written.
    async fn commit_anchor(&self, scope: &AnchorScope, anchor: &str) -> StoreResult<()>;
}

/// Contract for locating content bytes by digest; byte transfer itself is
/// out of scope (§1) — this only fixes the path layout and completion
/// marker semantics from §6 that the rest of the system depends on.
pub trait ContentStore: Send + Sync {
    /// Filesystem path content for `digest` would occupy, given `file_name`.
    ///
    /// Layout: `<root>/content/<last-byte-of-digest:hex>/<base64-digest with
    /// '/'->'_'>/<file_name>`.
    fn content_path(&self, digest: &FileDigest, file_name: &str) -> std::path::PathBuf;

    /// Whether a `.done` marker exists beside `digest`'s content path,
    /// indicating a verified content download.
    fn is_complete(&self, digest: &FileDigest, file_name: &str) -> bool;

    /// Path an update's canonical XML would occupy.
    ///
    /// Layout: `<root>/xml-data/<last-byte-of-id>/<id>-<rev>.xml`.
    fn xml_path(&self, identity: PackageIdentity) -> std::path::PathBuf;
}
