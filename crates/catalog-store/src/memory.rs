//! In-memory [`MetadataStore`] used by tests and by callers that don't need
//! durability (fixtures, the offline-export CLI path over an already-synced
//! snapshot, etc).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use catalog_core::identity::PackageIdentity;
use catalog_core::update::Update;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::{AnchorScope, MetadataStore};

#[derive(Default)]
struct Inner {
    /// Every stored revision, keyed by `(id, revision)`.
    revisions: HashMap<(Uuid, u32), (Update, String)>,
    /// Latest known revision number per id, for `get_latest`.
    latest: HashMap<Uuid, u32>,
    /// Anchor tokens, keyed by `AnchorScope::key`.
    anchors: HashMap<String, String>,
}

/// Thread-safe, process-local [`MetadataStore`].
///
/// A single `RwLock` guards all state: readers (snapshot, get, contains) take
/// a shared lock spanning their whole operation, writers (put, commit_anchor)
/// take an exclusive one, matching the readers-writer discipline in §5.
#[derive(Clone, Default)]
pub struct InMemoryMetadataStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryMetadataStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn put(&self, update: &Update, xml: &str) -> StoreResult<()> {
        let identity = update.identity();
        let mut guard = self.inner.write().await;
        guard
            .revisions
            .entry((identity.id, identity.revision))
            .or_insert_with(|| (update.clone(), xml.to_string()));
        let latest = guard.latest.entry(identity.id).or_insert(identity.revision);
        if identity.revision > *latest {
            *latest = identity.revision;
        }
        Ok(())
    }

    async fn get_latest(&self, id: Uuid) -> StoreResult<Option<Update>> {
        let guard = self.inner.read().await;
        let Some(revision) = guard.latest.get(&id).copied() else {
            return Ok(None);
        };
        Ok(guard.revisions.get(&(id, revision)).map(|(update, _)| update.clone()))
    }

    async fn get_revision(&self, identity: PackageIdentity) -> StoreResult<Option<Update>> {
        let guard = self.inner.read().await;
        Ok(guard
            .revisions
            .get(&(identity.id, identity.revision))
            .map(|(update, _)| update.clone()))
    }

    async fn get_xml(&self, identity: PackageIdentity) -> StoreResult<Option<String>> {
        let guard = self.inner.read().await;
        Ok(guard
            .revisions
            .get(&(identity.id, identity.revision))
            .map(|(_, xml)| xml.clone()))
    }

    async fn contains(&self, identity: PackageIdentity) -> StoreResult<bool> {
        let guard = self.inner.read().await;
        Ok(guard.revisions.contains_key(&(identity.id, identity.revision)))
    }

    async fn snapshot(&self) -> StoreResult<Vec<Update>> {
        let guard = self.inner.read().await;
        Ok(guard
            .latest
            .iter()
            .filter_map(|(id, revision)| guard.revisions.get(&(*id, *revision)))
            .map(|(update, _)| update.clone())
            .collect())
    }

    async fn get_anchor(&self, scope: &AnchorScope) -> StoreResult<Option<String>> {
        let guard = self.inner.read().await;
        Ok(guard.anchors.get(&scope.key()).cloned())
    }

    async fn commit_anchor(&self, scope: &AnchorScope, anchor: &str) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        guard.anchors.insert(scope.key(), anchor.to_string());
        Ok(())
    }
}
