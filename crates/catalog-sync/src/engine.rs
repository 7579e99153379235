//! The upstream fetch loop (§4.1, §5).
//!
//! ```text
//! refresh_auth_if_needed()
//! refresh_config_if_missing()
//! (ids, anchor) = GetRevisionIdList(filter + previous_anchor)
//! to_fetch = ids \ existing_identities(store)
//! for batch in chunks(to_fetch, MaxNumberOfUpdatesPerRequest):
//!     payload = retry(GetUpdateData(batch), up_to=3, on=Timeout)
//!     decode_and_insert(payload)
//! persist_anchor(filter, anchor)
//! ```
//!
//! Batches run concurrently, bounded by [`SyncEngine::max_fan_out`] (default
//! 8, never exceeding the server's own per-request cap). The final anchor is
//! committed only once every batch has been durably written; a batch
//! failure leaves the prior anchor untouched (§5's ordering guarantee).

use std::sync::Arc;

use catalog_core::identity::PackageIdentity;
use catalog_events::{EventBus, SyncEvent};
use catalog_store::{AnchorScope, MetadataStore};
use tokio::sync::{Mutex, Semaphore};

use crate::auth::AuthManager;
use crate::client::UpstreamClient;
use crate::error::{SyncError, SyncResult};
use crate::types::{AccessCookie, CallerIdentity, ConfigData, RevisionFilter, UpdatePayload};

/// Retry budget for a single batch: up to 3 attempts, retried only on a
/// `Timeout`-class fault (§5, §7, §8 "Retry bound").
const MAX_ATTEMPTS: u32 = 3;
/// Upper bound on concurrently in-flight `GetUpdateData` batches, used when
/// the server's own cap is larger or unknown (§5, §9 "Parallelism cap").
const DEFAULT_MAX_FAN_OUT: usize = 8;

/// Drives one upstream sync invocation: auth, config, anchored revision
/// listing, bounded-concurrency batched fetch with retry, decode/insert,
/// and anchor commit.
pub struct SyncEngine<C: UpstreamClient> {
    client: Arc<C>,
    store: Arc<dyn MetadataStore>,
    events: Option<EventBus>,
    auth: Arc<Mutex<AuthManager>>,
    config: Option<ConfigData>,
    max_fan_out: usize,
}

/// Summary of one completed sync invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncSummary {
    /// Identities the filter matched that were not already stored.
    pub to_fetch: usize,
    /// Identities actually decoded and inserted.
    pub inserted: usize,
}

impl<C: UpstreamClient + 'static> SyncEngine<C> {
    /// Construct an engine for `client`, backed by `store`, authenticating
    /// as `caller`.
    #[must_use]
    pub fn new(client: C, store: Arc<dyn MetadataStore>, caller: CallerIdentity) -> Self {
        Self {
            client: Arc::new(client),
            store,
            events: None,
            auth: Arc::new(Mutex::new(AuthManager::new(caller))),
            config: None,
            max_fan_out: DEFAULT_MAX_FAN_OUT,
        }
    }

    /// Attach an event bus; the engine publishes progress on it if set.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Override the batch fan-out cap (still clamped to the server's
    /// advertised `MaxNumberOfUpdatesPerRequest` once known).
    #[must_use]
    pub const fn with_max_fan_out(mut self, max_fan_out: usize) -> Self {
        self.max_fan_out = max_fan_out;
        self
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(events) = &self.events {
            let _ = events.publish(event);
        }
    }

    async fn refresh_config_if_missing(&mut self, access: &AccessCookie) -> SyncResult<ConfigData> {
        if let Some(config) = self.config {
            return Ok(config);
        }
        let config = self.client.get_config_data(access).await?;
        self.config = Some(config);
        self.emit(SyncEvent::ConfigRefreshed {
            max_number_of_updates_per_request: config.max_number_of_updates_per_request,
        });
        Ok(config)
    }

    /// Run one sync invocation for `scope`/`filter`, using the anchor
    /// currently recorded for `scope` (if any) as the previous anchor. On
    /// success the new anchor is committed for `scope`; on any batch failure
    /// the prior anchor (if any) is left untouched and the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication, config retrieval, revision
    /// listing, or any batch's retry budget fails.
    pub async fn sync(&mut self, scope: AnchorScope, mut filter: RevisionFilter) -> SyncResult<SyncSummary> {
        filter.anchor = self.store.get_anchor(&scope).await?;

        let access = self.auth.lock().await.ensure_valid(self.client.as_ref()).await?;
        self.emit(SyncEvent::AuthRefreshed {
            expires_at: access.expires_at,
        });
        let config = self.refresh_config_if_missing(&access).await?;

        let listing = self.client.get_revision_id_list(&access, &filter).await?;
        self.emit(SyncEvent::RevisionsListed {
            scope: scope.key(),
            to_fetch: listing.identities.len(),
        });

        let mut to_fetch = Vec::with_capacity(listing.identities.len());
        for identity in &listing.identities {
            if !self.store.contains(*identity).await? {
                to_fetch.push(*identity);
            }
        }

        let cap = config.max_number_of_updates_per_request.max(1) as usize;
        let batch_size = cap.min(self.max_fan_out.max(1));
        let batches: Vec<Vec<PackageIdentity>> = to_fetch.chunks(batch_size).map(<[_]>::to_vec).collect();

        let semaphore = Arc::new(Semaphore::new(self.max_fan_out.max(1)));
        let mut handles = Vec::with_capacity(batches.len());
        for batch in batches {
            let requested = batch.len();
            let client = Arc::clone(&self.client);
            let auth = Arc::clone(&self.auth);
            let access = access.clone();
            let permit = Arc::clone(&semaphore);
            handles.push((
                requested,
                tokio::spawn(fetch_batch_with_retry(client, auth, access, batch, permit)),
            ));
        }

        let mut inserted = 0usize;
        for (requested, handle) in handles {
            let (payloads, attempts) = handle.await.map_err(|_| SyncError::Cancelled)??;
            self.emit(SyncEvent::BatchFetched {
                requested,
                fetched: payloads.len(),
                retries: attempts.saturating_sub(1),
            });
            for payload in &payloads {
                self.decode_and_insert(payload).await?;
                inserted += 1;
            }
        }

        self.store.commit_anchor(&scope, &listing.anchor).await?;
        self.emit(SyncEvent::AnchorCommitted {
            scope: scope.key(),
            anchor: listing.anchor.clone(),
        });

        Ok(SyncSummary {
            to_fetch: to_fetch.len(),
            inserted,
        })
    }

    async fn decode_and_insert(&self, payload: &UpdatePayload) -> SyncResult<()> {
        let update = catalog_xml::decode_update(&payload.xml).map_err(|source| SyncError::Decode {
            identity: payload.identity.to_string(),
            source,
        })?;
        self.store.put(&update, &payload.xml).await?;
        self.emit(SyncEvent::Decoded {
            identity: update.identity(),
            update_type: update_type_tag(&update),
        });
        Ok(())
    }
}

async fn fetch_batch_with_retry<C: UpstreamClient>(
    client: Arc<C>,
    auth: Arc<Mutex<AuthManager>>,
    mut access: AccessCookie,
    batch: Vec<PackageIdentity>,
    permit: Arc<Semaphore>,
) -> SyncResult<(Vec<UpdatePayload>, u32)> {
    let _permit = permit.acquire_owned().await.map_err(|_| SyncError::Cancelled)?;
    let mut attempt = 0;
    let mut reauthed = false;
    loop {
        match client.get_update_data(&access, &batch).await {
            Ok(payloads) => return Ok((payloads, attempt + 1)),
            // InvalidAuthorizationCookie mid-fetch-loop: one forced full
            // re-auth, then one retry of this same batch (§4.1, §5). This
            // doesn't consume the timeout retry budget below.
            Err(err) if err.requires_reauth() && !reauthed => {
                reauthed = true;
                access = auth.lock().await.force_reauth(client.as_ref()).await?;
            }
            Err(err) if err.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                attempt += 1;
            }
            Err(err) if err.is_retryable() => {
                return Err(SyncError::RetryBudgetExhausted { attempts: attempt + 1 });
            }
            Err(err) => return Err(err),
        }
    }
}

const fn update_type_tag(update: &catalog_core::update::Update) -> &'static str {
    use catalog_core::update::Update;
    match update {
        Update::Detectoid { .. } => "detectoid",
        Update::Classification { .. } => "classification",
        Update::Product { .. } => "product",
        Update::SoftwareUpdate { .. } => "software_update",
        Update::DriverUpdate { .. } => "driver_update",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockUpstream;
    use catalog_store::InMemoryMetadataStore;
    use catalog_xml::decode_update;
    use uuid::Uuid;

    fn sample_xml(id: Uuid, rev: u32) -> String {
        format!(
            r#"<Update><UpdateIdentity UpdateID="{id}" RevisionNumber="{rev}" />
                <Properties UpdateType="Detectoid" />
            </Update>"#
        )
    }

    #[tokio::test]
    async fn fresh_sync_inserts_listed_identities_and_commits_anchor() {
        let id = Uuid::from_u128(1);
        let identity = PackageIdentity::new(id, 1);
        let xml = sample_xml(id, 1);
        let decoded = decode_update(&xml).expect("decodes");

        let mock = MockUpstream::default();
        mock.payloads.lock().expect("lock").push(UpdatePayload {
            identity,
            xml: xml.clone(),
        });
        mock.revision_responses.lock().expect("lock").push(crate::types::RevisionIdList {
            identities: vec![identity],
            anchor: "anchor-1".into(),
        });

        let store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let mut engine = SyncEngine::new(mock, Arc::clone(&store), CallerIdentity::random());

        let scope = AnchorScope::categories();
        let summary = engine.sync(scope.clone(), RevisionFilter::default()).await.expect("sync");
        assert_eq!(summary.to_fetch, 1);
        assert_eq!(summary.inserted, 1);

        let stored = store.get_revision(identity).await.expect("get").expect("present");
        assert_eq!(stored.identity(), decoded.identity());
        assert_eq!(store.get_anchor(&scope).await.expect("anchor"), Some("anchor-1".to_string()));
    }

    #[tokio::test]
    async fn already_stored_identities_are_skipped_without_fetch() {
        let id = Uuid::from_u128(2);
        let identity = PackageIdentity::new(id, 1);
        let xml = sample_xml(id, 1);
        let store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        store.put(&decode_update(&xml).expect("decodes"), &xml).await.expect("seed");

        let mock = MockUpstream::default();
        mock.revision_responses.lock().expect("lock").push(crate::types::RevisionIdList {
            identities: vec![identity],
            anchor: "anchor-2".into(),
        });

        let mut engine = SyncEngine::new(mock, Arc::clone(&store), CallerIdentity::random());
        let summary = engine.sync(AnchorScope::categories(), RevisionFilter::default()).await.expect("sync");
        assert_eq!(summary.to_fetch, 0);
        assert_eq!(summary.inserted, 0);
    }

    #[tokio::test]
    async fn two_timeouts_then_success_still_completes() {
        let id = Uuid::from_u128(3);
        let identity = PackageIdentity::new(id, 1);
        let xml = sample_xml(id, 1);

        let mock = MockUpstream::default();
        *mock.timeouts_remaining.lock().expect("lock") = 2;
        mock.payloads.lock().expect("lock").push(UpdatePayload {
            identity,
            xml: xml.clone(),
        });
        mock.revision_responses.lock().expect("lock").push(crate::types::RevisionIdList {
            identities: vec![identity],
            anchor: "anchor-3".into(),
        });

        let store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let mut engine = SyncEngine::new(mock, Arc::clone(&store), CallerIdentity::random());
        let summary = engine.sync(AnchorScope::categories(), RevisionFilter::default()).await.expect("recovers");
        assert_eq!(summary.inserted, 1);
    }

    #[tokio::test]
    async fn three_consecutive_timeouts_exhausts_retry_budget() {
        let id = Uuid::from_u128(4);
        let identity = PackageIdentity::new(id, 1);

        let mock = MockUpstream::default();
        *mock.timeouts_remaining.lock().expect("lock") = 3;
        mock.revision_responses.lock().expect("lock").push(crate::types::RevisionIdList {
            identities: vec![identity],
            anchor: "anchor-4".into(),
        });

        let store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let mut engine = SyncEngine::new(mock, Arc::clone(&store), CallerIdentity::random());
        let result = engine.sync(AnchorScope::categories(), RevisionFilter::default()).await;
        assert!(matches!(result, Err(SyncError::RetryBudgetExhausted { attempts: 3 })));

        assert_eq!(store.get_anchor(&AnchorScope::categories()).await.expect("anchor"), None);
    }

    #[tokio::test]
    async fn invalid_authorization_cookie_mid_fetch_forces_reauth_then_retries_once() {
        let id = Uuid::from_u128(5);
        let identity = PackageIdentity::new(id, 1);
        let xml = sample_xml(id, 1);

        let mock = MockUpstream::default();
        *mock.next_update_data_fault.lock().expect("lock") = Some(crate::error::FaultKind::InvalidAuthorizationCookie);
        mock.payloads.lock().expect("lock").push(UpdatePayload {
            identity,
            xml: xml.clone(),
        });
        mock.revision_responses.lock().expect("lock").push(crate::types::RevisionIdList {
            identities: vec![identity],
            anchor: "anchor-5".into(),
        });

        let store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let mut engine = SyncEngine::new(mock, Arc::clone(&store), CallerIdentity::random());
        let summary = engine
            .sync(AnchorScope::categories(), RevisionFilter::default())
            .await
            .expect("recovers via forced re-auth");
        assert_eq!(summary.inserted, 1);
        assert_eq!(
            store.get_anchor(&AnchorScope::categories()).await.expect("anchor"),
            Some("anchor-5".to_string())
        );
    }
}
