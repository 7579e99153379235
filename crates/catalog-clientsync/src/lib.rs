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

//! Client-sync protocol state machine (§4.5, C9).
//!
//! [`ClientSyncHost`] turns a client's installed/cached fingerprint into the
//! next truncated batch of offerings, in layered order (root → non-leaf →
//! bundle → leaf, or the driver path when the client asks to skip software),
//! and resolves a prior response's revision indexes back into extended and
//! localized XML fragments plus file locations.

pub mod approval;
pub mod error;
pub mod request;
pub mod response;
pub mod session;

use std::collections::HashSet;

use catalog_core::identity::PackageIdentity;
use catalog_core::update::Update;
use catalog_events::{EventBus, SyncEvent};
use catalog_graph::PrerequisiteGraph;
use catalog_store::MetadataStore;
use uuid::Uuid;

pub use approval::{ApprovalPolicy, ApproveAll};
pub use error::{ClientSyncError, ClientSyncResult};
pub use request::{DeviceRequest, ExtendedUpdateInfoRequest, SyncUpdatesRequest};
pub use response::{
    DeploymentAction, ExtendedInfoRecord, ExtendedInfoResponse, FileLocation, OfferedUpdate,
    SyncUpdatesResponse,
};
pub use session::SessionStore;

/// Maximum number of updates offered in a single `SyncUpdates` response (§4.5).
pub const MAX_OFFERED_PER_RESPONSE: usize = 50;

/// Host for the downstream client-sync protocol, holding the session table
/// shared across calls. One instance per running server; stateless beyond
/// the session store, so it can be wrapped in an `Arc` and shared across
/// concurrently-served requests.
pub struct ClientSyncHost<P: ApprovalPolicy = ApproveAll> {
    sessions: SessionStore,
    approval: P,
    content_root: Option<String>,
    events: Option<EventBus>,
}

impl ClientSyncHost<ApproveAll> {
    /// Construct a host with the default (approve-everything) policy.
    #[must_use]
    pub fn new(content_root: Option<String>) -> Self {
        Self::with_policy(ApproveAll, content_root)
    }
}

impl<P: ApprovalPolicy> ClientSyncHost<P> {
    /// Construct a host with an explicit approval policy.
    #[must_use]
    pub fn with_policy(approval: P, content_root: Option<String>) -> Self {
        Self {
            sessions: SessionStore::new(),
            approval,
            content_root,
            events: None,
        }
    }

    /// Publish a `ClientOffered` event on the shared bus after every
    /// `SyncUpdates` call, so an operator can watch offering activity the
    /// same way the upstream fetch loop's progress is observed.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Evaluate a `SyncUpdates` request against a fresh snapshot of `store`.
    ///
    /// Takes a single store snapshot so the whole evaluation runs against one
    /// consistent view (§5: a request must not observe a partial ingest).
    ///
    /// # Errors
    ///
    /// Returns an error if the store snapshot or XML fragmenting fails.
    pub async fn sync_updates(
        &self,
        store: &dyn MetadataStore,
        request: &SyncUpdatesRequest,
    ) -> ClientSyncResult<SyncUpdatesResponse> {
        let snapshot = store.snapshot().await?;
        let cookie = self.sessions.resume_or_start(request.cookie.as_deref());

        let response = if request.skip_software_sync {
            if request.skip_drivers_sync {
                Ok(SyncUpdatesResponse {
                    offered: Vec::new(),
                    truncated: false,
                    cookie,
                    denied_for_audit: Vec::new(),
                })
            } else {
                self.driver_path(store, &snapshot, request, cookie).await
            }
        } else {
            self.software_path(store, &snapshot, request, cookie).await
        }?;

        self.publish_offered(&response);
        Ok(response)
    }

    /// Best-effort; a missing or full event bus never fails the call.
    fn publish_offered(&self, response: &SyncUpdatesResponse) {
        let Some(events) = &self.events else { return };
        let device_id = Uuid::parse_str(&response.cookie).unwrap_or(Uuid::nil());
        let _ = events.publish(SyncEvent::ClientOffered {
            device_id,
            offered: response.offered.len(),
            truncated: response.truncated,
        });
    }

    async fn software_path(
        &self,
        store: &dyn MetadataStore,
        snapshot: &[Update],
        request: &SyncUpdatesRequest,
        cookie: String,
    ) -> ClientSyncResult<SyncUpdatesResponse> {
        let graph = PrerequisiteGraph::build(snapshot);
        let known: HashSet<Uuid> = request
            .installed_non_leaf_ids
            .union(&request.other_cached_ids)
            .copied()
            .collect();
        let by_id = |id: Uuid| snapshot.iter().find(|u| u.identity().id == id);

        let mut denied = Vec::new();

        let root_candidates = Self::layer_candidates(graph.roots(), &known, &by_id, &graph, &request.installed_non_leaf_ids, &self.approval, &mut denied);
        if !root_candidates.is_empty() {
            let tagged = root_candidates
                .into_iter()
                .map(|u| (u, DeploymentAction::Evaluate))
                .collect();
            return self.finish_software(store, tagged, cookie, denied).await;
        }

        let non_leaf_candidates = Self::layer_candidates(
            graph.non_leaf(),
            &known,
            &by_id,
            &graph,
            &request.installed_non_leaf_ids,
            &self.approval,
            &mut denied,
        );
        if !non_leaf_candidates.is_empty() {
            let tagged = non_leaf_candidates
                .into_iter()
                .map(|u| (u, DeploymentAction::Evaluate))
                .collect();
            return self.finish_software(store, tagged, cookie, denied).await;
        }

        // §4.5 layers 3-4 are "leaf software updates"; a leaf driver update
        // is only ever offered through the driver path below.
        let leaves: Vec<Uuid> = graph
            .leaf()
            .into_iter()
            .filter(|id| by_id(*id).is_some_and(|u| matches!(u, Update::SoftwareUpdate { .. })))
            .collect();
        let (bundle_leaves, plain_leaves): (Vec<Uuid>, Vec<Uuid>) = leaves
            .into_iter()
            .partition(|id| by_id(*id).is_some_and(Update::is_bundle));

        let bundle_candidates = Self::layer_candidates(
            bundle_leaves,
            &known,
            &by_id,
            &graph,
            &request.installed_non_leaf_ids,
            &self.approval,
            &mut denied,
        );
        if !bundle_candidates.is_empty() {
            let mut tagged: Vec<(&Update, DeploymentAction)> = Vec::new();
            let mut seen: HashSet<Uuid> = HashSet::new();
            for bundle in bundle_candidates {
                if seen.insert(bundle.identity().id) {
                    tagged.push((bundle, DeploymentAction::Install));
                }
                for member in bundle.bundled_members().unwrap_or_default() {
                    if seen.insert(member.id)
                        && let Some(member_update) = by_id(member.id)
                    {
                        tagged.push((member_update, DeploymentAction::Bundle));
                    }
                }
            }
            return self.finish_software(store, tagged, cookie, denied).await;
        }

        let leaf_candidates = Self::layer_candidates(
            plain_leaves,
            &known,
            &by_id,
            &graph,
            &request.installed_non_leaf_ids,
            &self.approval,
            &mut denied,
        );
        let tagged = leaf_candidates
            .into_iter()
            .map(|u| (u, DeploymentAction::Install))
            .collect();
        self.finish_software(store, tagged, cookie, denied).await
    }

    /// Collect every candidate from `ids` not already known to the client,
    /// applicable under `installed`, and approved; candidates rejected only
    /// by approval are appended to `denied` for audit.
    fn layer_candidates<'a>(
        ids: Vec<Uuid>,
        known: &HashSet<Uuid>,
        by_id: &impl Fn(Uuid) -> Option<&'a Update>,
        graph: &PrerequisiteGraph,
        installed: &HashSet<Uuid>,
        approval: &impl ApprovalPolicy,
        denied: &mut Vec<PackageIdentity>,
    ) -> Vec<&'a Update> {
        let mut out = Vec::new();
        for id in ids {
            if known.contains(&id) {
                continue;
            }
            let Some(update) = by_id(id) else {
                continue;
            };
            if !graph.is_applicable(id, installed) {
                continue;
            }
            if approval.is_approved(update) {
                out.push(update);
            } else {
                denied.push(update.identity());
            }
        }
        out
    }

    async fn finish_software(
        &self,
        store: &dyn MetadataStore,
        mut candidates: Vec<(&Update, DeploymentAction)>,
        cookie: String,
        denied_for_audit: Vec<PackageIdentity>,
    ) -> ClientSyncResult<SyncUpdatesResponse> {
        // Stable order so truncation is deterministic across calls against
        // the same snapshot.
        candidates.sort_by_key(|(update, _)| update.identity());
        let truncated = candidates.len() > MAX_OFFERED_PER_RESPONSE;
        candidates.truncate(MAX_OFFERED_PER_RESPONSE);

        let mut offered = Vec::with_capacity(candidates.len());
        for (update, action) in candidates {
            let identity = update.identity();
            let xml = store
                .get_xml(identity)
                .await?
                .unwrap_or_default();
            let core_fragment = catalog_xml::fragment::core_fragment(&xml)?;
            let revision_index = self
                .sessions
                .assign_index(&cookie, identity)
                .ok_or(ClientSyncError::UnknownSession)?;
            offered.push(OfferedUpdate {
                identity,
                revision_index,
                action,
                core_fragment,
            });
        }

        Ok(SyncUpdatesResponse {
            offered,
            truncated,
            cookie,
            denied_for_audit,
        })
    }

    async fn driver_path(
        &self,
        store: &dyn MetadataStore,
        snapshot: &[Update],
        request: &SyncUpdatesRequest,
        cookie: String,
    ) -> ClientSyncResult<SyncUpdatesResponse> {
        let installed: HashSet<Uuid> = request.installed_non_leaf_ids.clone();
        let mut winners: Vec<(PackageIdentity, catalog_driver::HardwareMatch)> = Vec::new();

        for device in &request.devices {
            let mut matches = Vec::new();
            for update in snapshot {
                if !matches!(update, Update::DriverUpdate { .. }) {
                    continue;
                }
                if request.cached_driver_ids.contains(&update.identity().id) {
                    continue;
                }
                if !self.approval.is_approved(update) {
                    continue;
                }
                if let Some(hit) = catalog_driver::match_candidate(
                    update,
                    &device.hardware_ids,
                    &request.computer_hardware_ids,
                    &installed,
                ) {
                    matches.push((update.identity(), hit));
                }
            }
            if let Some(winner) = catalog_driver::best_match(matches) {
                winners.push(winner);
            }
        }

        winners.sort_by_key(|(identity, _)| *identity);
        winners.dedup_by_key(|(identity, _)| *identity);
        let truncated = winners.len() > MAX_OFFERED_PER_RESPONSE;
        winners.truncate(MAX_OFFERED_PER_RESPONSE);

        let mut offered = Vec::with_capacity(winners.len());
        for (identity, _) in winners {
            let xml = store.get_xml(identity).await?.unwrap_or_default();
            let core_fragment = catalog_xml::fragment::core_fragment(&xml)?;
            let revision_index = self
                .sessions
                .assign_index(&cookie, identity)
                .ok_or(ClientSyncError::UnknownSession)?;
            offered.push(OfferedUpdate {
                identity,
                revision_index,
                action: DeploymentAction::Install,
                core_fragment,
            });
        }

        Ok(SyncUpdatesResponse {
            offered,
            truncated,
            cookie,
            denied_for_audit: Vec::new(),
        })
    }

    /// Resolve a `GetExtendedUpdateInfo` request: extended + localized
    /// fragments per revision index, plus every referenced file location.
    ///
    /// # Errors
    ///
    /// Returns [`ClientSyncError::UnknownSession`] if the cookie is unknown
    /// or expired, and [`ClientSyncError::UnknownRevisionIndex`] if a
    /// requested index was never assigned within that session.
    pub async fn extended_info(
        &self,
        store: &dyn MetadataStore,
        request: &ExtendedUpdateInfoRequest,
    ) -> ClientSyncResult<ExtendedInfoResponse> {
        let languages: Vec<&str> = request.languages.iter().map(String::as_str).collect();
        let mut records = Vec::with_capacity(request.revision_indexes.len());
        let mut file_locations: Vec<FileLocation> = Vec::new();
        let mut seen_digests: HashSet<String> = HashSet::new();

        for &index in &request.revision_indexes {
            let identity = self
                .sessions
                .resolve(&request.cookie, index)
                .ok_or(ClientSyncError::UnknownRevisionIndex { index })?;
            let xml = store.get_xml(identity).await?.unwrap_or_default();
            let extended_fragment = catalog_xml::fragment::extended_fragment(&xml)?;
            let localized_fragment = catalog_xml::fragment::localized_fragment(&xml, &languages)?;

            if let Some(update) = store.get_revision(identity).await? {
                for file in update.files().unwrap_or_default() {
                    let Some(digest) = file.strongest_digest() else {
                        continue;
                    };
                    let digest_hex = hex_encode(&digest.bytes);
                    if !seen_digests.insert(digest_hex.clone()) {
                        continue;
                    }
                    let url = match &self.content_root {
                        Some(root) => format!("{root}/{digest_hex}"),
                        None => file.source_url.clone(),
                    };
                    file_locations.push(FileLocation { digest_hex, url });
                }
            }

            records.push(ExtendedInfoRecord {
                revision_index: index,
                identity,
                extended_fragment,
                localized_fragment,
            });
        }

        Ok(ExtendedInfoResponse { records, file_locations })
    }
}

/// Lowercase hex encoding used for digest-keyed file locations.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::prerequisite::Prerequisite;
    use catalog_core::update::{SoftwareUpdateData, UpdateHeader};
    use catalog_store::InMemoryMetadataStore;

    fn header(n: u128, title: &str) -> UpdateHeader {
        UpdateHeader {
            identity: PackageIdentity::new(Uuid::from_u128(n), 1),
            title: title.to_string(),
            description: None,
        }
    }

    fn software(n: u128, title: &str, prereqs: Vec<Prerequisite>) -> Update {
        Update::SoftwareUpdate {
            header: header(n, title),
            data: SoftwareUpdateData {
                files: vec![],
                prerequisites: prereqs,
                superseded: vec![],
                bundled_with: vec![],
                bundled_members: vec![],
                kb_article_id: None,
                support_url: None,
                os_upgrade: false,
                product_ids: vec![],
                classification_ids: vec![],
            },
        }
    }

    fn driver(n: u128, title: &str, prereqs: Vec<Prerequisite>) -> Update {
        Update::DriverUpdate {
            header: header(n, title),
            data: catalog_core::update::DriverUpdateData {
                files: vec![],
                prerequisites: prereqs,
                driver_metadata: vec![],
                product_ids: vec![],
                classification_ids: vec![],
            },
        }
    }

    fn minimal_xml(n: u128) -> String {
        format!(
            "<Update><UpdateIdentity UpdateID=\"{n}\" RevisionNumber=\"1\"/><Properties UpdateType=\"Software\"/></Update>"
        )
    }

    async fn store_with(updates: &[Update]) -> InMemoryMetadataStore {
        let store = InMemoryMetadataStore::new();
        for update in updates {
            let xml = minimal_xml(update.identity().id.as_u128());
            store.put(update, &xml).await.expect("put");
        }
        store
    }

    #[tokio::test]
    async fn first_call_with_no_installed_state_offers_only_roots() {
        let root = software(1, "Root", vec![]);
        let dependent = software(
            2,
            "Dependent",
            vec![Prerequisite::Simple {
                target: PackageIdentity::new(Uuid::from_u128(1), 1),
            }],
        );
        let store = store_with(&[root, dependent]).await;
        let host = ClientSyncHost::new(None);

        let response = host
            .sync_updates(&store, &SyncUpdatesRequest::default())
            .await
            .expect("sync");

        assert_eq!(response.offered.len(), 1);
        assert_eq!(response.offered[0].action, DeploymentAction::Evaluate);
        assert_eq!(response.offered[0].identity.id, Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn installing_the_root_advances_to_the_leaf_layer() {
        let root = software(1, "Root", vec![]);
        let dependent = software(
            2,
            "Dependent",
            vec![Prerequisite::Simple {
                target: PackageIdentity::new(Uuid::from_u128(1), 1),
            }],
        );
        let store = store_with(&[root, dependent]).await;
        let host = ClientSyncHost::new(None);

        let mut request = SyncUpdatesRequest::default();
        request.installed_non_leaf_ids.insert(Uuid::from_u128(1));
        let response = host.sync_updates(&store, &request).await.expect("sync");

        assert_eq!(response.offered.len(), 1);
        assert_eq!(response.offered[0].identity.id, Uuid::from_u128(2));
        assert_eq!(response.offered[0].action, DeploymentAction::Install);
    }

    #[tokio::test]
    async fn already_known_updates_are_not_reoffered() {
        let root = software(1, "Root", vec![]);
        let store = store_with(&[root]).await;
        let host = ClientSyncHost::new(None);

        let mut request = SyncUpdatesRequest::default();
        request.other_cached_ids.insert(Uuid::from_u128(1));
        let response = host.sync_updates(&store, &request).await.expect("sync");
        assert!(response.offered.is_empty());
    }

    #[tokio::test]
    async fn denied_candidates_are_reported_for_audit_not_offered() {
        struct DenyAll;
        impl ApprovalPolicy for DenyAll {
            fn is_approved(&self, _update: &Update) -> bool {
                false
            }
        }
        let root = software(1, "Root", vec![]);
        let store = store_with(&[root]).await;
        let host = ClientSyncHost::with_policy(DenyAll, None);

        let response = host
            .sync_updates(&store, &SyncUpdatesRequest::default())
            .await
            .expect("sync");
        assert!(response.offered.is_empty());
        assert_eq!(response.denied_for_audit.len(), 1);
    }

    #[tokio::test]
    async fn leaf_driver_update_is_never_offered_through_the_software_path() {
        let root = software(1, "Root", vec![]);
        let leaf_driver = driver(
            2,
            "Driver",
            vec![Prerequisite::Simple {
                target: PackageIdentity::new(Uuid::from_u128(1), 1),
            }],
        );
        let store = store_with(&[root, leaf_driver]).await;
        let host = ClientSyncHost::new(None);

        let mut request = SyncUpdatesRequest::default();
        request.installed_non_leaf_ids.insert(Uuid::from_u128(1));
        let response = host.sync_updates(&store, &request).await.expect("sync");

        assert!(response.offered.is_empty());
    }

    #[tokio::test]
    async fn extended_info_resolves_previously_assigned_indexes() {
        let root = software(1, "Root", vec![]);
        let store = store_with(&[root]).await;
        let host = ClientSyncHost::new(None);

        let sync = host
            .sync_updates(&store, &SyncUpdatesRequest::default())
            .await
            .expect("sync");
        let index = sync.offered[0].revision_index;

        let request = ExtendedUpdateInfoRequest {
            cookie: sync.cookie,
            revision_indexes: vec![index],
            languages: vec!["en".to_string()],
        };
        let extended = host.extended_info(&store, &request).await.expect("extended");
        assert_eq!(extended.records.len(), 1);
        assert_eq!(extended.records[0].identity.id, Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn extended_info_rejects_unknown_revision_index() {
        let store = store_with(&[]).await;
        let host = ClientSyncHost::new(None);
        let cookie = host.sessions.resume_or_start(None);
        let request = ExtendedUpdateInfoRequest {
            cookie,
            revision_indexes: vec![999],
            languages: vec![],
        };
        let err = host.extended_info(&store, &request).await.unwrap_err();
        assert!(matches!(err, ClientSyncError::UnknownRevisionIndex { index: 999 }));
    }
}
