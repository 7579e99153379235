//! The upstream RPC boundary.
//!
//! `UpstreamClient` is the seam at which the HTTP/SOAP transport (out of
//! scope per §1) plugs in: a real implementation would serialize these calls
//! as SOAP envelopes against `<root>/ServerSyncWebService/ServerSyncWebService.asmx`
//! (and the plugin-specific authentication endpoint for the first two
//! calls); the engine only ever sees the typed request/response pairs below.

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::types::{
    AccessCookie, AuthConfig, AuthorizationCookie, CallerIdentity, ConfigData, RevisionFilter,
    RevisionIdList, UpdatePayload,
};
use catalog_core::identity::PackageIdentity;

/// The four upstream RPCs the sync engine drives (§4.1).
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// `GetAuthConfig`: list the authentication plugins the upstream accepts.
    async fn get_auth_config(&self) -> SyncResult<AuthConfig>;

    /// `GetAuthorizationCookie`: exchange a caller identity for an
    /// authorization cookie via the plugin at `relative_authentication_url`.
    async fn get_authorization_cookie(
        &self,
        relative_authentication_url: &str,
        caller: &CallerIdentity,
    ) -> SyncResult<AuthorizationCookie>;

    /// `GetCookie`: promote an authorization cookie into an access cookie.
    async fn get_cookie(&self, authorization: &AuthorizationCookie) -> SyncResult<AccessCookie>;

    /// `GetConfigData`: fetch the server's per-request limits.
    async fn get_config_data(&self, access: &AccessCookie) -> SyncResult<ConfigData>;

    /// `GetRevisionIdList`: list identities matching `filter`, anchored.
    async fn get_revision_id_list(
        &self,
        access: &AccessCookie,
        filter: &RevisionFilter,
    ) -> SyncResult<RevisionIdList>;

    /// `GetUpdateData`: fetch decoded payloads for a batch of identities.
    ///
    /// Callers must never request more identities than the server's
    /// `MaxNumberOfUpdatesPerRequest`; the engine enforces this before
    /// calling.
    async fn get_update_data(
        &self,
        access: &AccessCookie,
        batch: &[PackageIdentity],
    ) -> SyncResult<Vec<UpdatePayload>>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    //! An in-memory [`UpstreamClient`] used by engine tests and fixtures.
    //!
    //! Lets a test script a fixed sequence of outcomes (including injected
    //! timeouts and an `InvalidAuthorizationCookie` fault) without a real
    //! transport.

    use std::sync::Mutex;

    use super::{
        AccessCookie, AuthConfig, AuthorizationCookie, CallerIdentity, ConfigData, RevisionFilter,
        RevisionIdList, UpdatePayload, UpstreamClient,
    };
    use crate::error::{FaultKind, SyncError, SyncResult};
    use async_trait::async_trait;
    use catalog_core::identity::PackageIdentity;
    use chrono::Utc;

    /// Scripted server state plus counters observed by assertions.
    #[derive(Default)]
    pub struct MockUpstream {
        /// Catalog of payloads the mock server knows about, keyed by the
        /// identities `GetUpdateData` will be asked for.
        pub payloads: Mutex<Vec<UpdatePayload>>,
        /// `GetRevisionIdList` responses to return, consumed in order.
        pub revision_responses: Mutex<Vec<RevisionIdList>>,
        /// Remaining consecutive timeouts to inject on `GetUpdateData`.
        pub timeouts_remaining: Mutex<u32>,
        /// Count of `GetAuthConfig` calls observed.
        pub auth_config_calls: Mutex<u32>,
        /// Count of `GetAuthorizationCookie` calls observed.
        pub authorization_calls: Mutex<u32>,
        /// Count of `GetCookie` calls observed.
        pub cookie_calls: Mutex<u32>,
        /// Number of identities requested in the last `GetUpdateData` call.
        pub last_batch_size: Mutex<usize>,
        /// If set, the next `GetCookie` call fails with this fault.
        pub next_cookie_fault: Mutex<Option<FaultKind>>,
        /// If set, the next `GetUpdateData` call fails with this fault
        /// instead of consulting `timeouts_remaining`.
        pub next_update_data_fault: Mutex<Option<FaultKind>>,
    }

    #[async_trait]
    impl UpstreamClient for MockUpstream {
        async fn get_auth_config(&self) -> SyncResult<AuthConfig> {
            *self.auth_config_calls.lock().expect("lock") += 1;
            Ok(AuthConfig {
                plugins: vec![crate::types::AuthPlugin {
                    id: "mock".into(),
                    relative_authentication_url: "auth/mock".into(),
                }],
            })
        }

        async fn get_authorization_cookie(
            &self,
            _relative_authentication_url: &str,
            _caller: &CallerIdentity,
        ) -> SyncResult<AuthorizationCookie> {
            *self.authorization_calls.lock().expect("lock") += 1;
            Ok(AuthorizationCookie {
                value: "auth-cookie".into(),
            })
        }

        async fn get_cookie(&self, _authorization: &AuthorizationCookie) -> SyncResult<AccessCookie> {
            *self.cookie_calls.lock().expect("lock") += 1;
            if let Some(kind) = self.next_cookie_fault.lock().expect("lock").take() {
                return Err(SyncError::Fault {
                    kind,
                    detail: "mock fault".into(),
                });
            }
            Ok(AccessCookie {
                value: "access-cookie".into(),
                expires_at: Utc::now() + chrono::Duration::hours(4),
            })
        }

        async fn get_config_data(&self, _access: &AccessCookie) -> SyncResult<ConfigData> {
            Ok(ConfigData {
                max_number_of_updates_per_request: 100,
            })
        }

        async fn get_revision_id_list(
            &self,
            _access: &AccessCookie,
            _filter: &RevisionFilter,
        ) -> SyncResult<RevisionIdList> {
            let mut responses = self.revision_responses.lock().expect("lock");
            if responses.is_empty() {
                return Ok(RevisionIdList {
                    identities: vec![],
                    anchor: "anchor-empty".into(),
                });
            }
            Ok(responses.remove(0))
        }

        async fn get_update_data(
            &self,
            _access: &AccessCookie,
            batch: &[PackageIdentity],
        ) -> SyncResult<Vec<UpdatePayload>> {
            *self.last_batch_size.lock().expect("lock") = batch.len();
            if let Some(kind) = self.next_update_data_fault.lock().expect("lock").take() {
                return Err(SyncError::Fault {
                    kind,
                    detail: "mock fault".into(),
                });
            }
            let mut remaining = self.timeouts_remaining.lock().expect("lock");
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SyncError::Fault {
                    kind: FaultKind::Timeout,
                    detail: "mock timeout".into(),
                });
            }
            drop(remaining);
            let payloads = self.payloads.lock().expect("lock");
            Ok(payloads
                .iter()
                .filter(|payload| batch.contains(&payload.identity))
                .cloned()
                .collect())
        }
    }
}
