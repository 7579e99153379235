//! Authentication state machine (§4.1).
//!
//! `Unauthenticated -> HaveAuthInfo -> HaveAuthCookie -> HaveAccessCookie`,
//! with a fast re-exchange path when the access cookie is near expiry and a
//! forced full reset when the upstream reports `InvalidAuthorizationCookie`.

use chrono::Utc;

use crate::client::UpstreamClient;
use crate::error::{SyncError, SyncResult};
use crate::types::{AccessCookie, AuthorizationCookie, CallerIdentity};

enum State {
    Unauthenticated,
    HaveAuthInfo { relative_authentication_url: String },
    HaveAuthCookie { authorization: AuthorizationCookie },
    HaveAccessCookie {
        authorization: AuthorizationCookie,
        access: AccessCookie,
    },
}

/// Drives the authentication state machine against an [`UpstreamClient`],
/// producing a valid [`AccessCookie`] on demand.
pub struct AuthManager {
    caller: CallerIdentity,
    state: State,
}

impl AuthManager {
    /// Construct a manager for `caller`, starting `Unauthenticated`.
    #[must_use]
    pub const fn new(caller: CallerIdentity) -> Self {
        Self {
            caller,
            state: State::Unauthenticated,
        }
    }

    /// Return a valid access cookie, performing whatever auth-state
    /// transitions are necessary. Transparently retries once after a forced
    /// full re-auth if the upstream reports `InvalidAuthorizationCookie`.
    ///
    /// # Errors
    ///
    /// Returns an error if any RPC in the chain fails, or if the upstream
    /// advertises no authentication plugins.
    pub async fn ensure_valid(&mut self, client: &dyn UpstreamClient) -> SyncResult<AccessCookie> {
        match self.ensure_valid_once(client).await {
            Err(err) if err.requires_reauth() => {
                self.state = State::Unauthenticated;
                self.ensure_valid_once(client).await
            }
            other => other,
        }
    }

    /// Force a full re-authentication handshake, discarding any cached
    /// cookie, and return the resulting access cookie. Used when an
    /// `InvalidAuthorizationCookie` fault surfaces from an RPC outside this
    /// manager's own calls (e.g. mid-fetch-loop `GetUpdateData`), per §4.1 /
    /// §5's "single re-auth then resume".
    ///
    /// # Errors
    ///
    /// Returns an error if any RPC in the re-auth chain fails.
    pub async fn force_reauth(&mut self, client: &dyn UpstreamClient) -> SyncResult<AccessCookie> {
        self.state = State::Unauthenticated;
        self.ensure_valid_once(client).await
    }

    async fn ensure_valid_once(&mut self, client: &dyn UpstreamClient) -> SyncResult<AccessCookie> {
        if matches!(self.state, State::Unauthenticated) {
            let config = client.get_auth_config().await?;
            let plugin = config.plugins.into_iter().next().ok_or(SyncError::NoAuthPlugins)?;
            self.state = State::HaveAuthInfo {
                relative_authentication_url: plugin.relative_authentication_url,
            };
        }

        if let State::HaveAuthInfo {
            relative_authentication_url,
        } = &self.state
        {
            let authorization = client
                .get_authorization_cookie(relative_authentication_url, &self.caller)
                .await?;
            self.state = State::HaveAuthCookie { authorization };
        }

        let now = Utc::now();
        match &self.state {
            State::HaveAuthCookie { authorization } => {
                let access = client.get_cookie(authorization).await?;
                let authorization = authorization.clone();
                self.state = State::HaveAccessCookie { authorization, access: access.clone() };
                Ok(access)
            }
            State::HaveAccessCookie { access, .. } if access.is_valid(now) && !access.is_near_expiry(now) => {
                Ok(access.clone())
            }
            State::HaveAccessCookie { authorization, .. } => {
                // Either outright invalid or within the near-expiry window:
                // re-exchange the same authorization cookie rather than a
                // full re-auth.
                let fresh = client.get_cookie(authorization).await?;
                let authorization = authorization.clone();
                self.state = State::HaveAccessCookie { authorization, access: fresh.clone() };
                Ok(fresh)
            }
            State::Unauthenticated | State::HaveAuthInfo { .. } => {
                unreachable!("prior transitions leave the state machine at HaveAuthCookie or later")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockUpstream;
    use crate::error::FaultKind;

    #[tokio::test]
    async fn fresh_manager_completes_full_handshake() {
        let mock = MockUpstream::default();
        let mut manager = AuthManager::new(CallerIdentity::random());
        let access = manager.ensure_valid(&mock).await.expect("handshake");
        assert_eq!(access.value, "access-cookie");
        assert_eq!(*mock.auth_config_calls.lock().expect("lock"), 1);
        assert_eq!(*mock.authorization_calls.lock().expect("lock"), 1);
        assert_eq!(*mock.cookie_calls.lock().expect("lock"), 1);
    }

    #[tokio::test]
    async fn subsequent_calls_reuse_valid_access_cookie() {
        let mock = MockUpstream::default();
        let mut manager = AuthManager::new(CallerIdentity::random());
        manager.ensure_valid(&mock).await.expect("first");
        manager.ensure_valid(&mock).await.expect("second");
        assert_eq!(*mock.cookie_calls.lock().expect("lock"), 1);
    }

    #[tokio::test]
    async fn invalid_authorization_cookie_forces_full_reauth_once() {
        let mock = MockUpstream::default();
        *mock.next_cookie_fault.lock().expect("lock") = Some(FaultKind::InvalidAuthorizationCookie);
        let mut manager = AuthManager::new(CallerIdentity::random());
        let access = manager.ensure_valid(&mock).await.expect("recovers via full reauth");
        assert_eq!(access.value, "access-cookie");
        assert_eq!(*mock.auth_config_calls.lock().expect("lock"), 2);
        assert_eq!(*mock.cookie_calls.lock().expect("lock"), 2);
    }
}
