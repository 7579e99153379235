//! Per-client revision index sessions, keyed by an opaque cookie.
//!
//! Mirrors the plain `Mutex<HashMap<..>>` + TTL session pattern used for
//! downstream-facing cookies elsewhere in this codebase: a session maps the
//! small integer revision indexes a `SyncUpdates` response hands out back to
//! the identities they name, so a later `GetExtendedUpdateInfo` call can
//! resolve them without the client ever seeing a real identity.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use catalog_core::identity::PackageIdentity;
use uuid::Uuid;

/// How long an issued session remains valid without being renewed.
const SESSION_TTL: Duration = Duration::from_secs(30 * 60);

struct Session {
    expires_at: Instant,
    next_index: u32,
    index_of: HashMap<PackageIdentity, u32>,
    identity_of: HashMap<u32, PackageIdentity>,
}

impl Session {
    fn new() -> Self {
        Self {
            expires_at: Instant::now() + SESSION_TTL,
            next_index: 1,
            index_of: HashMap::new(),
            identity_of: HashMap::new(),
        }
    }

    fn assign(&mut self, identity: PackageIdentity) -> u32 {
        if let Some(index) = self.index_of.get(&identity) {
            return *index;
        }
        let index = self.next_index;
        self.next_index = self.next_index.wrapping_add(1).max(1);
        self.index_of.insert(identity, index);
        self.identity_of.insert(index, identity);
        index
    }
}

/// Server-side table of client-sync sessions, one per issued cookie.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    /// Construct an empty session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume `cookie`'s session if it exists and has not expired, or start a
    /// fresh one (and a fresh cookie) otherwise. Returns the active cookie.
    pub fn resume_or_start(&self, cookie: Option<&str>) -> String {
        let mut guard = self.lock();
        if let Some(cookie) = cookie
            && let Some(session) = guard.get_mut(cookie)
        {
            if session.expires_at > Instant::now() {
                session.expires_at = Instant::now() + SESSION_TTL;
                return cookie.to_string();
            }
            guard.remove(cookie);
        }
        let fresh = Uuid::new_v4().simple().to_string();
        guard.insert(fresh.clone(), Session::new());
        fresh
    }

    /// Assign (or recall) a stable revision index for `identity` within
    /// `cookie`'s session. Returns `None` if the cookie is unknown.
    pub fn assign_index(&self, cookie: &str, identity: PackageIdentity) -> Option<u32> {
        let mut guard = self.lock();
        let session = guard.get_mut(cookie)?;
        Some(session.assign(identity))
    }

    /// Resolve a previously assigned revision index back to its identity.
    pub fn resolve(&self, cookie: &str, index: u32) -> Option<PackageIdentity> {
        let guard = self.lock();
        let session = guard.get(cookie)?;
        if session.expires_at <= Instant::now() {
            return None;
        }
        session.identity_of.get(&index).copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> PackageIdentity {
        PackageIdentity::new(Uuid::from_u128(n), 1)
    }

    #[test]
    fn fresh_cookie_starts_a_new_session() {
        let store = SessionStore::new();
        let cookie = store.resume_or_start(None);
        assert!(store.assign_index(&cookie, id(1)).is_some());
    }

    #[test]
    fn same_identity_reuses_its_index_within_a_session() {
        let store = SessionStore::new();
        let cookie = store.resume_or_start(None);
        let first = store.assign_index(&cookie, id(1)).expect("assigned");
        let second = store.assign_index(&cookie, id(1)).expect("assigned");
        assert_eq!(first, second);
    }

    #[test]
    fn resolve_round_trips_an_assigned_index() {
        let store = SessionStore::new();
        let cookie = store.resume_or_start(None);
        let index = store.assign_index(&cookie, id(7)).expect("assigned");
        assert_eq!(store.resolve(&cookie, index), Some(id(7)));
    }

    #[test]
    fn unknown_cookie_resolves_to_nothing() {
        let store = SessionStore::new();
        assert!(store.resolve("does-not-exist", 1).is_none());
    }

    #[test]
    fn resuming_a_known_cookie_keeps_its_assignments() {
        let store = SessionStore::new();
        let cookie = store.resume_or_start(None);
        let index = store.assign_index(&cookie, id(3)).expect("assigned");
        let resumed = store.resume_or_start(Some(&cookie));
        assert_eq!(resumed, cookie);
        assert_eq!(store.resolve(&resumed, index), Some(id(3)));
    }
}
