//! Typed request/response DTOs for the four upstream RPCs (§4.1, §6).
//!
//! The HTTP/SOAP transport framing is out of scope (§1): these types model
//! the RPC boundary as plain typed values, as if the wire format were
//! already an implementation detail handled by whatever [`crate::client::UpstreamClient`]
//! is plugged in.

use catalog_core::identity::PackageIdentity;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Protocol version string sent with `GetCookie` (cookie exchange).
pub const COOKIE_EXCHANGE_PROTOCOL_VERSION: &str = "1.7";
/// Protocol version string sent with every other upstream RPC.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.20";

/// An authentication plugin descriptor returned by `GetAuthConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPlugin {
    /// Plugin identifier as advertised by the upstream.
    pub id: String,
    /// Endpoint the plugin's `GetAuthorizationCookie` call should target,
    /// relative to the upstream root.
    pub relative_authentication_url: String,
}

/// Response to `GetAuthConfig`: every plugin the upstream is willing to
/// authenticate through. The engine always picks `plugins[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Candidate plugins, in the upstream's preference order.
    pub plugins: Vec<AuthPlugin>,
}

/// Caller identity presented to `GetAuthorizationCookie`.
///
/// Per the documented legacy quirk (§9 Open Questions), the correct mapping
/// is `account_name` = caller's display name, `account_guid` = caller's
/// account GUID; this type makes that mapping impossible to get backwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Caller's display name.
    pub account_name: String,
    /// Caller's account GUID.
    pub account_guid: Uuid,
}

impl CallerIdentity {
    /// A fresh, randomly generated caller identity, used when no durable
    /// account has been configured.
    #[must_use]
    pub fn random() -> Self {
        Self {
            account_name: format!("catalog-sync-{}", Uuid::new_v4()),
            account_guid: Uuid::new_v4(),
        }
    }
}

/// Opaque authorization cookie returned by `GetAuthorizationCookie`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCookie {
    /// Opaque cookie bytes, as returned by the upstream.
    pub value: String,
}

/// Opaque access cookie returned by `GetCookie`, with an expiry hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCookie {
    /// Opaque cookie payload.
    pub value: String,
    /// Expiry hint reported by the upstream.
    pub expires_at: DateTime<Utc>,
}

impl AccessCookie {
    /// An access cookie must be treated as valid only while more than two
    /// minutes remain before expiry.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > chrono::Duration::minutes(2)
    }

    /// Near-expiry (within 30 minutes) triggers the fast re-exchange path.
    #[must_use]
    pub fn is_near_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= chrono::Duration::minutes(30)
    }
}

/// Server configuration blob returned by `GetConfigData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigData {
    /// Per-`GetUpdateData`-call cap on batch size; a hard server-side limit.
    pub max_number_of_updates_per_request: u32,
}

/// Selection criteria sent to `GetRevisionIdList`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionFilter {
    /// Product category GUIDs to scope the request to; empty means all.
    pub product_ids: Vec<Uuid>,
    /// Classification category GUIDs to scope the request to.
    pub classification_ids: Vec<Uuid>,
    /// Previously recorded anchor for this filter's scope, if any. Its
    /// presence sets the `Delta=true` bit on the request.
    pub anchor: Option<String>,
}

impl RevisionFilter {
    /// Whether this filter requests delta (changed-since-anchor) semantics.
    #[must_use]
    pub const fn is_delta(&self) -> bool {
        self.anchor.is_some()
    }

    /// Stable hash used as the filter component of an anchor's scope key.
    ///
    /// Two filters with the same product/classification sets (irrespective
    /// of order) hash identically, since the anchor semantics are scoped by
    /// selection criteria, not request order.
    #[must_use]
    pub fn stable_hash(&self) -> String {
        let mut products = self.product_ids.clone();
        let mut classifications = self.classification_ids.clone();
        products.sort();
        classifications.sort();
        let mut input = String::new();
        for id in &products {
            input.push_str(&id.to_string());
        }
        input.push('|');
        for id in &classifications {
            input.push_str(&id.to_string());
        }
        format!("{:016x}", fnv1a(input.as_bytes()))
    }
}

/// Small dependency-free FNV-1a hash, sufficient for a stable cache key.
const fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
        i += 1;
    }
    hash
}

/// Response to `GetRevisionIdList`: the set of identities currently matching
/// the filter, plus a fresh anchor for the next delta call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionIdList {
    /// Identities the filter currently matches (new or changed, if this was
    /// a delta request).
    pub identities: Vec<PackageIdentity>,
    /// Opaque anchor representing this response's catalog state.
    pub anchor: String,
}

/// A single decoded update payload returned by `GetUpdateData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePayload {
    /// Identity the payload describes.
    pub identity: PackageIdentity,
    /// Canonical update XML, already decompressed if the upstream sent it
    /// compressed (the compression primitive is out of scope; transports
    /// are expected to decompress before returning a payload here).
    pub xml: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_cookie_validity_uses_two_minute_floor() {
        let now = Utc::now();
        let barely_valid = AccessCookie {
            value: "x".into(),
            expires_at: now + chrono::Duration::minutes(3),
        };
        let expiring = AccessCookie {
            value: "x".into(),
            expires_at: now + chrono::Duration::minutes(1),
        };
        assert!(barely_valid.is_valid(now));
        assert!(!expiring.is_valid(now));
    }

    #[test]
    fn near_expiry_triggers_within_thirty_minutes() {
        let now = Utc::now();
        let soon = AccessCookie {
            value: "x".into(),
            expires_at: now + chrono::Duration::minutes(25),
        };
        let comfortable = AccessCookie {
            value: "x".into(),
            expires_at: now + chrono::Duration::hours(2),
        };
        assert!(soon.is_near_expiry(now));
        assert!(!comfortable.is_near_expiry(now));
    }

    #[test]
    fn filter_hash_is_order_independent() {
        let a = RevisionFilter {
            product_ids: vec![Uuid::from_u128(1), Uuid::from_u128(2)],
            classification_ids: vec![],
            anchor: None,
        };
        let b = RevisionFilter {
            product_ids: vec![Uuid::from_u128(2), Uuid::from_u128(1)],
            classification_ids: vec![],
            anchor: None,
        };
        assert_eq!(a.stable_hash(), b.stable_hash());
    }

    #[test]
    fn delta_flag_follows_anchor_presence() {
        let fresh = RevisionFilter::default();
        let delta = RevisionFilter {
            anchor: Some("a".into()),
            ..RevisionFilter::default()
        };
        assert!(!fresh.is_delta());
        assert!(delta.is_delta());
    }
}
