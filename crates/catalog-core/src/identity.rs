//! `PackageIdentity`: a 128-bit GUID paired with a monotonically increasing revision.

use std::cmp::Ordering;
use std::fmt;

use sha2::{Digest, Sha512};
use uuid::Uuid;

/// Identifies a single revision of an update: a GUID plus a revision number.
///
/// Two identities are equal iff both the GUID and the revision match.
/// Ordering is lexicographic on `(high64, low64, revision)`, matching the
/// order used when identities are stored in sorted indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PackageIdentity {
    /// 128-bit update identifier.
    pub id: Uuid,
    /// Monotonically increasing revision of `id`.
    pub revision: u32,
}

impl PackageIdentity {
    /// Construct a new identity from a GUID and revision.
    #[must_use]
    pub const fn new(id: Uuid, revision: u32) -> Self {
        Self { id, revision }
    }

    fn id_halves(&self) -> (u64, u64) {
        self.id.as_u64_pair()
    }

    /// Compute the stable, opaque store key for this identity within a partition.
    ///
    /// The key is the SHA-512 digest of `"<partition>-<id>-<rev>"`, matching the
    /// `OpenId` scheme used by the metadata store.
    #[must_use]
    pub fn open_id(&self, partition: &str) -> OpenId {
        let input = format!("{partition}-{}-{}", self.id, self.revision);
        let digest = Sha512::digest(input.as_bytes());
        OpenId(digest.into())
    }
}

impl PartialOrd for PackageIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        let (high, low) = self.id_halves();
        let (other_high, other_low) = other.id_halves();
        high.cmp(&other_high)
            .then(low.cmp(&other_low))
            .then(self.revision.cmp(&other.revision))
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.revision)
    }
}

/// Stable, opaque, content-addressed key used to locate a package in a store.
///
/// Deliberately not `Copy`-free of its bytes: callers should treat this as an
/// opaque blob, never reconstruct it by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpenId([u8; 64]);

impl OpenId {
    /// Render the key as lowercase hex, suitable for use as a filesystem path segment.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for OpenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(high: u128, rev: u32) -> PackageIdentity {
        PackageIdentity::new(Uuid::from_u128(high), rev)
    }

    #[test]
    fn equality_requires_both_parts() {
        assert_eq!(id(1, 2), id(1, 2));
        assert_ne!(id(1, 2), id(1, 3));
        assert_ne!(id(1, 2), id(2, 2));
    }

    #[test]
    fn ordering_is_lexicographic_with_revision_last() {
        assert!(id(1, 5) < id(2, 0));
        assert!(id(1, 0) < id(1, 1));
        assert_eq!(id(1, 1).cmp(&id(1, 1)), Ordering::Equal);
    }

    #[test]
    fn ordering_is_a_total_order() {
        let mut items = vec![id(2, 0), id(1, 5), id(1, 0), id(3, 1)];
        items.sort();
        assert_eq!(items, vec![id(1, 0), id(1, 5), id(2, 0), id(3, 1)]);
    }

    #[test]
    fn open_id_is_stable_across_calls() {
        let a = id(42, 7).open_id("updates");
        let b = id(42, 7).open_id("updates");
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 128);
    }

    #[test]
    fn open_id_differs_by_partition() {
        let update_key = id(42, 7).open_id("updates");
        let category_key = id(42, 7).open_id("categories");
        assert_ne!(update_key, category_key);
    }

    #[test]
    fn serialize_round_trips() {
        let original = id(9_876_543_210, 3);
        let json = serde_json::to_string(&original).expect("serialize");
        let parsed: PackageIdentity = serde_json::from_str(&json).expect("parse");
        assert_eq!(original, parsed);
    }
}
