//! `SyncUpdates` and `GetExtendedUpdateInfo` response shapes (§4.5).

use catalog_core::identity::PackageIdentity;

/// Deployment action attached to an offered update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentAction {
    /// Roots and non-leaves: the client evaluates applicability but does not
    /// install yet.
    Evaluate,
    /// A bundle parent, or a non-bundled leaf: install directly.
    Install,
    /// A member of an offered bundle.
    Bundle,
}

/// A single update offered by `SyncUpdates`.
#[derive(Debug, Clone)]
pub struct OfferedUpdate {
    /// Identity of the offered update.
    pub identity: PackageIdentity,
    /// Revision index assigned for this session; used by
    /// `GetExtendedUpdateInfo` to look the update back up.
    pub revision_index: u32,
    /// Deployment action the client should record.
    pub action: DeploymentAction,
    /// Core XML fragment (§4.2) for this update.
    pub core_fragment: String,
}

/// Response to `SyncUpdates`.
#[derive(Debug, Clone, Default)]
pub struct SyncUpdatesResponse {
    /// Updates offered this call, at most the per-response cap.
    pub offered: Vec<OfferedUpdate>,
    /// Whether more applicable candidates exist than fit the cap.
    pub truncated: bool,
    /// Fresh opaque session cookie; must be echoed on the next call.
    pub cookie: String,
    /// Candidates that matched but were withheld by the approval policy,
    /// reported for auditing only.
    pub denied_for_audit: Vec<PackageIdentity>,
}

/// A single resolved file location, keyed by its strongest digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    /// Lowercase hex of the file's strongest digest.
    pub digest_hex: String,
    /// URL the client should fetch the file from.
    pub url: String,
}

/// Extended info resolved for a single revision index.
#[derive(Debug, Clone)]
pub struct ExtendedInfoRecord {
    /// Revision index this record resolves.
    pub revision_index: u32,
    /// Identity the index maps to.
    pub identity: PackageIdentity,
    /// Extended XML fragment (§4.2).
    pub extended_fragment: String,
    /// Localized XML fragment for the requested locales, empty if none match.
    pub localized_fragment: String,
}

/// Response to `GetExtendedUpdateInfo`.
#[derive(Debug, Clone, Default)]
pub struct ExtendedInfoResponse {
    /// One record per requested, resolvable revision index.
    pub records: Vec<ExtendedInfoRecord>,
    /// Every file location referenced by `records`, deduplicated by digest.
    pub file_locations: Vec<FileLocation>,
}
