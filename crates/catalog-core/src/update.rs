//! The tagged `Update` variant and its capability predicates.
//!
//! Shared fields (identity, title, XML reference) live on `UpdateHeader`;
//! per-variant payloads are only reachable through explicit predicates
//! (`files`, `prerequisites`, ...) rather than through inheritance, per the
//! polymorphic-update-type design note.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::driver::DriverMetadataEntry;
use crate::file::UpdateFile;
use crate::identity::PackageIdentity;
use crate::prerequisite::Prerequisite;

/// Fields shared by every update variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateHeader {
    /// Identity of this update revision.
    pub identity: PackageIdentity,
    /// Update title (language `en`).
    pub title: String,
    /// Optional long-form description.
    pub description: Option<String>,
}

/// Payload carried by `SoftwareUpdate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareUpdateData {
    /// Files delivered by this update.
    pub files: Vec<UpdateFile>,
    /// Prerequisites gating applicability.
    pub prerequisites: Vec<Prerequisite>,
    /// Identities this update supersedes.
    pub superseded: Vec<PackageIdentity>,
    /// Identities this update is bundled with as a member (`BundledWithUpdates`).
    pub bundled_with: Vec<PackageIdentity>,
    /// Identities bundled as members of this update (`BundledUpdates`).
    pub bundled_members: Vec<PackageIdentity>,
    /// Optional knowledge-base article ID.
    pub kb_article_id: Option<String>,
    /// Optional support URL.
    pub support_url: Option<String>,
    /// Whether this update is an OS-upgrade package.
    pub os_upgrade: bool,
    /// Resolved product category GUIDs.
    pub product_ids: Vec<Uuid>,
    /// Resolved classification category GUIDs.
    pub classification_ids: Vec<Uuid>,
}

/// Payload carried by `DriverUpdate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverUpdateData {
    /// Files delivered by this update.
    pub files: Vec<UpdateFile>,
    /// Prerequisites gating applicability.
    pub prerequisites: Vec<Prerequisite>,
    /// Per-hardware-ID driver metadata entries.
    pub driver_metadata: Vec<DriverMetadataEntry>,
    /// Resolved product category GUIDs.
    pub product_ids: Vec<Uuid>,
    /// Resolved classification category GUIDs.
    pub classification_ids: Vec<Uuid>,
}

/// A single update, tagged by variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "update_type", rename_all = "snake_case")]
pub enum Update {
    /// Applicability probe; no files, no classification.
    Detectoid {
        /// Shared header.
        header: UpdateHeader,
    },
    /// Category label for updates.
    Classification {
        /// Shared header.
        header: UpdateHeader,
    },
    /// Category label for products.
    Product {
        /// Shared header.
        header: UpdateHeader,
    },
    /// A software update with files, prerequisites, and supersedence.
    SoftwareUpdate {
        /// Shared header.
        header: UpdateHeader,
        /// Variant-specific payload.
        data: SoftwareUpdateData,
    },
    /// A driver update with files, prerequisites, and driver metadata.
    DriverUpdate {
        /// Shared header.
        header: UpdateHeader,
        /// Variant-specific payload.
        data: DriverUpdateData,
    },
}

impl Update {
    /// Shared header common to every variant.
    #[must_use]
    pub const fn header(&self) -> &UpdateHeader {
        match self {
            Self::Detectoid { header }
            | Self::Classification { header }
            | Self::Product { header }
            | Self::SoftwareUpdate { header, .. }
            | Self::DriverUpdate { header, .. } => header,
        }
    }

    /// Identity of this update.
    #[must_use]
    pub const fn identity(&self) -> PackageIdentity {
        self.header().identity
    }

    /// Whether this update acts as a category label (Product/Classification).
    #[must_use]
    pub const fn is_category(&self) -> bool {
        matches!(self, Self::Product { .. } | Self::Classification { .. })
    }

    /// `HasFiles`: files carried by software/driver updates.
    #[must_use]
    pub fn files(&self) -> Option<&[UpdateFile]> {
        match self {
            Self::SoftwareUpdate { data, .. } => Some(&data.files),
            Self::DriverUpdate { data, .. } => Some(&data.files),
            Self::Detectoid { .. } | Self::Classification { .. } | Self::Product { .. } => None,
        }
    }

    /// `HasPrerequisites`: prerequisites gating applicability.
    #[must_use]
    pub fn prerequisites(&self) -> Option<&[Prerequisite]> {
        match self {
            Self::SoftwareUpdate { data, .. } => Some(&data.prerequisites),
            Self::DriverUpdate { data, .. } => Some(&data.prerequisites),
            Self::Detectoid { .. } | Self::Classification { .. } | Self::Product { .. } => None,
        }
    }

    /// `HasClassification`: resolved classification category GUIDs.
    #[must_use]
    pub fn classification_ids(&self) -> Option<&[Uuid]> {
        match self {
            Self::SoftwareUpdate { data, .. } => Some(&data.classification_ids),
            Self::DriverUpdate { data, .. } => Some(&data.classification_ids),
            Self::Detectoid { .. } | Self::Classification { .. } | Self::Product { .. } => None,
        }
    }

    /// `HasProduct`: resolved product category GUIDs.
    #[must_use]
    pub fn product_ids(&self) -> Option<&[Uuid]> {
        match self {
            Self::SoftwareUpdate { data, .. } => Some(&data.product_ids),
            Self::DriverUpdate { data, .. } => Some(&data.product_ids),
            Self::Detectoid { .. } | Self::Classification { .. } | Self::Product { .. } => None,
        }
    }

    /// `HasBundles`: members bundled under this update, if any.
    #[must_use]
    pub fn bundled_members(&self) -> Option<&[PackageIdentity]> {
        match self {
            Self::SoftwareUpdate { data, .. } => Some(&data.bundled_members),
            _ => None,
        }
    }

    /// `HasSupersedence`: identities this update supersedes.
    #[must_use]
    pub fn superseded(&self) -> Option<&[PackageIdentity]> {
        match self {
            Self::SoftwareUpdate { data, .. } => Some(&data.superseded),
            _ => None,
        }
    }

    /// `HasDrivers`: per-hardware-ID driver metadata.
    #[must_use]
    pub fn driver_metadata(&self) -> Option<&[DriverMetadataEntry]> {
        match self {
            Self::DriverUpdate { data, .. } => Some(&data.driver_metadata),
            _ => None,
        }
    }

    /// Whether this update is itself a bundle (has at least one member).
    #[must_use]
    pub fn is_bundle(&self) -> bool {
        self.bundled_members().is_some_and(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(n: u128) -> UpdateHeader {
        UpdateHeader {
            identity: PackageIdentity::new(Uuid::from_u128(n), 1),
            title: format!("update-{n}"),
            description: None,
        }
    }

    #[test]
    fn detectoid_has_no_capabilities() {
        let update = Update::Detectoid { header: header(1) };
        assert!(update.files().is_none());
        assert!(update.prerequisites().is_none());
        assert!(update.classification_ids().is_none());
        assert!(!update.is_bundle());
    }

    #[test]
    fn software_update_exposes_files_and_bundles() {
        let update = Update::SoftwareUpdate {
            header: header(2),
            data: SoftwareUpdateData {
                files: vec![],
                prerequisites: vec![],
                superseded: vec![],
                bundled_with: vec![],
                bundled_members: vec![PackageIdentity::new(Uuid::from_u128(3), 1)],
                kb_article_id: Some("KB123".into()),
                support_url: None,
                os_upgrade: false,
                product_ids: vec![],
                classification_ids: vec![],
            },
        };
        assert!(update.files().is_some());
        assert!(update.is_bundle());
        assert!(update.driver_metadata().is_none());
    }

    #[test]
    fn category_predicate_matches_product_and_classification_only() {
        assert!(Update::Product { header: header(1) }.is_category());
        assert!(Update::Classification { header: header(1) }.is_category());
        assert!(!Update::Detectoid { header: header(1) }.is_category());
    }
}
