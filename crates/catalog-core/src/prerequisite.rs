//! Prerequisite edges between updates.

use serde::{Deserialize, Serialize};

use crate::identity::PackageIdentity;

/// A single prerequisite attached to an update.
///
/// Prerequisites reference identities, not objects: the graph is built by
/// index lookup (see `catalog-graph`) rather than by back-pointers, which
/// keeps loading order-independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prerequisite {
    /// A single required identity.
    Simple {
        /// The required identity.
        target: PackageIdentity,
    },
    /// At least one of a set of identities must be satisfied.
    AtLeastOne {
        /// Candidate identities; satisfying any one suffices.
        simples: Vec<PackageIdentity>,
        /// Whether this prerequisite encodes a category membership
        /// (`ProductIds`/`ClassificationIds` resolution) rather than a
        /// true applicability dependency.
        #[serde(default)]
        is_category: bool,
    },
}

impl Prerequisite {
    /// Every identity mentioned by this prerequisite, Simple or AtLeastOne.
    #[must_use]
    pub fn members(&self) -> Vec<PackageIdentity> {
        match self {
            Self::Simple { target } => vec![*target],
            Self::AtLeastOne { simples, .. } => simples.clone(),
        }
    }

    /// Whether this prerequisite is satisfied by the given installed set.
    ///
    /// A `Simple` prerequisite is satisfied iff its target is installed; an
    /// `AtLeastOne` prerequisite is satisfied iff any of its members is.
    #[must_use]
    pub fn is_satisfied_by(&self, installed: &std::collections::HashSet<uuid::Uuid>) -> bool {
        match self {
            Self::Simple { target } => installed.contains(&target.id),
            Self::AtLeastOne { simples, .. } => {
                simples.iter().any(|member| installed.contains(&member.id))
            }
        }
    }

    /// Whether this prerequisite is flagged as a category reference.
    #[must_use]
    pub const fn is_category(&self) -> bool {
        matches!(self, Self::AtLeastOne { is_category: true, .. })
    }
}
