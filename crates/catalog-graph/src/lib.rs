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

//! Prerequisite graph, applicability, and category resolution.
//!
//! Prerequisite/supersedence edges reference identities, not objects: the
//! graph is built by index lookup over a GUID arena rather than back-pointers
//! on the `Update` values themselves, so loading order never matters and
//! cycles (impossible by protocol, but not assumed) can't cause unbounded
//! recursion. Construction and closure walks are iterative.

use std::collections::{HashMap, HashSet};

use catalog_core::identity::PackageIdentity;
use catalog_core::prerequisite::Prerequisite;
use catalog_core::update::Update;
use uuid::Uuid;

/// In-memory directed graph of prerequisite edges (prerequisite -> dependent).
///
/// Built once from a batch of updates and queried repeatedly; rebuilding is
/// the caller's responsibility when the underlying store changes (the store
/// owns persistence, this is a derived, rebuildable view).
#[derive(Debug, Clone, Default)]
pub struct PrerequisiteGraph {
    /// Dependent identity (GUID) -> its prerequisite list.
    prerequisites_of: HashMap<Uuid, Vec<Prerequisite>>,
    /// Prerequisite identity (GUID) -> set of GUIDs that depend on it.
    dependents_of: HashMap<Uuid, HashSet<Uuid>>,
    /// Every identity observed, whether or not it carries prerequisites.
    all_ids: HashSet<Uuid>,
}

impl PrerequisiteGraph {
    /// Build a graph from a batch of updates.
    ///
    /// Every Simple prerequisite, and every member of an `AtLeastOne`
    /// prerequisite, becomes a predecessor edge into the owning update.
    #[must_use]
    pub fn build<'a>(updates: impl IntoIterator<Item = &'a Update>) -> Self {
        let mut graph = Self::default();
        for update in updates {
            let id = update.identity().id;
            graph.all_ids.insert(id);
            let Some(prereqs) = update.prerequisites() else {
                continue;
            };
            graph.prerequisites_of.insert(id, prereqs.to_vec());
            for prereq in prereqs {
                for member in prereq.members() {
                    graph.all_ids.insert(member.id);
                    graph.dependents_of.entry(member.id).or_default().insert(id);
                }
            }
        }
        graph
    }

    /// Updates with no recorded prerequisites.
    #[must_use]
    pub fn roots(&self) -> Vec<Uuid> {
        self.all_ids
            .iter()
            .copied()
            .filter(|id| self.prerequisites_of.get(id).is_none_or(Vec::is_empty))
            .collect()
    }

    /// Updates that are a prerequisite of at least one other update.
    #[must_use]
    pub fn non_leaf(&self) -> Vec<Uuid> {
        self.dependents_of
            .iter()
            .filter(|(_, dependents)| !dependents.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Updates with at least one prerequisite and no dependents.
    #[must_use]
    pub fn leaf(&self) -> Vec<Uuid> {
        self.all_ids
            .iter()
            .copied()
            .filter(|id| {
                let has_prereqs = self.prerequisites_of.get(id).is_some_and(|p| !p.is_empty());
                let has_dependents = self.dependents_of.get(id).is_some_and(|d| !d.is_empty());
                has_prereqs && !has_dependents
            })
            .collect()
    }

    /// Whether `id` is applicable given the installed identity set `installed`.
    ///
    /// True iff every `Simple` prerequisite's target is installed and every
    /// `AtLeastOne` prerequisite has at least one installed member. An
    /// identity with no recorded prerequisites is always applicable.
    #[must_use]
    pub fn is_applicable(&self, id: Uuid, installed: &HashSet<Uuid>) -> bool {
        self.prerequisites_of
            .get(&id)
            .is_none_or(|prereqs| prereqs.iter().all(|p| p.is_satisfied_by(installed)))
    }

    /// Resolve category GUIDs referenced by `id`'s `IsCategory` `AtLeastOne`
    /// prerequisites, keeping only members present in `known_categories`.
    ///
    /// Mirrors §4.3: a Software/Driver update's `ProductIds`/`ClassificationIds`
    /// are derived, not stored directly, by scanning category prerequisites.
    #[must_use]
    pub fn resolve_categories(&self, id: Uuid, known_categories: &HashSet<Uuid>) -> Vec<Uuid> {
        let Some(prereqs) = self.prerequisites_of.get(&id) else {
            return Vec::new();
        };
        let mut resolved = Vec::new();
        for prereq in prereqs {
            if !prereq.is_category() {
                continue;
            }
            for member in prereq.members() {
                if known_categories.contains(&member.id) && !resolved.contains(&member.id) {
                    resolved.push(member.id);
                }
            }
        }
        resolved
    }

    /// Direct prerequisite identities recorded for `id` (Simple and every
    /// `AtLeastOne` member), deduplicated.
    #[must_use]
    pub fn prerequisite_ids(&self, id: Uuid) -> Vec<PackageIdentity> {
        let Some(prereqs) = self.prerequisites_of.get(&id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for prereq in prereqs {
            for member in prereq.members() {
                if seen.insert(member) {
                    out.push(member);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::update::UpdateHeader;

    fn header(n: u128) -> UpdateHeader {
        UpdateHeader {
            identity: PackageIdentity::new(Uuid::from_u128(n), 1),
            title: format!("u{n}"),
            description: None,
        }
    }

    fn software(n: u128, prereqs: Vec<Prerequisite>) -> Update {
        Update::SoftwareUpdate {
            header: header(n),
            data: catalog_core::update::SoftwareUpdateData {
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

    fn simple(n: u128) -> Prerequisite {
        Prerequisite::Simple {
            target: PackageIdentity::new(Uuid::from_u128(n), 1),
        }
    }

    #[test]
    fn root_has_no_prerequisites() {
        let updates = vec![software(1, vec![])];
        let graph = PrerequisiteGraph::build(&updates);
        assert_eq!(graph.roots(), vec![Uuid::from_u128(1)]);
        assert!(graph.leaf().is_empty());
    }

    #[test]
    fn prerequisite_becomes_non_leaf_and_dependent_becomes_leaf() {
        let updates = vec![software(1, vec![]), software(2, vec![simple(1)])];
        let graph = PrerequisiteGraph::build(&updates);
        assert_eq!(graph.non_leaf(), vec![Uuid::from_u128(1)]);
        assert_eq!(graph.leaf(), vec![Uuid::from_u128(2)]);
    }

    #[test]
    fn applicability_requires_simple_and_any_at_least_one() {
        let prereqs = vec![
            simple(1),
            Prerequisite::AtLeastOne {
                simples: vec![
                    PackageIdentity::new(Uuid::from_u128(2), 1),
                    PackageIdentity::new(Uuid::from_u128(3), 1),
                ],
                is_category: false,
            },
        ];
        let updates = vec![software(10, prereqs)];
        let graph = PrerequisiteGraph::build(&updates);
        let id = Uuid::from_u128(10);

        let mut installed = HashSet::new();
        assert!(!graph.is_applicable(id, &installed));

        installed.insert(Uuid::from_u128(1));
        assert!(!graph.is_applicable(id, &installed), "at-least-one unmet");

        installed.insert(Uuid::from_u128(3));
        assert!(graph.is_applicable(id, &installed));
    }

    #[test]
    fn no_prerequisites_is_always_applicable() {
        let updates = vec![software(1, vec![])];
        let graph = PrerequisiteGraph::build(&updates);
        assert!(graph.is_applicable(Uuid::from_u128(1), &HashSet::new()));
    }

    #[test]
    fn category_resolution_filters_by_known_set() {
        let product_a = Uuid::from_u128(100);
        let product_b = Uuid::from_u128(101);
        let prereqs = vec![Prerequisite::AtLeastOne {
            simples: vec![
                PackageIdentity::new(product_a, 1),
                PackageIdentity::new(product_b, 1),
            ],
            is_category: true,
        }];
        let updates = vec![software(1, prereqs)];
        let graph = PrerequisiteGraph::build(&updates);

        let mut known = HashSet::new();
        known.insert(product_a);
        let resolved = graph.resolve_categories(Uuid::from_u128(1), &known);
        assert_eq!(resolved, vec![product_a]);
    }

    #[test]
    fn category_resolution_ignores_non_category_prerequisites() {
        let prereqs = vec![simple(5)];
        let updates = vec![software(1, prereqs)];
        let graph = PrerequisiteGraph::build(&updates);
        let mut known = HashSet::new();
        known.insert(Uuid::from_u128(5));
        assert!(graph.resolve_categories(Uuid::from_u128(1), &known).is_empty());
    }
}
