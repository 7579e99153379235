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

//! Filters and bundle closure expansion over a catalog of updates.
//!
//! This crate is deliberately store-agnostic: it filters and expands over
//! anything implementing [`CatalogSource`], so the in-memory store, a test
//! fixture, or a future alternate backend can all be queried the same way.

use std::collections::HashSet;

use catalog_core::identity::PackageIdentity;
use catalog_core::update::Update;
use uuid::Uuid;

/// Read-only view over a catalog of updates, keyed by identity GUID.
///
/// Implementations are expected to hold at most one revision per GUID (the
/// latest), matching how the store surfaces updates for querying.
pub trait CatalogSource {
    /// Every update currently held, in no particular order.
    fn all(&self) -> Box<dyn Iterator<Item = &Update> + '_>;

    /// Look up an update by its GUID, regardless of revision.
    fn get(&self, id: Uuid) -> Option<&Update>;
}

/// A blanket implementation over a plain slice, mostly useful for tests.
impl CatalogSource for [Update] {
    fn all(&self) -> Box<dyn Iterator<Item = &Update> + '_> {
        Box::new(self.iter())
    }

    fn get(&self, id: Uuid) -> Option<&Update> {
        self.iter().find(|update| update.identity().id == id)
    }
}

/// Selection criteria applied over a catalog.
///
/// Every populated field narrows the result set further (criteria are
/// conjunctive); an entirely empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Match updates tagged under any of these product category GUIDs.
    pub product_ids: Vec<Uuid>,
    /// Match updates tagged under any of these classification category GUIDs.
    pub classification_ids: Vec<Uuid>,
    /// Match updates whose GUID is in this exact set.
    pub update_ids: Vec<Uuid>,
    /// Match updates whose title contains this substring (case-insensitive).
    pub title_contains: Option<String>,
    /// Match software updates carrying this KB article ID.
    pub kb_article_id: Option<String>,
    /// Match driver updates exposing metadata for any of these hardware IDs.
    pub hardware_ids: Vec<String>,
}

impl Filter {
    /// Whether `update` satisfies every populated criterion.
    #[must_use]
    pub fn matches(&self, update: &Update) -> bool {
        if !self.update_ids.is_empty() && !self.update_ids.contains(&update.identity().id) {
            return false;
        }
        if !self.product_ids.is_empty() {
            let ids = update.product_ids().unwrap_or_default();
            if !self.product_ids.iter().any(|wanted| ids.contains(wanted)) {
                return false;
            }
        }
        if !self.classification_ids.is_empty() {
            let ids = update.classification_ids().unwrap_or_default();
            if !self.classification_ids.iter().any(|wanted| ids.contains(wanted)) {
                return false;
            }
        }
        if let Some(needle) = &self.title_contains {
            let haystack = update.header().title.to_lowercase();
            if !haystack.contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(kb) = &self.kb_article_id {
            let matches_kb = matches!(
                update,
                Update::SoftwareUpdate { data, .. } if data.kb_article_id.as_deref() == Some(kb.as_str())
            );
            if !matches_kb {
                return false;
            }
        }
        if !self.hardware_ids.is_empty() {
            let has_match = update.driver_metadata().is_some_and(|entries| {
                entries
                    .iter()
                    .any(|entry| self.hardware_ids.contains(&entry.hardware_id))
            });
            if !has_match {
                return false;
            }
        }
        true
    }
}

/// Select every update in `source` matching `filter`.
#[must_use]
pub fn select<'a>(source: &'a (impl CatalogSource + ?Sized), filter: &Filter) -> Vec<&'a Update> {
    source.all().filter(|update| filter.matches(update)).collect()
}

/// Expand `selected` to include every bundled member transitively, so a
/// bundle parent is never returned without its members.
///
/// Members are appended before their parent in the output, matching the
/// ordering export and sync both require: a member must be describable
/// before anything that references it.
#[must_use]
pub fn expand_bundle_closure<'a>(
    source: &'a (impl CatalogSource + ?Sized),
    selected: Vec<&'a Update>,
) -> Vec<&'a Update> {
    let mut seen: HashSet<Uuid> = selected.iter().map(|update| update.identity().id).collect();
    let mut pending: Vec<&Update> = selected;
    let mut ordered: Vec<&Update> = Vec::new();

    while let Some(update) = pending.pop() {
        let members: Vec<PackageIdentity> = update
            .bundled_members()
            .map(<[PackageIdentity]>::to_vec)
            .unwrap_or_default();
        for member in members {
            if seen.insert(member.id) {
                if let Some(member_update) = source.get(member.id) {
                    pending.push(member_update);
                }
            }
        }
        ordered.push(update);
    }

    // `ordered` was built depth-first from the back of `pending`, so a
    // parent can land before members discovered after it; reversing puts
    // every member ahead of anything that references it.
    ordered.reverse();
    dedupe_keep_first(ordered)
}

fn dedupe_keep_first(items: Vec<&Update>) -> Vec<&Update> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|update| seen.insert(update.identity()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::file::UpdateFile;
    use catalog_core::prerequisite::Prerequisite;
    use catalog_core::update::{SoftwareUpdateData, UpdateHeader};
    use uuid::Uuid;

    fn header(n: u128, title: &str) -> UpdateHeader {
        UpdateHeader {
            identity: PackageIdentity::new(Uuid::from_u128(n), 1),
            title: title.to_string(),
            description: None,
        }
    }

    fn software(n: u128, title: &str, members: Vec<PackageIdentity>, kb: Option<&str>) -> Update {
        Update::SoftwareUpdate {
            header: header(n, title),
            data: SoftwareUpdateData {
                files: Vec::<UpdateFile>::new(),
                prerequisites: Vec::<Prerequisite>::new(),
                superseded: Vec::new(),
                bundled_with: Vec::new(),
                bundled_members: members,
                kb_article_id: kb.map(str::to_string),
                support_url: None,
                os_upgrade: false,
                product_ids: Vec::new(),
                classification_ids: Vec::new(),
            },
        }
    }

    #[test]
    fn filter_matches_by_title_case_insensitively() {
        let update = software(1, "Security Rollup", vec![], None);
        let filter = Filter {
            title_contains: Some("rollup".into()),
            ..Filter::default()
        };
        assert!(filter.matches(&update));
    }

    #[test]
    fn filter_matches_by_kb_article() {
        let update = software(1, "Fix", vec![], Some("KB999"));
        let filter = Filter {
            kb_article_id: Some("KB999".into()),
            ..Filter::default()
        };
        assert!(filter.matches(&update));
        let other = Filter {
            kb_article_id: Some("KB111".into()),
            ..Filter::default()
        };
        assert!(!other.matches(&update));
    }

    #[test]
    fn select_applies_filter_over_source() {
        let updates = vec![
            software(1, "Alpha", vec![], None),
            software(2, "Beta", vec![], None),
        ];
        let filter = Filter {
            title_contains: Some("Beta".into()),
            ..Filter::default()
        };
        let result = select(updates.as_slice(), &filter);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].header().title, "Beta");
    }

    #[test]
    fn bundle_closure_orders_members_before_parent() {
        let member = software(2, "Member", vec![], None);
        let parent = software(1, "Parent", vec![PackageIdentity::new(Uuid::from_u128(2), 1)], None);
        let updates = vec![parent.clone(), member.clone()];
        let selected = vec![updates.iter().find(|u| u.header().title == "Parent").unwrap()];
        let expanded = expand_bundle_closure(updates.as_slice(), selected);

        let titles: Vec<&str> = expanded.iter().map(|u| u.header().title.as_str()).collect();
        let member_pos = titles.iter().position(|t| *t == "Member").unwrap();
        let parent_pos = titles.iter().position(|t| *t == "Parent").unwrap();
        assert!(member_pos < parent_pos);
    }

    #[test]
    fn bundle_closure_is_transitive_and_deduplicated() {
        let leaf = software(3, "Leaf", vec![], None);
        let mid = software(2, "Mid", vec![PackageIdentity::new(Uuid::from_u128(3), 1)], None);
        let top = software(
            1,
            "Top",
            vec![PackageIdentity::new(Uuid::from_u128(2), 1), PackageIdentity::new(Uuid::from_u128(3), 1)],
            None,
        );
        let updates = vec![top.clone(), mid.clone(), leaf.clone()];
        let selected = vec![updates.iter().find(|u| u.header().title == "Top").unwrap()];
        let expanded = expand_bundle_closure(updates.as_slice(), selected);
        assert_eq!(expanded.len(), 3);
    }
}
