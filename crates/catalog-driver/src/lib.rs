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

//! Driver matcher: ranks a driver candidate against a device's
//! hardware-ID list, its computer-hardware-ID list, and its installed
//! prerequisites.

use std::cmp::Reverse;
use std::collections::HashSet;

use catalog_core::identity::PackageIdentity;
use catalog_core::update::Update;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Sentinel used in place of "no computer-hardware-id constraint" so the
/// match/no-match cases share a single totally-ordered index space.
const NO_CONSTRAINT: usize = usize::MAX;

/// Result of matching one driver candidate against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareMatch {
    /// Index of the device hardware ID that matched, in request order
    /// (most-specific first).
    pub device_hwid_index: usize,
    /// Index of the computer hardware ID the candidate requires, if any.
    pub computer_hwid_index: Option<usize>,
    /// Feature score extracted from the matched entry's rank word.
    pub feature_score: u8,
    /// Publication date of the matched entry.
    pub date: DateTime<Utc>,
    /// Driver version of the matched entry.
    pub version: (u16, u16, u16, u16),
}

impl HardwareMatch {
    /// Ranking key used to pick the winner among competing candidates: lower
    /// sorts first. Ordered `(device-hwid index, computer-hwid index or
    /// none, feature score, -date, -version)` per §4.4 step 4.
    fn rank_key(self) -> (usize, usize, u8, Reverse<DateTime<Utc>>, Reverse<(u16, u16, u16, u16)>) {
        (
            self.device_hwid_index,
            self.computer_hwid_index.unwrap_or(NO_CONSTRAINT),
            self.feature_score,
            Reverse(self.date),
            Reverse(self.version),
        )
    }

    /// Comparison key used for installed-driver suppression: `(computer-hwid
    /// index, feature score, device-hwid index, -date, -version)` per §4.4's
    /// "installed-driver comparison" rule. Note the field order differs from
    /// [`Self::rank_key`] — this mirrors a documented legacy quirk in the upstream ranking rules.
    fn installed_comparison_key(
        self,
    ) -> (usize, u8, usize, Reverse<DateTime<Utc>>, Reverse<(u16, u16, u16, u16)>) {
        (
            self.computer_hwid_index.unwrap_or(NO_CONSTRAINT),
            self.feature_score,
            self.device_hwid_index,
            Reverse(self.date),
            Reverse(self.version),
        )
    }
}

/// Match a single driver candidate against a request, or reject it.
///
/// Returns `None` if the candidate is inapplicable under `installed`, has no
/// entry matching any requested device hardware ID, or constrains a
/// computer-hardware-id the request does not carry.
#[must_use]
pub fn match_candidate(
    update: &Update,
    device_hardware_ids: &[String],
    computer_hardware_ids: &[String],
    installed: &HashSet<Uuid>,
) -> Option<HardwareMatch> {
    let prereqs = update.prerequisites()?;
    if !prereqs.iter().all(|p| p.is_satisfied_by(installed)) {
        return None;
    }
    let entries = update.driver_metadata()?;

    let mut best: Option<HardwareMatch> = None;
    for (device_index, device_id) in device_hardware_ids.iter().enumerate() {
        for entry in entries {
            let matches = entry.hardware_id == *device_id
                || entry.compatible_id.as_deref() == Some(device_id.as_str());
            if !matches {
                continue;
            }
            let computer_hwid_index = match &entry.computer_hardware_id {
                None => None,
                Some(required) => {
                    let position = computer_hardware_ids.iter().position(|c| c == required)?;
                    Some(position)
                }
            };
            let candidate = HardwareMatch {
                device_hwid_index: device_index,
                computer_hwid_index,
                feature_score: entry.feature_score(),
                date: entry.date,
                version: entry.version,
            };
            best = Some(match best {
                Some(current) if current.rank_key() <= candidate.rank_key() => current,
                _ => candidate,
            });
        }
        // Device IDs are most-specific first: once any entry matched at this
        // index, stop — a later, less-specific index cannot win (§4.4 step 2
        // picks the *first* device hardware ID that appears at all).
        if best.is_some() {
            break;
        }
    }
    best
}

/// Pick the winning candidate among several matches. Ties break on identity.
#[must_use]
pub fn best_match(
    candidates: impl IntoIterator<Item = (PackageIdentity, HardwareMatch)>,
) -> Option<(PackageIdentity, HardwareMatch)> {
    candidates.into_iter().min_by(|(id_a, a), (id_b, b)| {
        a.rank_key().cmp(&b.rank_key()).then(id_a.cmp(id_b))
    })
}

/// Whether an already-installed driver should suppress offering `candidate`.
///
/// Per §4.4: suppressed iff the installed driver's comparison key sorts at
/// or before the candidate's.
#[must_use]
pub fn should_suppress_installed(installed: HardwareMatch, candidate: HardwareMatch) -> bool {
    installed.installed_comparison_key() <= candidate.installed_comparison_key()
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::driver::DriverMetadataEntry;
    use catalog_core::prerequisite::Prerequisite;
    use catalog_core::update::{DriverUpdateData, UpdateHeader};

    fn entry(hardware_id: &str, rank: u32, date: DateTime<Utc>) -> DriverMetadataEntry {
        DriverMetadataEntry {
            hardware_id: hardware_id.into(),
            compatible_id: None,
            computer_hardware_id: None,
            rank,
            version: (1, 0, 0, 0),
            date,
            class: "Net".into(),
            provider: "Contoso".into(),
        }
    }

    fn driver_update(n: u128, prereqs: Vec<Prerequisite>, entries: Vec<DriverMetadataEntry>) -> Update {
        Update::DriverUpdate {
            header: UpdateHeader {
                identity: PackageIdentity::new(Uuid::from_u128(n), 1),
                title: format!("driver-{n}"),
                description: None,
            },
            data: DriverUpdateData {
                files: vec![],
                prerequisites: prereqs,
                driver_metadata: entries,
                product_ids: vec![],
                classification_ids: vec![],
            },
        }
    }

    #[test]
    fn device_hwid_index_beats_feature_score() {
        let os_x = Uuid::from_u128(900);
        let mut installed = HashSet::new();
        installed.insert(os_x);
        let prereqs = vec![Prerequisite::Simple {
            target: PackageIdentity::new(os_x, 1),
        }];

        let now = Utc::now();
        let specific = driver_update(
            1,
            prereqs.clone(),
            vec![entry("PCI\\VEN_1&DEV_2", 0x0010_0000, now)],
        );
        let generic = driver_update(2, prereqs, vec![entry("PCI\\VEN_1", 0, now)]);

        let device_ids = vec!["PCI\\VEN_1&DEV_2".to_string(), "PCI\\VEN_1".to_string()];
        let m1 = match_candidate(&specific, &device_ids, &[], &installed).expect("match");
        let m2 = match_candidate(&generic, &device_ids, &[], &installed).expect("match");

        assert_eq!(m1.device_hwid_index, 0);
        assert_eq!(m2.device_hwid_index, 1);

        let winner = best_match([
            (specific.identity(), m1),
            (generic.identity(), m2),
        ])
        .expect("a winner");
        assert_eq!(winner.0, specific.identity());
    }

    #[test]
    fn reject_when_no_device_hwid_matches() {
        let update = driver_update(1, vec![], vec![entry("PCI\\VEN_9", 0, Utc::now())]);
        assert!(match_candidate(&update, &["PCI\\VEN_1".into()], &[], &HashSet::new()).is_none());
    }

    #[test]
    fn reject_when_computer_hwid_constraint_unmet() {
        let mut entry = entry("PCI\\VEN_1", 0, Utc::now());
        entry.computer_hardware_id = Some("COMP\\X".into());
        let update = driver_update(1, vec![], vec![entry]);
        assert!(match_candidate(&update, &["PCI\\VEN_1".into()], &[], &HashSet::new()).is_none());
        let matched = match_candidate(
            &update,
            &["PCI\\VEN_1".into()],
            &["COMP\\X".into()],
            &HashSet::new(),
        );
        assert!(matched.is_some());
    }

    #[test]
    fn reject_when_inapplicable() {
        let prereqs = vec![Prerequisite::Simple {
            target: PackageIdentity::new(Uuid::from_u128(42), 1),
        }];
        let update = driver_update(1, prereqs, vec![entry("PCI\\VEN_1", 0, Utc::now())]);
        assert!(match_candidate(&update, &["PCI\\VEN_1".into()], &[], &HashSet::new()).is_none());
    }

    #[test]
    fn installed_suppresses_equal_or_worse_candidate() {
        let now = Utc::now();
        let installed = HardwareMatch {
            device_hwid_index: 0,
            computer_hwid_index: None,
            feature_score: 10,
            date: now,
            version: (2, 0, 0, 0),
        };
        let worse_candidate = HardwareMatch {
            device_hwid_index: 0,
            computer_hwid_index: None,
            feature_score: 10,
            date: now,
            version: (1, 0, 0, 0),
        };
        assert!(should_suppress_installed(installed, worse_candidate));

        let better_candidate = HardwareMatch {
            device_hwid_index: 0,
            computer_hwid_index: None,
            feature_score: 5,
            date: now,
            version: (1, 0, 0, 0),
        };
        assert!(!should_suppress_installed(installed, better_candidate));
    }
}
