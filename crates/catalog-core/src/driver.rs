//! Driver-specific metadata carried by `DriverUpdate` variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single hardware-ID/version/rank tuple published by a driver update.
///
/// One `DriverUpdate` can carry several of these (one per supported device).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverMetadataEntry {
    /// Plug-and-play hardware ID this entry matches, most specific first.
    pub hardware_id: String,
    /// Optional compatible ID fallback match.
    pub compatible_id: Option<String>,
    /// Optional computer hardware ID this driver is restricted to.
    pub computer_hardware_id: Option<String>,
    /// Raw rank word `0xSSGGTHHH`; `feature_score()` extracts the `GG` byte.
    pub rank: u32,
    /// Driver version as a 4-tuple, compared lexicographically.
    pub version: (u16, u16, u16, u16),
    /// Driver publication date.
    pub date: DateTime<Utc>,
    /// Driver class (e.g. "Net", "Display").
    pub class: String,
    /// Publisher/provider name.
    pub provider: String,
}

impl DriverMetadataEntry {
    /// Extract the feature score (the `GG` nibble pair) from the rank word.
    ///
    /// The rank word is laid out `0xSSGGTHHH`: `SS` is a severity byte, `GG`
    /// is the feature score, `T` and `HHH` are reserved/historical fields we
    /// do not interpret.
    #[must_use]
    pub const fn feature_score(&self) -> u8 {
        ((self.rank >> 20) & 0xFF) as u8
    }
}
