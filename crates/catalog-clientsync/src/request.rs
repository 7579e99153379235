//! `SyncUpdates` and `GetExtendedUpdateInfo` request shapes (§4.5).

use std::collections::HashSet;

use uuid::Uuid;

/// One physical device reported by the client for the driver path, carrying
/// its hardware IDs in most-specific-first order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRequest {
    /// Hardware IDs for this device, most-specific first.
    pub hardware_ids: Vec<String>,
}

/// A `SyncUpdates` request.
#[derive(Debug, Clone, Default)]
pub struct SyncUpdatesRequest {
    /// GUIDs of non-leaf updates the client already has installed (`I`).
    pub installed_non_leaf_ids: HashSet<Uuid>,
    /// GUIDs of every other update the client already has cached (`C`).
    pub other_cached_ids: HashSet<Uuid>,
    /// When set, run the driver path instead of the layered software path.
    pub skip_software_sync: bool,
    /// When set, the driver path is skipped entirely (no-op response).
    pub skip_drivers_sync: bool,
    /// Devices reported for the driver path, one entry per physical device.
    pub devices: Vec<DeviceRequest>,
    /// The computer's own hardware IDs, used to satisfy a driver's
    /// `ComputerHardwareId` constraint.
    pub computer_hardware_ids: Vec<String>,
    /// Driver update GUIDs the client already has cached; excluded from the
    /// driver path regardless of rank.
    pub cached_driver_ids: HashSet<Uuid>,
    /// Opaque cookie from a previous response, if any. Absent on the first
    /// call in a session.
    pub cookie: Option<String>,
}

/// A `GetExtendedUpdateInfo` request: the session cookie plus the revision
/// indexes a prior `SyncUpdates` response assigned.
#[derive(Debug, Clone)]
pub struct ExtendedUpdateInfoRequest {
    /// Session cookie a prior `SyncUpdates` call returned.
    pub cookie: String,
    /// Revision indexes to resolve, as assigned by that call.
    pub revision_indexes: Vec<u32>,
    /// Client locales to resolve localized fragments for, most preferred
    /// first.
    pub languages: Vec<String>,
}
