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

//! Shared HTTP DTOs for the downstream client-sync and content endpoints
//! (§6).
//!
//! These types are the JSON wire shapes the catalog API exposes; the
//! conversions to and from the typed domain values in `catalog-clientsync`
//! and `catalog-core` live here so the mapping stays a single source of
//! truth between the server and any future CLI or UI consumer.

use std::collections::HashSet;

use catalog_clientsync::{
    DeploymentAction, DeviceRequest, ExtendedInfoRecord, ExtendedInfoResponse,
    ExtendedUpdateInfoRequest, FileLocation, OfferedUpdate, SyncUpdatesRequest,
    SyncUpdatesResponse,
};
use catalog_config::ServiceConfig;
use catalog_core::identity::PackageIdentity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RFC9457-compatible problem document surfaced on validation/runtime errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    /// URI reference identifying the problem type.
    pub kind: String,
    /// Short, human-readable summary of the issue.
    pub title: String,
    /// HTTP status code associated with the error.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Detailed diagnostic message when available.
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Parameters that failed validation, if applicable.
    pub invalid_params: Option<Vec<ProblemInvalidParam>>,
}

/// Invalid parameter pointer surfaced alongside a [`ProblemDetails`] payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemInvalidParam {
    /// JSON Pointer to the offending field.
    pub pointer: String,
    /// Human-readable description of the validation failure.
    pub message: String,
}

/// Request body for the `SyncUpdates` downstream RPC.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncUpdatesRequestDto {
    /// GUIDs of non-leaf updates the client already has installed.
    #[serde(default)]
    pub installed_non_leaf_ids: Vec<Uuid>,
    /// GUIDs of every other update the client already has cached.
    #[serde(default)]
    pub other_cached_ids: Vec<Uuid>,
    /// When set, run the driver path instead of the layered software path.
    #[serde(default)]
    pub skip_software_sync: bool,
    /// When set, the driver path is skipped entirely (no-op response).
    #[serde(default)]
    pub skip_drivers_sync: bool,
    /// Devices reported for the driver path.
    #[serde(default)]
    pub devices: Vec<DeviceRequestDto>,
    /// The computer's own hardware IDs.
    #[serde(default)]
    pub computer_hardware_ids: Vec<String>,
    /// Driver update GUIDs the client already has cached.
    #[serde(default)]
    pub cached_driver_ids: Vec<Uuid>,
    /// Opaque cookie from a previous response, if any.
    #[serde(default)]
    pub cookie: Option<String>,
}

/// One physical device reported for the driver path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceRequestDto {
    /// Hardware IDs for this device, most-specific first.
    pub hardware_ids: Vec<String>,
}

impl From<SyncUpdatesRequestDto> for SyncUpdatesRequest {
    fn from(dto: SyncUpdatesRequestDto) -> Self {
        Self {
            installed_non_leaf_ids: dto.installed_non_leaf_ids.into_iter().collect(),
            other_cached_ids: dto.other_cached_ids.into_iter().collect(),
            skip_software_sync: dto.skip_software_sync,
            skip_drivers_sync: dto.skip_drivers_sync,
            devices: dto
                .devices
                .into_iter()
                .map(|d| DeviceRequest {
                    hardware_ids: d.hardware_ids,
                })
                .collect(),
            computer_hardware_ids: dto.computer_hardware_ids,
            cached_driver_ids: dto.cached_driver_ids.into_iter().collect::<HashSet<_>>(),
            cookie: dto.cookie,
        }
    }
}

/// Identity wire shape: GUID plus revision, matching [`PackageIdentity`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageIdentityDto {
    /// 128-bit update identifier.
    pub id: Uuid,
    /// Monotonically increasing revision.
    pub revision: u32,
}

impl From<PackageIdentity> for PackageIdentityDto {
    fn from(identity: PackageIdentity) -> Self {
        Self {
            id: identity.id,
            revision: identity.revision,
        }
    }
}

/// Deployment action attached to an offered update.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentActionDto {
    /// Evaluate applicability but do not install yet.
    Evaluate,
    /// Install directly.
    Install,
    /// Install as a member of an offered bundle.
    Bundle,
}

impl From<DeploymentAction> for DeploymentActionDto {
    fn from(action: DeploymentAction) -> Self {
        match action {
            DeploymentAction::Evaluate => Self::Evaluate,
            DeploymentAction::Install => Self::Install,
            DeploymentAction::Bundle => Self::Bundle,
        }
    }
}

/// A single update offered by `SyncUpdates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferedUpdateDto {
    /// Identity of the offered update.
    pub identity: PackageIdentityDto,
    /// Revision index assigned for this session.
    pub revision_index: u32,
    /// Deployment action the client should record.
    pub action: DeploymentActionDto,
    /// Core XML fragment (§4.2) for this update.
    pub core_fragment: String,
}

impl From<OfferedUpdate> for OfferedUpdateDto {
    fn from(update: OfferedUpdate) -> Self {
        Self {
            identity: update.identity.into(),
            revision_index: update.revision_index,
            action: update.action.into(),
            core_fragment: update.core_fragment,
        }
    }
}

/// Response body for the `SyncUpdates` downstream RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncUpdatesResponseDto {
    /// Updates offered this call.
    pub offered: Vec<OfferedUpdateDto>,
    /// Whether more applicable candidates exist than fit the cap.
    pub truncated: bool,
    /// Fresh opaque session cookie; must be echoed on the next call.
    pub cookie: String,
    /// Candidates matched but withheld by approval policy, for audit only.
    pub denied_for_audit: Vec<PackageIdentityDto>,
}

impl From<SyncUpdatesResponse> for SyncUpdatesResponseDto {
    fn from(response: SyncUpdatesResponse) -> Self {
        Self {
            offered: response.offered.into_iter().map(Into::into).collect(),
            truncated: response.truncated,
            cookie: response.cookie,
            denied_for_audit: response
                .denied_for_audit
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

/// Request body for `GetExtendedUpdateInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedUpdateInfoRequestDto {
    /// Session cookie a prior `SyncUpdates` call returned.
    pub cookie: String,
    /// Revision indexes to resolve.
    pub revision_indexes: Vec<u32>,
    /// Client locales to resolve localized fragments for.
    #[serde(default)]
    pub languages: Vec<String>,
}

impl From<ExtendedUpdateInfoRequestDto> for ExtendedUpdateInfoRequest {
    fn from(dto: ExtendedUpdateInfoRequestDto) -> Self {
        Self {
            cookie: dto.cookie,
            revision_indexes: dto.revision_indexes,
            languages: dto.languages,
        }
    }
}

/// A single resolved file location, keyed by its strongest digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLocationDto {
    /// Lowercase hex of the file's strongest digest.
    pub digest_hex: String,
    /// URL the client should fetch the file from.
    pub url: String,
}

impl From<FileLocation> for FileLocationDto {
    fn from(location: FileLocation) -> Self {
        Self {
            digest_hex: location.digest_hex,
            url: location.url,
        }
    }
}

/// Extended info resolved for a single revision index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedInfoRecordDto {
    /// Revision index this record resolves.
    pub revision_index: u32,
    /// Identity the index maps to.
    pub identity: PackageIdentityDto,
    /// Extended XML fragment (§4.2).
    pub extended_fragment: String,
    /// Localized XML fragment, empty if none match the requested locales.
    pub localized_fragment: String,
}

impl From<ExtendedInfoRecord> for ExtendedInfoRecordDto {
    fn from(record: ExtendedInfoRecord) -> Self {
        Self {
            revision_index: record.revision_index,
            identity: record.identity.into(),
            extended_fragment: record.extended_fragment,
            localized_fragment: record.localized_fragment,
        }
    }
}

/// Response body for `GetExtendedUpdateInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedUpdateInfoResponseDto {
    /// One record per requested, resolvable revision index.
    pub records: Vec<ExtendedInfoRecordDto>,
    /// Every file location referenced by `records`, deduplicated by digest.
    pub file_locations: Vec<FileLocationDto>,
}

impl From<ExtendedInfoResponse> for ExtendedUpdateInfoResponseDto {
    fn from(response: ExtendedInfoResponse) -> Self {
        Self {
            records: response.records.into_iter().map(Into::into).collect(),
            file_locations: response
                .file_locations
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

/// Response body for `GetConfig`/`GetConfig2`: the subset of
/// [`ServiceConfig`] a downstream client is allowed to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetConfigResponseDto {
    /// Locales this server can resolve localized fragments for.
    pub languages: Vec<String>,
    /// Per-response cap on offered updates.
    pub max_offered_per_response: usize,
}

impl From<&ServiceConfig> for GetConfigResponseDto {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            languages: config.languages.clone(),
            max_offered_per_response: config.max_offered_per_response,
        }
    }
}

/// Response body for `GetCookie`: a fresh opaque downstream session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetCookieResponseDto {
    /// Fresh opaque cookie value.
    pub cookie: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_request_dto_round_trips_into_the_domain_type() {
        let id = Uuid::from_u128(1);
        let dto = SyncUpdatesRequestDto {
            installed_non_leaf_ids: vec![id],
            cookie: Some("abc".to_string()),
            ..SyncUpdatesRequestDto::default()
        };
        let domain: SyncUpdatesRequest = dto.into();
        assert!(domain.installed_non_leaf_ids.contains(&id));
        assert_eq!(domain.cookie.as_deref(), Some("abc"));
    }

    #[test]
    fn problem_details_serializes_with_rfc9457_field_names() {
        let problem = ProblemDetails {
            kind: "about:blank".to_string(),
            title: "Bad Request".to_string(),
            status: 400,
            detail: None,
            invalid_params: None,
        };
        let json = serde_json::to_value(&problem).expect("serialize");
        assert_eq!(json["type"], "about:blank");
        assert!(json.get("detail").is_none());
    }
}
