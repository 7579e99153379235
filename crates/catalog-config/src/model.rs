//! Typed configuration model: the JSON document described in §6 ("Config
//! file (service)"), used both when serving downstream clients and when
//! writing `package.xml` (§4.6).

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Service-wide configuration loaded from the config JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Locales this server can resolve localized fragments for, most
    /// preferred first. Also written into `package.xml`'s `<Languages>`.
    #[serde(default = "defaults::languages")]
    pub languages: Vec<String>,

    /// Per-response cap on offered updates (§4.5: `N = 50`). Exposed as a
    /// setting rather than a hardcoded constant so a deployment can lower it
    /// without a rebuild; raising it above the protocol's documented cap is
    /// rejected by [`crate::validate::validate`].
    #[serde(default = "defaults::max_offered_per_response")]
    pub max_offered_per_response: usize,

    /// Upper bound this server will request per `GetUpdateData` batch when
    /// acting as an upstream client, used only if the upstream's own
    /// `GetConfigData` response does not advertise a smaller cap.
    #[serde(default = "defaults::max_updates_per_request")]
    pub max_updates_per_request: u32,

    /// Bound on concurrently in-flight upstream fetch batches (§5, §9).
    #[serde(default = "defaults::max_fetch_fan_out")]
    pub max_fetch_fan_out: usize,

    /// When set, file locations resolve to `<content_root>/<hex-digest>`
    /// instead of the update's original source URL (§4.5 "Extended info
    /// RPC").
    #[serde(default)]
    pub content_root: Option<String>,

    /// `ProtocolVersion` written into exported `package.xml` documents
    /// (§4.6). Distinct from the upstream RPC protocol version strings.
    #[serde(default = "defaults::export_protocol_version")]
    pub export_protocol_version: String,

    /// `FormatVersion` written into exported `package.xml` documents (§4.6).
    #[serde(default = "defaults::export_format_version")]
    pub export_format_version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            languages: defaults::languages(),
            max_offered_per_response: defaults::max_offered_per_response(),
            max_updates_per_request: defaults::max_updates_per_request(),
            max_fetch_fan_out: defaults::max_fetch_fan_out(),
            content_root: None,
            export_protocol_version: defaults::export_protocol_version(),
            export_format_version: defaults::export_format_version(),
        }
    }
}
