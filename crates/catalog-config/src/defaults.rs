//! Default values used when a field is absent from the config JSON file.

/// Default locale list: English only, matching the decoder's `en` default
/// (§4.2).
pub(crate) fn languages() -> Vec<String> {
    vec!["en".to_string()]
}

/// Protocol cap on offered updates per `SyncUpdates` response (§4.5).
pub(crate) const fn max_offered_per_response() -> usize {
    50
}

/// Conservative default batch cap used until the upstream's own
/// `GetConfigData` response is known.
pub(crate) const fn max_updates_per_request() -> u32 {
    100
}

/// Default upstream fetch fan-out (§9 "Parallelism cap").
pub(crate) const fn max_fetch_fan_out() -> usize {
    8
}

/// Default `package.xml` `ProtocolVersion` (§4.6).
pub(crate) fn export_protocol_version() -> String {
    "1.20".to_string()
}

/// Default `package.xml` `FormatVersion` (§4.6).
pub(crate) fn export_format_version() -> String {
    "1.0".to_string()
}
