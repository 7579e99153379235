//! Semantic validation of an otherwise well-formed [`ServiceConfig`].

use crate::error::{ConfigError, ConfigResult};
use crate::model::ServiceConfig;

/// Protocol-documented ceiling on `max_offered_per_response` (§4.5).
const PROTOCOL_MAX_OFFERED_PER_RESPONSE: usize = 50;

/// Validate `config`, rejecting values the protocol cannot support.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if any field is out of range.
pub fn validate(config: &ServiceConfig) -> ConfigResult<()> {
    if config.languages.is_empty() {
        return Err(ConfigError::Invalid(
            "languages must list at least one locale".to_string(),
        ));
    }
    if config.languages.iter().any(String::is_empty) {
        return Err(ConfigError::Invalid(
            "languages must not contain an empty locale".to_string(),
        ));
    }
    if config.max_offered_per_response == 0 {
        return Err(ConfigError::Invalid(
            "max_offered_per_response must be at least 1".to_string(),
        ));
    }
    if config.max_offered_per_response > PROTOCOL_MAX_OFFERED_PER_RESPONSE {
        return Err(ConfigError::Invalid(format!(
            "max_offered_per_response ({}) exceeds the protocol cap of {PROTOCOL_MAX_OFFERED_PER_RESPONSE}",
            config.max_offered_per_response
        )));
    }
    if config.max_updates_per_request == 0 {
        return Err(ConfigError::Invalid(
            "max_updates_per_request must be at least 1".to_string(),
        ));
    }
    if config.max_fetch_fan_out == 0 {
        return Err(ConfigError::Invalid(
            "max_fetch_fan_out must be at least 1".to_string(),
        ));
    }
    if let Some(root) = &config.content_root
        && root.ends_with('/')
    {
        return Err(ConfigError::Invalid(
            "content_root must not have a trailing slash".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn rejects_empty_languages() {
        let config = ServiceConfig {
            languages: vec![],
            ..ServiceConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_offered_cap_above_protocol_ceiling() {
        let config = ServiceConfig {
            max_offered_per_response: 51,
            ..ServiceConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_trailing_slash_content_root() {
        let config = ServiceConfig {
            content_root: Some("https://example.invalid/content/".to_string()),
            ..ServiceConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn accepts_content_root_without_trailing_slash() {
        let config = ServiceConfig {
            content_root: Some("https://example.invalid/content".to_string()),
            ..ServiceConfig::default()
        };
        assert!(validate(&config).is_ok());
    }
}
