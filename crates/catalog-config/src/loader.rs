//! Loads and validates a [`ServiceConfig`] from a JSON file on disk.

use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::model::ServiceConfig;
use crate::validate;

/// Read, parse, and validate the config JSON file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read,
/// [`ConfigError::Parse`] if its contents are not a valid [`ServiceConfig`],
/// or [`ConfigError::Invalid`] if a parsed value fails validation.
pub async fn load(path: &Path) -> ConfigResult<ServiceConfig> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse(path, &raw)
}

/// Parse and validate `raw` JSON as if it had been read from `path` (`path`
/// is used only to annotate errors).
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
pub fn parse(path: &Path, raw: &str) -> ConfigResult<ServiceConfig> {
    let config: ServiceConfig =
        serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_a_well_formed_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"languages": ["en", "de"]}}"#).expect("write");
        let config = load(file.path()).await.expect("load");
        assert_eq!(config.languages, vec!["en", "de"]);
        assert_eq!(config.max_offered_per_response, 50);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = load(Path::new("/does/not/exist.json")).await.unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse(Path::new("inline"), "{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let err = parse(Path::new("inline"), r#"{"bogus_field": 1}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn invalid_value_fails_validation_after_parsing() {
        let err = parse(Path::new("inline"), r#"{"languages": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
