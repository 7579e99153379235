//! Error types for XML decoding and fragmenting.

use thiserror::Error;

/// Errors raised while parsing or decoding an update's canonical XML.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The underlying XML was not well-formed.
    #[error("malformed xml: {0}")]
    Parse(String),
    /// The document had no root element.
    #[error("document has no root element")]
    NoRoot,
    /// A start tag was closed by a mismatched or missing end tag.
    #[error("unbalanced start/end tags")]
    UnbalancedTags,
    /// A required element or attribute was missing from the document.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    /// An attribute value could not be parsed as the expected type.
    #[error("invalid value for '{field}': {value}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },
    /// The `Properties/@UpdateType` (and `CategoryType`, for categories)
    /// combination did not match any known update variant.
    #[error("unrecognized update type '{update_type}' (category type {category_type:?})")]
    UnknownUpdateType {
        /// Raw `UpdateType` attribute value.
        update_type: String,
        /// Raw `CategoryType` attribute value, if present.
        category_type: Option<String>,
    },
}

/// Convenience alias for XML operation results.
pub type XmlResult<T> = Result<T, XmlError>;
