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

//! Canonical update XML: decoding into the typed model and fragmenting into
//! the core/extended/localized slices served to clients.

pub mod decode;
pub mod error;
pub mod fragment;
pub mod namespace;
pub mod tree;

pub use decode::decode_update;
pub use error::{XmlError, XmlResult};
pub use fragment::{core_fragment, extended_fragment, localized_fragment};
pub use tree::{XmlElement, XmlNode, parse_document};
