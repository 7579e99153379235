//! Domain models for the offline export pipeline.
//!
//! # Design
//! - Keep the request lightweight; callers own the filter and the store.
//! - `first_x` only caps non-category updates: categories are never capped
//!   since a downstream archive cannot resolve its referenced updates
//!   without their full category set.

use catalog_query::Filter;

/// Selection and limiting criteria for an offline export (§4.6).
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    /// Filter applied to the catalog before bundle closure expansion.
    pub filter: Filter,
    /// Cap on the number of matched non-category updates (`firstX`).
    pub first_x: Option<usize>,
}
