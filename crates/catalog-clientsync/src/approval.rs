//! Approval-policy seam for the layered offering algorithm (§4.5).
//!
//! Deployment approval (which updates an administrator has approved for
//! which target groups) is a server-configuration concern with no data-model
//! representation here; this trait is the seam a concrete policy plugs into.
//! The default policy approves everything, matching a server with no
//! approval rules configured.

use catalog_core::update::Update;

/// Decides whether a matched candidate may be offered to a client.
pub trait ApprovalPolicy: Send + Sync {
    /// Whether `update` is approved for offering.
    fn is_approved(&self, update: &Update) -> bool;
}

/// Approves every candidate; the default when no approval policy is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproveAll;

impl ApprovalPolicy for ApproveAll {
    fn is_approved(&self, _update: &Update) -> bool {
        true
    }
}
