//! API application state: the shared handles every handler reads from.

use std::sync::Arc;

use catalog_clientsync::{ApproveAll, ClientSyncHost};
use catalog_config::ConfigService;
use catalog_store::{FilesystemContentStore, MetadataStore};
use catalog_telemetry::Metrics;

/// Shared state threaded through every HTTP handler.
pub(crate) struct ApiState {
    pub(crate) config: ConfigService,
    pub(crate) store: Arc<dyn MetadataStore>,
    pub(crate) content: Arc<FilesystemContentStore>,
    pub(crate) clientsync: Arc<ClientSyncHost<ApproveAll>>,
    pub(crate) telemetry: Metrics,
}

impl ApiState {
    pub(crate) fn new(
        config: ConfigService,
        store: Arc<dyn MetadataStore>,
        content: Arc<FilesystemContentStore>,
        clientsync: Arc<ClientSyncHost<ApproveAll>>,
        telemetry: Metrics,
    ) -> Self {
        Self {
            config,
            store,
            content,
            clientsync,
            telemetry,
        }
    }
}
