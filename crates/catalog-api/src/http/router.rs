//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::Request,
    routing::{get, post},
};
use catalog_clientsync::{ApproveAll, ClientSyncHost};
use catalog_config::ConfigService;
use catalog_store::{FilesystemContentStore, MetadataStore};
use catalog_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::clientsync::{
    get_config, get_cookie, get_extended_update_info, sync_updates, unimplemented_operation,
};
use crate::http::content::{get_content, head_content};
use crate::http::health::{health, metrics};
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;

/// Axum router wrapper that hosts the downstream client-sync and content
/// services.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct a new API server with shared dependencies wired through application state.
    #[must_use]
    pub fn new(
        config: ConfigService,
        store: Arc<dyn MetadataStore>,
        content: Arc<FilesystemContentStore>,
        clientsync: Arc<ClientSyncHost<ApproveAll>>,
        telemetry: Metrics,
    ) -> Self {
        let state = Arc::new(ApiState::new(config, store, content, clientsync, telemetry.clone()));

        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let method = request.method().clone();
                let uri_path = request.uri().path().to_string();
                tracing::info_span!(
                    "http.request",
                    method = %method,
                    route = %uri_path,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );

        let layered = ServiceBuilder::new()
            .layer(catalog_telemetry::propagate_request_id_layer())
            .layer(catalog_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Self::build_router()
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn build_router() -> Router<Arc<ApiState>> {
        Self::public_routes()
            .merge(Self::clientsync_routes())
            .merge(Self::content_routes())
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/config", get(get_config))
    }

    fn clientsync_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/microsoftupdate/server/GetConfig", post(get_config))
            .route("/microsoftupdate/server/GetConfig2", post(get_config))
            .route("/microsoftupdate/server/GetCookie", post(get_cookie))
            .route("/microsoftupdate/server/SyncUpdates", post(sync_updates))
            .route(
                "/microsoftupdate/server/GetExtendedUpdateInfo",
                post(get_extended_update_info),
            )
            .route(
                "/microsoftupdate/server/{operation}",
                post(unimplemented_operation),
            )
    }

    fn content_routes() -> Router<Arc<ApiState>> {
        Router::new().route(
            "/microsoftupdate/content/{hex_digest}",
            get(get_content).head(head_content),
        )
    }

    /// Serve the API using the configured router on the supplied address.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        tracing::info!("starting API on {addr}");
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}
