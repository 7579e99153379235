//! Health and diagnostics endpoints.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::ApiState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) stored_updates: usize,
}

pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let stored_updates = state.store.snapshot().await.map(|s| s.len()).unwrap_or(0);
    Json(HealthResponse {
        status: "ok",
        stored_updates,
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> String {
    state.telemetry.render().unwrap_or_default()
}
