//! Downstream client-sync RPC handlers (§6).
//!
//! Only `GetConfig`, `GetConfig2`, `GetCookie`, `SyncUpdates`, and
//! `GetExtendedUpdateInfo` are implemented; every other named operation
//! (`GetExtendedUpdateInfo2`, `RegisterComputer`, `StartCategoryScan`,
//! `SyncPrinterCatalog`, `RefreshCache`, `GetFileLocations`, `GetTimestamps`)
//! faults with `not_implemented` rather than silently succeeding.

use std::sync::Arc;

use axum::{Json, extract::Path, extract::State};
use catalog_api_models::{
    ExtendedUpdateInfoRequestDto, ExtendedUpdateInfoResponseDto, GetConfigResponseDto,
    GetCookieResponseDto, SyncUpdatesRequestDto, SyncUpdatesResponseDto,
};
use uuid::Uuid;

use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn get_config(
    State(state): State<Arc<ApiState>>,
) -> Json<GetConfigResponseDto> {
    let snapshot = state.config.snapshot().await;
    Json(GetConfigResponseDto::from(&snapshot))
}

pub(crate) async fn get_cookie() -> Json<GetCookieResponseDto> {
    Json(GetCookieResponseDto {
        cookie: Uuid::new_v4().simple().to_string(),
    })
}

pub(crate) async fn sync_updates(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SyncUpdatesRequestDto>,
) -> Result<Json<SyncUpdatesResponseDto>, ApiError> {
    let request = request.into();
    let response = state
        .clientsync
        .sync_updates(state.store.as_ref(), &request)
        .await?;
    Ok(Json(response.into()))
}

pub(crate) async fn get_extended_update_info(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ExtendedUpdateInfoRequestDto>,
) -> Result<Json<ExtendedUpdateInfoResponseDto>, ApiError> {
    let request = request.into();
    let response = state
        .clientsync
        .extended_info(state.store.as_ref(), &request)
        .await?;
    Ok(Json(response.into()))
}

/// Fallback for every downstream RPC named in §6 but not implemented.
pub(crate) async fn unimplemented_operation(Path(operation): Path<String>) -> ApiError {
    ApiError::not_implemented(format!("{operation} is not implemented by this relay"))
}
