//! Content-addressed file download endpoint (§6).
//!
//! `GET /microsoftupdate/content/{hex-digest}` serves the file located by a
//! bare digest, honoring `Range`; `HEAD` reports only its size. Digests of
//! length 20 are SHA-1, length 32 SHA-256 (classified purely by byte length,
//! matching the store layer); any other length is a 400.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use catalog_core::file::{DigestAlgorithm, FileDigest};
use catalog_store::StoreError;

use crate::http::errors::ApiError;
use crate::state::ApiState;

fn decode_digest(hex_digest: &str) -> Result<FileDigest, ApiError> {
    if hex_digest.len() % 2 != 0 {
        return Err(ApiError::bad_request("digest has odd hex length"));
    }
    let bytes = (0..hex_digest.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex_digest[i..i + 2], 16)
                .map_err(|_| ApiError::bad_request("digest is not valid hex"))
        })
        .collect::<Result<Vec<u8>, ApiError>>()?;
    let algorithm = match bytes.len() {
        20 => DigestAlgorithm::Sha1,
        32 => DigestAlgorithm::Sha256,
        other => {
            return Err(ApiError::bad_request(format!(
                "digest has unrecognized length {other} bytes"
            )));
        }
    };
    Ok(FileDigest { algorithm, bytes })
}

struct ByteRange {
    start: u64,
    end: u64,
}

fn parse_range(headers: &HeaderMap, total_len: u64) -> Option<ByteRange> {
    let raw = headers.get(header::RANGE)?.to_str().ok()?;
    let spec = raw.strip_prefix("bytes=")?;
    let (start_str, end_str) = spec.split_once('-')?;
    let start: u64 = start_str.parse().ok()?;
    let end = if end_str.is_empty() {
        total_len.saturating_sub(1)
    } else {
        end_str.parse().ok()?
    };
    if start > end || start >= total_len {
        return None;
    }
    Some(ByteRange {
        start,
        end: end.min(total_len.saturating_sub(1)),
    })
}

pub(crate) async fn head_content(
    State(state): State<Arc<ApiState>>,
    Path(hex_digest): Path<String>,
) -> Result<Response, ApiError> {
    let digest = decode_digest(&hex_digest)?;
    let path = locate(&state, &digest).await?;
    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|source| ApiError::internal(source.to_string()))?;
    let mut response = StatusCode::OK.into_response();
    response.headers_mut().insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&metadata.len().to_string())
            .map_err(|source| ApiError::internal(source.to_string()))?,
    );
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    Ok(response)
}

pub(crate) async fn get_content(
    State(state): State<Arc<ApiState>>,
    Path(hex_digest): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let digest = decode_digest(&hex_digest)?;
    let path = locate(&state, &digest).await?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| ApiError::internal(source.to_string()))?;
    let total_len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);

    let Some(range) = parse_range(&headers, total_len) else {
        let mut response = (StatusCode::OK, bytes).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        return Ok(response);
    };

    let slice = bytes[usize::try_from(range.start).unwrap_or(0)..=usize::try_from(range.end).unwrap_or(0)].to_vec();
    let content_range = format!("bytes {}-{}/{}", range.start, range.end, total_len);
    let mut response = (StatusCode::PARTIAL_CONTENT, Body::from(slice)).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    response.headers_mut().insert(
        header::CONTENT_RANGE,
        HeaderValue::from_str(&content_range)
            .map_err(|source| ApiError::internal(source.to_string()))?,
    );
    Ok(response)
}

async fn locate(state: &ApiState, digest: &FileDigest) -> Result<std::path::PathBuf, ApiError> {
    match state.content.locate(digest) {
        Ok(Some(path)) => Ok(path),
        Ok(None) => Err(ApiError::not_found("content not found for digest")),
        Err(StoreError::Io { source, .. }) => Err(ApiError::internal(source.to_string())),
        Err(other) => Err(ApiError::internal(other.to_string())),
    }
}
