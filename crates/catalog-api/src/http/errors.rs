//! RFC9457-style API error wrapper (§7: wire error kinds surfaced to callers).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use catalog_api_models::{ProblemDetails, ProblemInvalidParam};
use catalog_clientsync::ClientSyncError;

const PROBLEM_INTERNAL: &str = "https://catalog.dev/problems/internal";
const PROBLEM_BAD_REQUEST: &str = "https://catalog.dev/problems/bad-request";
const PROBLEM_NOT_FOUND: &str = "https://catalog.dev/problems/not-found";
const PROBLEM_SERVICE_UNAVAILABLE: &str = "https://catalog.dev/problems/service-unavailable";
const PROBLEM_NOT_IMPLEMENTED: &str = "https://catalog.dev/problems/not-implemented";

/// Structured API error with optional RFC9457 fields.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    kind: &'static str,
    title: &'static str,
    detail: Option<String>,
    invalid_params: Option<Vec<ProblemInvalidParam>>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
            invalid_params: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn with_invalid_params(mut self, params: Vec<ProblemInvalidParam>) -> Self {
        self.invalid_params = Some(params);
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request").with_detail(detail)
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            PROBLEM_NOT_FOUND,
            "resource not found",
        )
        .with_detail(detail)
    }

    pub(crate) fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            PROBLEM_SERVICE_UNAVAILABLE,
            "service unavailable",
        )
        .with_detail(detail)
    }

    /// `IncompatibleProtocolVersion` (§7): the operation is not implemented
    /// by this relay and must fault rather than silently succeed.
    pub(crate) fn not_implemented(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_IMPLEMENTED,
            PROBLEM_NOT_IMPLEMENTED,
            "operation not implemented",
        )
        .with_detail(detail)
    }
}

impl From<ClientSyncError> for ApiError {
    fn from(error: ClientSyncError) -> Self {
        match error {
            ClientSyncError::UnknownSession => {
                Self::bad_request("session cookie not found or expired")
            }
            ClientSyncError::UnknownRevisionIndex { index } => Self::bad_request(format!(
                "revision index {index} was not assigned in this session"
            )),
            ClientSyncError::Store(source) => Self::internal(source.to_string()),
            ClientSyncError::Fragment(source) => Self::internal(source.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            invalid_params: self.invalid_params,
        };
        (self.status, Json(body)).into_response()
    }
}
