use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_types::RelayError;
use serde::Serialize;

use crate::middleware::RequestId;

/// The shared error body every failed response carries (spec §6): `{error,
/// code, requestId?, retryAfter?}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

/// Wraps a [`RelayError`] with the request id of the call that produced it,
/// so the JSON body and the `X-Request-Id` header always agree.
pub struct ApiError {
    inner: RelayError,
    request_id: Option<RequestId>,
}

impl ApiError {
    pub fn new(inner: RelayError, request_id: Option<RequestId>) -> Self {
        Self { inner, request_id }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: self.inner.to_string(),
            code: self.inner.code(),
            request_id: self.request_id.map(|id| id.0),
            retry_after: self.inner.retry_after(),
        };
        metrics::counter!("relayer.http.requests", 1, "status" => status.as_u16().to_string(), "code" => body.code);
        (status, Json(body)).into_response()
    }
}
