//! Maps the crate's error taxonomy (spec §7) onto HTTP status codes and a
//! small JSON error body, the way the tool surface is expected to "map
//! kinds to its transport's error shape" (§7 Propagation policy).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fedmem_core::FedMemError;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// Wraps a `FedMemError` so it can be returned directly from an axum
/// handler. `Unauthorized` is rendered through `to_public()` first so it is
/// indistinguishable from `NotFound` on this surface (spec §7).
pub struct ApiError(pub FedMemError);

impl From<FedMemError> for ApiError {
    fn from(e: FedMemError) -> Self {
        ApiError(e.to_public())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            FedMemError::Invalid(_) => (StatusCode::BAD_REQUEST, "invalid"),
            FedMemError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            FedMemError::Unauthorized => (StatusCode::NOT_FOUND, "not_found"),
            FedMemError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            FedMemError::EmbeddingUnavailable(_) | FedMemError::StoreUnavailable(_) | FedMemError::NotifierUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
            }
            FedMemError::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, "deadline_exceeded"),
            FedMemError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        let body = ErrorBody {
            error: kind.to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
