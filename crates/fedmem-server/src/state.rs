//! Shared application state, built once at startup and handed down to every
//! handler (Design Notes §9: "explicit dependency injection ... do not use
//! package-level mutable state").

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use fedmem_core::prelude::*;
use serde_json::{json, Value};

use crate::error_response::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<WritePipeline>,
    pub projects: Arc<ProjectService>,
    pub people: Arc<PeopleService>,
    pub notifier: Arc<ChangeNotifier>,
    pub authenticator: Arc<dyn Authenticator>,
    pub config: Config,
}

/// Resolves a bearer token to a tenant id (spec §6 "Authentication").
/// Accepts the token from the `Authorization: Bearer <uuid>` header or,
/// failing that, an `access_token` query parameter — SSE clients (browser
/// `EventSource`) cannot set custom headers, so the path-element/query
/// fallback the spec allows is implemented here as a query param.
pub async fn authenticate(state: &AppState, headers: &HeaderMap, query_token: Option<&str>) -> Result<String, ApiError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| query_token.map(str::to_string))
        .ok_or(ApiError(FedMemError::Unauthorized.to_public()))?;

    state.authenticator.authenticate(&token).await.map_err(ApiError::from)
}

pub async fn healthz(State(_state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
