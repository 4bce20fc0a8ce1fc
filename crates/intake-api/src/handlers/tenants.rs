//! Serves tenant configuration documents to the browser controller.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use intake_core::TenantId;
use serde_json::json;
use tracing::{debug, instrument};

use crate::AppState;

/// `GET /tenants/{file}`: returns the configuration for `<tenant>.json`.
///
/// Responses are marked `no-cache` so configuration edits show up on the
/// next page load.
#[instrument(name = "tenant_config", skip(state))]
pub async fn tenant_config(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    if !state.serve_tenant_configs {
        return not_found();
    }

    let name = file.strip_suffix(".json").unwrap_or(&file);
    let Some(tenant) = TenantId::sanitize(name) else {
        return not_found();
    };

    match state.tenants.load(&tenant).await {
        Ok(config) => {
            (StatusCode::OK, [(header::CACHE_CONTROL, "no-cache")], Json(config)).into_response()
        },
        Err(e) => {
            debug!(tenant = %tenant, error = %e, "Tenant config not served");
            not_found()
        },
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Tenant not found" }))).into_response()
}
