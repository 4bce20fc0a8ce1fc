//! Inspection and verification proxy handlers.
//!
//! Both endpoints share one path: run the flow's validation pipeline, relay
//! the original body to the tenant's upstream flow, and hand the upstream's
//! status and body back to the browser inside the CORS envelope.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Extension,
};
use bytes::Bytes;
use intake_core::{FlowKind, IntakeError};
use intake_forward::ForwardRequest;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{pipeline::IntakeContext, response::Envelope, server::RequestId, AppState};

/// Accepts an inspection request.
///
/// # Errors
///
/// Responds with the error taxonomy status:
/// - 400: missing tenant, missing idempotency key, invalid payload
/// - 403: origin not in the tenant allow-list
/// - 404: tenant configuration unavailable
/// - 500: no upstream flow configured
/// - 502: upstream unreachable
#[instrument(
    name = "submit_inspection",
    skip_all,
    fields(request_id = %request_id.0, tenant = tracing::field::Empty, body_bytes = body.len())
)]
pub async fn submit_inspection(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Envelope {
    relay(&state, FlowKind::Inspection, request_id.0, origin_of(&headers), body).await
}

/// Accepts a contact verification.
///
/// Same rejections as [`submit_inspection`], without payload validation.
#[instrument(
    name = "submit_verification",
    skip_all,
    fields(request_id = %request_id.0, tenant = tracing::field::Empty, body_bytes = body.len())
)]
pub async fn submit_verification(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Envelope {
    relay(&state, FlowKind::Verify, request_id.0, origin_of(&headers), body).await
}

/// Answers CORS preflight requests with an empty 200.
pub async fn preflight(headers: HeaderMap) -> Envelope {
    Envelope::preflight(origin_of(&headers))
}

async fn relay(
    state: &AppState,
    flow: FlowKind,
    request_id: Uuid,
    origin: Option<String>,
    body: Bytes,
) -> Envelope {
    let ctx = IntakeContext::new(request_id, flow, origin.clone(), body);

    let validated = match state.pipeline(flow).run(ctx).await {
        Ok(validated) => validated,
        Err(e) => {
            if e.is_client_error() {
                info!(code = e.code(), error = %e, "Request rejected");
            } else {
                warn!(code = e.code(), error = %e, "Request rejected");
            }
            return Envelope::error(&e, origin);
        },
    };

    let request = ForwardRequest {
        request_id,
        tenant: validated.tenant.to_string(),
        flow,
        url: validated.upstream_url,
        body: validated.body,
    };

    match state.upstream.forward(request).await {
        Ok(response) => {
            info!(
                status = response.status_code,
                duration_ms = u64::try_from(response.duration.as_millis()).unwrap_or(u64::MAX),
                "Upstream responded"
            );
            Envelope::relay(response.status_code, response.body, origin)
        },
        Err(e) => {
            error!(error = %e, "Upstream call failed");
            Envelope::error(&IntakeError::from(e), origin)
        },
    }
}

fn origin_of(headers: &HeaderMap) -> Option<String> {
    headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()).map(str::to_string)
}
