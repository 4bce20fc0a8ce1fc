//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Envelope for middleware rejections (intake routes)
//! 4. Timeout enforcement
//! 5. Body size limit (intake routes)
//! 6. Handler execution
//!
//! Rejections raised by the timeout, the body limit or the router itself
//! never pass through a handler, so step 3 re-wraps them: a timeout becomes
//! 502 "Upstream service failed", anything else keeps its status with a
//! JSON `message` and the CORS headers.
//!
//! The intake endpoints are reachable both at the root and under `/api`, so
//! the browser controller works whether the site rewrites `/api/*` to this
//! service or points straight at it.
//!
//! # Graceful Shutdown
//!
//! The server handles SIGTERM gracefully:
//! - Stops accepting new connections
//! - Waits for in-flight requests
//! - Returns appropriate exit code

use std::net::SocketAddr;

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use intake_core::IntakeError;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    handlers,
    response::{Envelope, Enveloped},
    AppState,
};

/// Identifier assigned to each request by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

/// Creates the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use intake_api::{create_router, AppState, Config};
///
/// let state = AppState::from_config(&Config::default()).unwrap();
/// let app = create_router(state);
/// // Serve the app...
/// ```
pub fn create_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check));

    let tenant_routes = Router::new().route("/tenants/{file}", get(handlers::tenant_config));

    let limits = state.limits;

    let site_routes = Router::new()
        .merge(health_routes)
        .merge(tenant_routes)
        .layer(TimeoutLayer::new(limits.request_timeout));

    let intake_routes = Router::new()
        .route("/inspection", post(handlers::submit_inspection).options(handlers::preflight))
        .route("/verify", post(handlers::submit_verification).options(handlers::preflight))
        .layer(RequestBodyLimitLayer::new(limits.max_body_bytes))
        .layer(TimeoutLayer::new(limits.request_timeout))
        .layer(middleware::from_fn(envelope_rejections));

    Router::new()
        .merge(site_routes)
        .merge(intake_routes.clone())
        .nest("/api", intake_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header for tracing requests across services.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    req.extensions_mut().insert(RequestId(request_id));

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.to_string().parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Wraps intake responses that no handler produced in the CORS envelope.
///
/// Upstream replies relayed by a handler are already enveloped and pass
/// through untouched, whatever their status.
async fn envelope_rejections(req: Request, next: Next) -> Response {
    let origin =
        req.headers().get(header::ORIGIN).and_then(|v| v.to_str().ok()).map(str::to_string);

    let response = next.run(req).await;
    let status = response.status();
    if response.extensions().get::<Enveloped>().is_some()
        || !(status.is_client_error() || status.is_server_error())
    {
        return response;
    }

    let envelope = if status == StatusCode::REQUEST_TIMEOUT {
        warn!("Request timed out before the upstream answered");
        Envelope::error(
            &IntakeError::UpstreamUnavailable { reason: "request timed out".to_string() },
            origin,
        )
    } else {
        warn!(status = status.as_u16(), "Request rejected before reaching a handler");
        let message = match status {
            StatusCode::PAYLOAD_TOO_LARGE => "Request body too large",
            _ => status.canonical_reason().unwrap_or("Request rejected"),
        };
        Envelope::message(status, message, origin)
    };

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut wrapped = envelope.into_response();
    if let Some(allow) = allow {
        wrapped.headers_mut().insert(header::ALLOW, allow);
    }
    wrapped
}

/// Starts the HTTP server with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if:
/// - Port is already in use
/// - Network interface unavailable
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = create_router(state);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight requests to complete");
}
