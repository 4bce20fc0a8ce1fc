//! Health check handlers for service monitoring.
//!
//! The only dependency worth probing is the tenant store: without it every
//! intake request fails with 404.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use intake_core::{Clock, TenantStore};
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Individual component health checks
    pub checks: HealthChecks,
    /// Service version information
    pub version: String,
}

/// Overall health status enumeration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Critical systems failing
    Unhealthy,
}

/// Individual component health check results.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Tenant configuration source
    pub tenants: ComponentHealth,
}

/// Health status for individual components.
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    /// Component status
    pub status: ComponentStatus,
    /// Where the component reads from
    pub source: String,
    /// Optional error message if unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response time in milliseconds
    pub response_time_ms: u64,
}

/// Component-level health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is healthy
    Up,
    /// Component is experiencing issues
    Down,
}

/// Health service that encapsulates clock dependency for testable health
/// checks.
pub struct HealthService {
    clock: Arc<dyn Clock>,
}

impl HealthService {
    /// Creates a new health service with the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Checks the tenant store and reports overall status.
    pub async fn health_check(&self, tenants: &dyn TenantStore) -> HealthResponse {
        debug!("Performing health check");

        let timestamp = DateTime::<Utc>::from(self.clock.now_system());
        let start_time = self.clock.now();

        let (status, message) = match tenants.health_check().await {
            Ok(()) => (ComponentStatus::Up, None),
            Err(e) => {
                error!(error = %e, "Tenant store health check failed");
                (ComponentStatus::Down, Some(format!("Tenant store unavailable: {e}")))
            },
        };
        let elapsed = start_time.elapsed();

        let overall = match status {
            ComponentStatus::Up => HealthStatus::Healthy,
            ComponentStatus::Down => HealthStatus::Unhealthy,
        };

        HealthResponse {
            status: overall,
            timestamp,
            checks: HealthChecks {
                tenants: ComponentHealth {
                    status,
                    source: tenants.describe(),
                    message,
                    response_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                },
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Health check endpoint handler.
#[instrument(name = "health_check", skip(app_state))]
pub async fn health_check(State(app_state): State<AppState>) -> Response {
    let health_service = HealthService::new(app_state.clock.clone());
    let response = health_service.health_check(app_state.tenants.as_ref()).await;

    let status_code = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    debug!(
        status = ?response.status,
        tenants_status = ?response.checks.tenants.status,
        "Health check completed"
    );

    (status_code, Json(response)).into_response()
}

/// Readiness check endpoint for orchestration probes.
#[instrument(name = "readiness_check", skip(app_state))]
pub async fn readiness_check(State(app_state): State<AppState>) -> Response {
    health_check(State(app_state)).await
}

/// Liveness check endpoint; never touches the tenant store.
#[instrument(name = "liveness_check", skip(app_state))]
pub async fn liveness_check(State(app_state): State<AppState>) -> Response {
    debug!("Performing liveness check");

    let response = serde_json::json!({
        "status": "alive",
        "timestamp": DateTime::<Utc>::from(app_state.clock.now_system()),
        "service": "intake-api"
    });

    (StatusCode::OK, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use intake_core::{FileTenantStore, TestClock};

    use super::*;

    #[tokio::test]
    async fn healthy_when_tenant_dir_exists() {
        let dir = std::env::temp_dir();
        let clock = TestClock::new();
        clock.advance(Duration::from_secs(60));

        let response = HealthService::new(Arc::new(clock.clone()))
            .health_check(&FileTenantStore::new(&dir))
            .await;

        assert!(matches!(response.status, HealthStatus::Healthy));
        assert_eq!(response.checks.tenants.status, ComponentStatus::Up);
        assert_eq!(response.timestamp, DateTime::<Utc>::from(clock.now_system()));
    }

    #[tokio::test]
    async fn unhealthy_when_tenant_dir_missing() {
        let store = FileTenantStore::new("/nonexistent/intake/tenants");
        let response = HealthService::new(Arc::new(TestClock::new())).health_check(&store).await;

        assert!(matches!(response.status, HealthStatus::Unhealthy));
        assert_eq!(response.checks.tenants.status, ComponentStatus::Down);
        assert!(response.checks.tenants.message.is_some());
    }
}
