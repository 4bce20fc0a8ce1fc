//! Intake HTTP API.
//!
//! Browser forms post here; requests are checked against the tenant's
//! configuration and relayed to the tenant's upstream flow.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::{sync::Arc, time::Duration};

use intake_core::{Clock, FlowKind, RealClock, TenantStore};
use intake_forward::UpstreamClient;

pub mod config;
pub mod handlers;
pub mod pipeline;
pub mod response;
pub mod server;

pub use config::{Config, TenantSource};
pub use pipeline::{IntakeContext, Pipeline, ValidatedRequest, ValidationStep};
pub use response::Envelope;
pub use server::{create_router, start_server};

/// Request limits enforced by the router.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Whole-request timeout.
    pub request_timeout: Duration,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { request_timeout: Duration::from_secs(45), max_body_bytes: 64 * 1024 }
    }
}

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Tenant configuration source.
    pub tenants: Arc<dyn TenantStore>,
    /// Client for upstream flows.
    pub upstream: UpstreamClient,
    /// Clock for health timestamps.
    pub clock: Arc<dyn Clock>,
    /// Request limits.
    pub limits: Limits,
    /// Whether `GET /tenants/{file}` is served.
    pub serve_tenant_configs: bool,
    inspection: Arc<Pipeline>,
    verify: Arc<Pipeline>,
}

impl AppState {
    /// Creates state with the standard pipelines and a real clock.
    pub fn new(tenants: Arc<dyn TenantStore>, upstream: UpstreamClient) -> Self {
        Self {
            inspection: Arc::new(Pipeline::for_flow(FlowKind::Inspection, tenants.clone())),
            verify: Arc::new(Pipeline::for_flow(FlowKind::Verify, tenants.clone())),
            tenants,
            upstream,
            clock: Arc::new(RealClock::new()),
            limits: Limits::default(),
            serve_tenant_configs: true,
        }
    }

    /// Builds state from loaded configuration.
    ///
    /// # Errors
    ///
    /// Fails when the upstream client or tenant store cannot be built.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let upstream = UpstreamClient::new(config.to_client_config())?;
        let tenants = config.build_tenant_store(&upstream)?;

        Ok(Self::new(tenants, upstream)
            .with_limits(Limits {
                request_timeout: config.request_timeout(),
                max_body_bytes: config.max_body_bytes,
            })
            .with_tenant_configs(config.serve_tenant_configs))
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the request limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Enables or disables serving tenant documents.
    #[must_use]
    pub fn with_tenant_configs(mut self, enabled: bool) -> Self {
        self.serve_tenant_configs = enabled;
        self
    }

    /// Validation pipeline for a flow.
    pub fn pipeline(&self, flow: FlowKind) -> &Pipeline {
        match flow {
            FlowKind::Inspection => &self.inspection,
            FlowKind::Verify => &self.verify,
        }
    }
}
