//! Shared request validation for the intake endpoints.
//!
//! Both endpoints run the same ordered chain before anything is forwarded:
//!
//! 1. Resolve tenant (400 missing, 404 unavailable)
//! 2. Guard origin against the tenant allow-list (403)
//! 3. Require an idempotency key (400)
//! 4. Validate the inspection payload, inspection flow only (400)
//! 5. Select the upstream flow URL (500 when unconfigured)
//!
//! Each step either passes the request context on or rejects it. The first
//! rejection wins and no later step runs, so nothing reaches the upstream
//! unless every step passed.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use intake_core::{
    FlowKind, InspectionRequest, IntakeError, Result, TenantConfig, TenantId, TenantStore,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

/// Everything known about a request while it moves through the pipeline.
#[derive(Debug, Clone)]
pub struct IntakeContext {
    /// Request identifier.
    pub request_id: Uuid,
    /// Flow the request targets.
    pub flow: FlowKind,
    /// Declared `Origin` header.
    pub origin: Option<String>,
    /// Raw request body, forwarded unchanged.
    pub body: Bytes,
    /// Parsed body; an empty object when the body is not a JSON object.
    pub payload: Value,
    /// Sanitized tenant, set by tenant resolution.
    pub tenant: Option<TenantId>,
    /// Tenant configuration, set by tenant resolution.
    pub config: Option<TenantConfig>,
    /// Upstream URL, set by upstream selection.
    pub upstream_url: Option<String>,
}

impl IntakeContext {
    /// Builds a context from a raw request.
    pub fn new(request_id: Uuid, flow: FlowKind, origin: Option<String>, body: Bytes) -> Self {
        let payload = match serde_json::from_slice::<Value>(&body) {
            Ok(value @ Value::Object(_)) => value,
            _ => Value::Object(Map::new()),
        };

        Self {
            request_id,
            flow,
            origin,
            body,
            payload,
            tenant: None,
            config: None,
            upstream_url: None,
        }
    }

    fn tenant(&self) -> Result<&TenantId> {
        self.tenant.as_ref().ok_or(IntakeError::MissingTenant)
    }

    fn config(&self) -> Result<&TenantConfig> {
        self.config.as_ref().ok_or_else(|| IntakeError::TenantNotFound {
            tenant: self.tenant.as_ref().map(ToString::to_string).unwrap_or_default(),
        })
    }

    fn into_validated(self) -> Result<ValidatedRequest> {
        let tenant = self.tenant.ok_or(IntakeError::MissingTenant)?;
        let config = self
            .config
            .ok_or_else(|| IntakeError::TenantNotFound { tenant: tenant.to_string() })?;
        let upstream_url = self
            .upstream_url
            .ok_or_else(|| IntakeError::TenantMisconfigured { tenant: tenant.to_string() })?;

        Ok(ValidatedRequest {
            request_id: self.request_id,
            flow: self.flow,
            tenant,
            config,
            upstream_url,
            body: self.body,
        })
    }
}

/// A request that passed every step and is ready to forward.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    /// Request identifier.
    pub request_id: Uuid,
    /// Flow the request targets.
    pub flow: FlowKind,
    /// Sanitized tenant.
    pub tenant: TenantId,
    /// Tenant configuration.
    pub config: TenantConfig,
    /// Upstream URL to forward to.
    pub upstream_url: String,
    /// Original body bytes.
    pub body: Bytes,
}

/// One link in the validation chain.
#[async_trait]
pub trait ValidationStep: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Passes the context on or rejects the request.
    async fn check(&self, ctx: &mut IntakeContext) -> Result<()>;
}

/// Sanitizes the tenant and loads its configuration.
#[derive(Debug, Clone)]
pub struct ResolveTenant {
    store: Arc<dyn TenantStore>,
}

impl ResolveTenant {
    /// Creates the step over a tenant store.
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ValidationStep for ResolveTenant {
    fn name(&self) -> &'static str {
        "resolve_tenant"
    }

    async fn check(&self, ctx: &mut IntakeContext) -> Result<()> {
        let tenant = TenantId::from_payload(&ctx.payload).ok_or(IntakeError::MissingTenant)?;
        tracing::Span::current().record("tenant", tenant.as_str());

        match self.store.load(&tenant).await {
            Ok(config) => {
                debug!(tenant = %tenant, "Tenant config loaded");
                ctx.config = Some(config);
                ctx.tenant = Some(tenant);
                Ok(())
            },
            Err(e) => {
                warn!(tenant = %tenant, error = %e, "Tenant config unavailable");
                Err(IntakeError::TenantNotFound { tenant: tenant.to_string() })
            },
        }
    }
}

/// Rejects origins missing from a non-empty tenant allow-list.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardOrigin;

#[async_trait]
impl ValidationStep for GuardOrigin {
    fn name(&self) -> &'static str {
        "guard_origin"
    }

    async fn check(&self, ctx: &mut IntakeContext) -> Result<()> {
        let config = ctx.config()?;
        if config.allows_origin(ctx.origin.as_deref()) {
            Ok(())
        } else {
            Err(IntakeError::OriginNotAllowed { origin: ctx.origin.clone().unwrap_or_default() })
        }
    }
}

/// Requires a non-empty string `idempotencyKey`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireIdempotencyKey;

#[async_trait]
impl ValidationStep for RequireIdempotencyKey {
    fn name(&self) -> &'static str {
        "require_idempotency_key"
    }

    async fn check(&self, ctx: &mut IntakeContext) -> Result<()> {
        match ctx.payload.get("idempotencyKey") {
            Some(Value::String(key)) if !key.is_empty() => Ok(()),
            _ => Err(IntakeError::MissingIdempotencyKey),
        }
    }
}

/// Checks the structured fields of an inspection request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateInspectionPayload;

#[async_trait]
impl ValidationStep for ValidateInspectionPayload {
    fn name(&self) -> &'static str {
        "validate_inspection_payload"
    }

    async fn check(&self, ctx: &mut IntakeContext) -> Result<()> {
        let request: InspectionRequest = serde_json::from_value(ctx.payload.clone())
            .map_err(|e| IntakeError::invalid(format!("Invalid inspection request: {e}")))?;
        request.validate()
    }
}

/// Picks the upstream URL for the request's flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectUpstream;

#[async_trait]
impl ValidationStep for SelectUpstream {
    fn name(&self) -> &'static str {
        "select_upstream"
    }

    async fn check(&self, ctx: &mut IntakeContext) -> Result<()> {
        let tenant = ctx.tenant()?.to_string();
        let url = ctx
            .config()?
            .upstream_for(ctx.flow)
            .map(str::to_string)
            .ok_or(IntakeError::TenantMisconfigured { tenant })?;

        ctx.upstream_url = Some(url);
        Ok(())
    }
}

/// Ordered chain of validation steps.
#[derive(Debug)]
pub struct Pipeline {
    steps: Vec<Box<dyn ValidationStep>>,
}

impl Pipeline {
    /// Creates a pipeline from explicit steps.
    pub fn new(steps: Vec<Box<dyn ValidationStep>>) -> Self {
        Self { steps }
    }

    /// Standard chain for a flow.
    pub fn for_flow(flow: FlowKind, store: Arc<dyn TenantStore>) -> Self {
        let mut steps: Vec<Box<dyn ValidationStep>> = vec![
            Box::new(ResolveTenant::new(store)),
            Box::new(GuardOrigin),
            Box::new(RequireIdempotencyKey),
        ];
        if flow == FlowKind::Inspection {
            steps.push(Box::new(ValidateInspectionPayload));
        }
        steps.push(Box::new(SelectUpstream));

        Self::new(steps)
    }

    /// Names of the steps in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step in order, stopping at the first rejection.
    ///
    /// # Errors
    ///
    /// Returns the rejection of the first failing step.
    pub async fn run(&self, mut ctx: IntakeContext) -> Result<ValidatedRequest> {
        for step in &self.steps {
            if let Err(e) = step.check(&mut ctx).await {
                debug!(step = step.name(), code = e.code(), "Request rejected");
                return Err(e);
            }
        }
        ctx.into_validated()
    }
}
