//! Test infrastructure for the intake service.
//!
//! [`TestEnv`] owns a temporary tenant directory, a mock upstream and a
//! deterministic clock, and builds routers or live servers wired to them.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use intake_api::{create_router, AppState, Limits};
use intake_core::{FileTenantStore, TenantStore};
use intake_forward::{ClientConfig, UpstreamClient};
use tempfile::TempDir;
use tokio::task::JoinHandle;

pub mod fixtures;
pub mod http;

pub use fixtures::{inspection_payload, verification_payload, TenantFixture};
pub use http::{MockFlow, MockUpstream, RecordedRequest};
pub use intake_core::{Clock, TestClock};

/// Upstream timeout used by test environments.
pub const TEST_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(2);

/// Isolated environment for integration tests.
pub struct TestEnv {
    /// Mock upstream flows.
    pub upstream: MockUpstream,
    /// Deterministic clock shared with the app state.
    pub clock: TestClock,
    tenants_dir: TempDir,
}

impl TestEnv {
    /// Creates an environment with an empty tenant directory.
    pub async fn new() -> Result<Self> {
        let tenants_dir = tempfile::tempdir().context("failed to create tenant directory")?;
        Ok(Self { upstream: MockUpstream::start().await, clock: TestClock::new(), tenants_dir })
    }

    /// Directory holding tenant documents.
    pub fn tenants_dir(&self) -> &Path {
        self.tenants_dir.path()
    }

    /// Writes a tenant document built from a fixture.
    pub fn write_tenant(&self, fixture: &TenantFixture) -> Result<()> {
        let body = serde_json::to_vec_pretty(&fixture.to_json())?;
        self.write_tenant_raw(fixture.id(), &body)
    }

    /// Writes raw bytes as `<id>.json`, for malformed-document tests.
    pub fn write_tenant_raw(&self, id: &str, body: &[u8]) -> Result<()> {
        let path = self.tenants_dir.path().join(format!("{id}.json"));
        std::fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Tenant store reading from the temporary directory.
    pub fn tenant_store(&self) -> Arc<dyn TenantStore> {
        Arc::new(FileTenantStore::new(self.tenants_dir.path()))
    }

    /// App state wired to this environment.
    pub fn app_state(&self) -> Result<AppState> {
        let upstream = UpstreamClient::new(ClientConfig {
            timeout: TEST_UPSTREAM_TIMEOUT,
            ..ClientConfig::default()
        })?;

        Ok(AppState::new(self.tenant_store(), upstream)
            .with_clock(Arc::new(self.clock.clone()))
            .with_limits(Limits { request_timeout: Duration::from_secs(10), ..Limits::default() }))
    }

    /// Router wired to this environment.
    pub fn router(&self) -> Result<Router> {
        Ok(create_router(self.app_state()?))
    }

    /// Serves the router on an ephemeral local port.
    pub async fn spawn_server(&self) -> Result<TestServer> {
        let app = self.router()?;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(TestServer { addr, handle })
    }
}

/// A router served on a local port, stopped on drop.
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Socket address the server listens on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, without a trailing slash.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn written_tenants_are_loadable() {
        let env = TestEnv::new().await.unwrap();
        env.write_tenant(&TenantFixture::new("acme").verify_flow("https://flows.example/v"))
            .unwrap();

        let tenant = intake_core::TenantId::sanitize("acme").unwrap();
        let config = env.tenant_store().load(&tenant).await.unwrap();

        assert_eq!(config.upstream_for(intake_core::FlowKind::Verify), Some("https://flows.example/v"));
    }
}
