//! Tenant configuration lookup.
//!
//! Stores are keyed by a sanitized [`TenantId`]. Errors carry enough detail
//! for logging, but callers are expected to collapse every variant into a
//! single "tenant unavailable" outcome: a missing file and a corrupt one
//! look the same from the outside.

use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::models::{TenantConfig, TenantId};

/// Why a tenant configuration could not be loaded.
#[derive(Debug, Error)]
pub enum TenantLoadError {
    /// The configuration document could not be read.
    #[error("failed to read tenant config {location}: {source}")]
    Read {
        /// Path or URL that was read
        location: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The configuration document is not valid JSON for a tenant.
    #[error("failed to parse tenant config {location}: {source}")]
    Parse {
        /// Path or URL that was read
        location: String,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// A remote store answered with a non-success status.
    #[error("tenant config fetch from {location} returned HTTP {status}")]
    Status {
        /// URL that was fetched
        location: String,
        /// HTTP status code
        status: u16,
    },

    /// A remote store could not be reached.
    #[error("tenant config fetch from {location} failed: {message}")]
    Transport {
        /// URL that was fetched
        location: String,
        /// Transport error message
        message: String,
    },
}

/// Source of tenant configuration documents.
#[async_trait]
pub trait TenantStore: Send + Sync + std::fmt::Debug {
    /// Loads the configuration for `tenant`.
    async fn load(&self, tenant: &TenantId) -> Result<TenantConfig, TenantLoadError>;

    /// Checks that the store itself is reachable.
    async fn health_check(&self) -> Result<(), String> {
        Ok(())
    }

    /// Human readable description of where configurations come from.
    fn describe(&self) -> String;
}

/// Reads `<dir>/<tenant>.json` from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileTenantStore {
    dir: PathBuf,
}

impl FileTenantStore {
    /// Creates a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the configuration documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, tenant: &TenantId) -> PathBuf {
        self.dir.join(tenant.config_file_name())
    }
}

#[async_trait]
impl TenantStore for FileTenantStore {
    #[instrument(name = "load_tenant_file", skip_all, fields(tenant = %tenant))]
    async fn load(&self, tenant: &TenantId) -> Result<TenantConfig, TenantLoadError> {
        let path = self.path_for(tenant);
        let location = path.display().to_string();
        debug!(path = %location, "Loading tenant config");

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| TenantLoadError::Read { location: location.clone(), source })?;

        TenantConfig::from_slice(&bytes).map_err(|source| TenantLoadError::Parse { location, source })
    }

    async fn health_check(&self) -> Result<(), String> {
        match tokio::fs::metadata(&self.dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(format!("{} is not a directory", self.dir.display())),
            Err(e) => Err(format!("{}: {e}", self.dir.display())),
        }
    }

    fn describe(&self) -> String {
        format!("file:{}", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: &str) -> TenantId {
        TenantId::sanitize(id).unwrap()
    }

    #[tokio::test]
    async fn loads_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("acme.json"),
            r#"{"endpoints": {"verifyHttpFlow": "https://flows.example/verify"}}"#,
        )
        .unwrap();

        let store = FileTenantStore::new(dir.path());
        let config = store.load(&tenant("acme")).await.unwrap();

        assert_eq!(config.endpoints.verify_http_flow.as_deref(), Some("https://flows.example/verify"));
    }

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTenantStore::new(dir.path());

        let err = store.load(&tenant("nobody")).await.unwrap_err();
        assert!(matches!(err, TenantLoadError::Read { .. }));
    }

    #[tokio::test]
    async fn corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let store = FileTenantStore::new(dir.path());
        let err = store.load(&tenant("broken")).await.unwrap_err();
        assert!(matches!(err, TenantLoadError::Parse { .. }));
    }

    #[tokio::test]
    async fn health_check_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileTenantStore::new(dir.path()).health_check().await.is_ok());
        assert!(FileTenantStore::new(dir.path().join("missing")).health_check().await.is_err());
    }
}
