//! Configuration management for the intake proxy.

use std::{net::SocketAddr, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use intake_core::{FileTenantStore, TenantStore};
use intake_forward::{ClientConfig, HttpTenantStore, UpstreamClient};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "intake.toml";

/// Where tenant configuration documents are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantSource {
    /// `<tenant_dir>/<tenant>.json` on local disk.
    File,
    /// `<tenant_base_url>/tenants/<tenant>.json` over HTTP.
    Http,
}

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`intake.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// # Example
///
/// ```no_run
/// use intake_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// Whole-request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,
    /// Largest accepted request body in bytes.
    ///
    /// Environment variable: `MAX_BODY_BYTES`
    #[serde(default = "default_max_body_bytes", alias = "MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    // Tenants
    /// Tenant configuration source.
    ///
    /// Environment variable: `TENANT_SOURCE` (`file` or `http`)
    #[serde(default = "default_tenant_source", alias = "TENANT_SOURCE")]
    pub tenant_source: TenantSource,
    /// Directory of tenant documents for the `file` source.
    ///
    /// Environment variable: `TENANT_DIR`
    #[serde(default = "default_tenant_dir", alias = "TENANT_DIR")]
    pub tenant_dir: PathBuf,
    /// Site URL publishing tenant documents for the `http` source.
    ///
    /// Environment variable: `TENANT_BASE_URL`
    #[serde(default, alias = "TENANT_BASE_URL")]
    pub tenant_base_url: Option<String>,
    /// Serve `GET /tenants/{tenant}.json` from the configured source.
    ///
    /// Environment variable: `SERVE_TENANT_CONFIGS`
    #[serde(default = "default_serve_tenant_configs", alias = "SERVE_TENANT_CONFIGS")]
    pub serve_tenant_configs: bool,

    // Upstream
    /// Upstream exchange timeout in seconds.
    ///
    /// Environment variable: `UPSTREAM_TIMEOUT_SECONDS`
    #[serde(default = "default_upstream_timeout", alias = "UPSTREAM_TIMEOUT_SECONDS")]
    pub upstream_timeout_seconds: u64,
    /// User agent sent to upstream flows.
    ///
    /// Environment variable: `UPSTREAM_USER_AGENT`
    #[serde(default = "default_user_agent", alias = "UPSTREAM_USER_AGENT")]
    pub upstream_user_agent: String,
    /// Redirects followed when calling upstream flows.
    ///
    /// Environment variable: `UPSTREAM_MAX_REDIRECTS`
    #[serde(default = "default_max_redirects", alias = "UPSTREAM_MAX_REDIRECTS")]
    pub upstream_max_redirects: u32,

    // Logging
    /// Log level configuration.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides.
    ///
    /// # Errors
    ///
    /// Fails when a source cannot be parsed or the merged values are invalid.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to upstream client configuration.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.upstream_timeout_seconds),
            user_agent: self.upstream_user_agent.clone(),
            max_redirects: self.upstream_max_redirects,
        }
    }

    /// Whole-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Builds the tenant store selected by `tenant_source`.
    ///
    /// The HTTP store shares the upstream client's connection pool.
    ///
    /// # Errors
    ///
    /// Fails when the `http` source has no base URL.
    pub fn build_tenant_store(&self, upstream: &UpstreamClient) -> Result<Arc<dyn TenantStore>> {
        match self.tenant_source {
            TenantSource::File => Ok(Arc::new(FileTenantStore::new(&self.tenant_dir))),
            TenantSource::Http => {
                let base_url = self
                    .tenant_base_url
                    .as_deref()
                    .filter(|url| !url.trim().is_empty())
                    .context("tenant_base_url is required when tenant_source is http")?;
                Ok(Arc::new(HttpTenantStore::new(upstream.http().clone(), base_url)))
            },
        }
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than 0");
        }

        if self.upstream_timeout_seconds == 0 {
            anyhow::bail!("upstream_timeout_seconds must be greater than 0");
        }

        if self.tenant_source == TenantSource::Http
            && self.tenant_base_url.as_deref().map_or(true, |url| url.trim().is_empty())
        {
            anyhow::bail!("tenant_base_url is required when tenant_source is http");
        }

        // An http tenant source spends one upstream budget on the tenant
        // lookup and another on the flow itself.
        let upstream_calls = match self.tenant_source {
            TenantSource::File => 1,
            TenantSource::Http => 2,
        };
        if self.request_timeout <= self.upstream_timeout_seconds.saturating_mul(upstream_calls) {
            anyhow::bail!(
                "request_timeout ({}s) must exceed {} x upstream_timeout_seconds ({}s)",
                self.request_timeout,
                upstream_calls,
                self.upstream_timeout_seconds
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
            tenant_source: default_tenant_source(),
            tenant_dir: default_tenant_dir(),
            tenant_base_url: None,
            serve_tenant_configs: default_serve_tenant_configs(),
            upstream_timeout_seconds: default_upstream_timeout(),
            upstream_user_agent: default_user_agent(),
            upstream_max_redirects: default_max_redirects(),
            rust_log: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    45
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_tenant_source() -> TenantSource {
    TenantSource::File
}

fn default_tenant_dir() -> PathBuf {
    PathBuf::from("tenants")
}

fn default_serve_tenant_configs() -> bool {
    true
}

fn default_upstream_timeout() -> u64 {
    intake_forward::DEFAULT_TIMEOUT_SECONDS
}

fn default_user_agent() -> String {
    "Intake-Forwarder/1.0".to_string()
}

fn default_max_redirects() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, env, sync::Mutex};

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct TestEnvGuard {
        _lock: std::sync::MutexGuard<'static, ()>,
        vars: Vec<String>,
        originals: HashMap<String, Option<String>>,
    }

    impl TestEnvGuard {
        fn new() -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Self { _lock: lock, vars: Vec::new(), originals: HashMap::new() }
        }

        fn set_var(&mut self, key: &str, value: &str) {
            if !self.vars.contains(&key.to_string()) {
                self.originals.insert(key.to_string(), env::var(key).ok());
                self.vars.push(key.to_string());
            }
            env::set_var(key, value);
        }
    }

    impl Drop for TestEnvGuard {
        fn drop(&mut self) {
            for var in &self.vars {
                match self.originals.get(var) {
                    Some(Some(value)) => env::set_var(var, value),
                    Some(None) => env::remove_var(var),
                    None => {},
                }
            }
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.tenant_source, TenantSource::File);
        assert_eq!(config.tenant_dir, PathBuf::from("tenants"));
        assert!(config.serve_tenant_configs);
        assert_eq!(config.upstream_timeout_seconds, 30);
    }

    #[test]
    fn env_overrides_defaults() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("PORT", "9191");
        guard.set_var("TENANT_SOURCE", "http");
        guard.set_var("TENANT_BASE_URL", "https://forms.example");
        guard.set_var("UPSTREAM_TIMEOUT_SECONDS", "12");
        guard.set_var("MAX_BODY_BYTES", "2048");
        guard.set_var("SERVE_TENANT_CONFIGS", "false");
        guard.set_var("RUST_LOG", "info,intake=debug");

        let config = Config::load().expect("Config should load with env overrides");

        assert_eq!(config.port, 9191);
        assert_eq!(config.tenant_source, TenantSource::Http);
        assert_eq!(config.tenant_base_url.as_deref(), Some("https://forms.example"));
        assert_eq!(config.max_body_bytes, 2048);
        assert!(!config.serve_tenant_configs);
        assert_eq!(config.rust_log, "info,intake=debug");
        assert_eq!(config.to_client_config().timeout, Duration::from_secs(12));
    }

    #[test]
    fn http_source_without_base_url_fails() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("TENANT_SOURCE", "http");
        guard.set_var("TENANT_BASE_URL", "");

        assert!(Config::load().is_err());
    }

    #[test]
    fn invalid_config_validation_fails() {
        let mut config = Config::default();
        config.port = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.max_body_bytes = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.upstream_timeout_seconds = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.tenant_source = TenantSource::Http;
        assert!(config.validate().is_err());
    }

    #[test]
    fn request_timeout_must_outlast_upstream_calls() {
        let mut config = Config::default();
        config.request_timeout = 30;
        assert!(config.validate().is_err());

        config.request_timeout = 31;
        assert!(config.validate().is_ok());

        config.tenant_source = TenantSource::Http;
        config.tenant_base_url = Some("https://forms.example".into());
        config.request_timeout = 45;
        assert!(config.validate().is_err());

        config.request_timeout = 60;
        assert!(config.validate().is_err());

        config.request_timeout = 61;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn request_timeout_below_upstream_is_rejected_on_load() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("REQUEST_TIMEOUT", "10");
        guard.set_var("UPSTREAM_TIMEOUT_SECONDS", "20");

        let err = Config::load().unwrap_err();
        assert!(err.to_string().contains("request_timeout"), "unexpected error: {err:#}");
    }

    #[test]
    fn builds_store_for_each_source() {
        let upstream = UpstreamClient::with_defaults().unwrap();

        let mut config = Config::default();
        config.tenant_dir = PathBuf::from("/srv/tenants");
        let store = config.build_tenant_store(&upstream).unwrap();
        assert_eq!(store.describe(), "file:/srv/tenants");

        config.tenant_source = TenantSource::Http;
        config.tenant_base_url = Some("https://forms.example/".into());
        let store = config.build_tenant_store(&upstream).unwrap();
        assert_eq!(store.describe(), "http:https://forms.example");
    }

    #[test]
    fn socket_address_parsing() {
        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.port = 9000;

        let addr = config.parse_server_addr().expect("Should parse socket address");

        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 9000);
    }
}
