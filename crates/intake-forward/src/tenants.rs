//! Tenant configurations served as static assets over HTTP.

use async_trait::async_trait;
use intake_core::{TenantConfig, TenantId, TenantLoadError, TenantStore};
use tracing::{debug, instrument, warn};

/// Fetches `<base_url>/tenants/<tenant>.json`.
#[derive(Debug, Clone)]
pub struct HttpTenantStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTenantStore {
    /// Creates a store that fetches from `base_url`.
    ///
    /// A trailing `/` on the base URL is ignored.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url_for(&self, tenant: &TenantId) -> String {
        format!("{}/tenants/{}", self.base_url, tenant.config_file_name())
    }
}

#[async_trait]
impl TenantStore for HttpTenantStore {
    #[instrument(name = "load_tenant_http", skip_all, fields(tenant = %tenant))]
    async fn load(&self, tenant: &TenantId) -> Result<TenantConfig, TenantLoadError> {
        let location = self.url_for(tenant);
        debug!(url = %location, "Fetching tenant config");

        let response = self.client.get(&location).send().await.map_err(|e| {
            warn!(error = %e, "Tenant config fetch failed");
            TenantLoadError::Transport { location: location.clone(), message: e.to_string() }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TenantLoadError::Status { location, status: status.as_u16() });
        }

        let bytes = response.bytes().await.map_err(|e| TenantLoadError::Transport {
            location: location.clone(),
            message: e.to_string(),
        })?;

        TenantConfig::from_slice(&bytes).map_err(|source| TenantLoadError::Parse { location, source })
    }

    fn describe(&self) -> String {
        format!("http:{}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;

    fn tenant(id: &str) -> TenantId {
        TenantId::sanitize(id).unwrap()
    }

    #[tokio::test]
    async fn fetches_config_from_static_path() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/tenants/acme.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "policy": {"allowedOrigins": ["https://acme.example"]}
            })))
            .mount(&server)
            .await;

        let store = HttpTenantStore::new(reqwest::Client::new(), format!("{}/", server.uri()));
        let config = store.load(&tenant("acme")).await.unwrap();

        assert_eq!(config.policy.allowed_origins, vec!["https://acme.example".to_string()]);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = HttpTenantStore::new(reqwest::Client::new(), server.uri());
        let err = store.load(&tenant("missing")).await.unwrap_err();

        assert!(matches!(err, TenantLoadError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let store = HttpTenantStore::new(reqwest::Client::new(), server.uri());
        let err = store.load(&tenant("acme")).await.unwrap_err();

        assert!(matches!(err, TenantLoadError::Parse { .. }));
    }
}
