//! Page boot: tenant and language resolution, configuration loading and
//! page detection.

use std::sync::Arc;

use intake_core::{Clock, RealClock, TenantConfig};
use reqwest::Url;
use tracing::{info, instrument, warn};

use crate::{
    config::ControllerConfig,
    draft::{DraftStore, SessionDraftStore},
    error::{ClientError, Result},
    inspection::InspectionPage,
    page::PageContext,
    transport::Transport,
    verify::VerifyPage,
};

/// Query parameters of the page URL.
#[derive(Debug, Clone, Default)]
pub struct Location {
    params: Vec<(String, String)>,
}

impl Location {
    /// Parses a full page URL.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` when `url` does not parse.
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| ClientError::InvalidUrl { url: url.to_string(), message: e.to_string() })?;
        Ok(Self { params: parsed.query_pairs().into_owned().collect() })
    }

    /// Builds a location from a bare query string, with or without `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let params = Url::parse("http://localhost/")
            .map(|mut url| {
                url.set_query(Some(query));
                url.query_pairs().into_owned().collect()
            })
            .unwrap_or_default();
        Self { params }
    }

    /// First value of a query parameter. Empty values read as absent.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }
}

/// Picks the tenant from the `tenant` parameter, if it is allowed.
pub fn resolve_tenant(location: &Location, config: &ControllerConfig) -> String {
    location
        .param("tenant")
        .map(|t| t.trim().to_lowercase())
        .filter(|t| config.is_allowed_tenant(t))
        .unwrap_or_else(|| config.default_tenant.clone())
}

/// Picks the language: `lang` parameter, then document language, then the default.
pub fn resolve_lang(
    location: &Location,
    document_lang: Option<&str>,
    config: &ControllerConfig,
) -> String {
    location
        .param("lang")
        .or(document_lang.filter(|l| !l.is_empty()))
        .map_or_else(|| config.default_lang.clone(), str::to_string)
}

/// Which controller a page needs, from the markup it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Verify call-to-action only.
    Verify,
    /// Inspection form only.
    Inspection,
    /// Both.
    Both,
    /// Neither; nothing to wire.
    Unknown,
}

impl PageKind {
    /// Detects the page kind.
    pub fn detect(has_verify_cta: bool, has_inspection_form: bool) -> Self {
        match (has_verify_cta, has_inspection_form) {
            (true, true) => Self::Both,
            (true, false) => Self::Verify,
            (false, true) => Self::Inspection,
            (false, false) => Self::Unknown,
        }
    }

    fn has_verify(self) -> bool {
        matches!(self, Self::Verify | Self::Both)
    }

    fn has_inspection(self) -> bool {
        matches!(self, Self::Inspection | Self::Both)
    }
}

/// How the tenant configuration was obtained.
#[derive(Debug, Clone)]
pub enum ConfigResolution {
    /// The requested tenant's configuration.
    Loaded(TenantConfig),
    /// The default tenant's configuration, after the requested one failed.
    FallbackUsed {
        /// Default tenant configuration
        config: TenantConfig,
        /// Tenant that was asked for
        requested: String,
        /// Why the requested configuration was not used
        reason: ClientError,
    },
    /// Nothing usable could be loaded.
    Failed {
        /// Last failure
        reason: ClientError,
    },
}

impl ConfigResolution {
    /// The configuration, if one was loaded.
    pub fn config(&self) -> Option<&TenantConfig> {
        match self {
            Self::Loaded(config) | Self::FallbackUsed { config, .. } => Some(config),
            Self::Failed { .. } => None,
        }
    }

    /// Whether the default tenant stood in.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::FallbackUsed { .. })
    }
}

enum Fetch {
    Parsed(TenantConfig),
    Unavailable(ClientError),
    Corrupt(ClientError),
}

async fn fetch_config(
    transport: &dyn Transport,
    config: &ControllerConfig,
    tenant: &str,
) -> Fetch {
    let path = config.tenant_config_path(tenant);
    match transport.get(&path).await {
        Ok(reply) if reply.is_success() => match TenantConfig::from_slice(&reply.body) {
            Ok(tenant_config) => Fetch::Parsed(rebase_assets(tenant_config, config)),
            Err(e) => Fetch::Corrupt(ClientError::decode(path, e.to_string())),
        },
        Ok(reply) => Fetch::Unavailable(ClientError::Status {
            url: path,
            status: reply.status,
            body: reply.text(),
        }),
        Err(e) => Fetch::Unavailable(e),
    }
}

/// Rewrites logo and favicon paths through the base path.
fn rebase_assets(mut tenant_config: TenantConfig, config: &ControllerConfig) -> TenantConfig {
    for asset in [&mut tenant_config.assets.logo, &mut tenant_config.assets.favicon] {
        if let Some(path) = asset.as_mut() {
            *path = config.base_path.resolve(path);
        }
    }
    tenant_config
}

/// Loads a tenant's configuration, falling back to the default tenant's
/// when the fetch fails or returns a non-success status.
///
/// A configuration that is served but does not parse is reported as
/// `Failed` without a fallback.
#[instrument(skip(transport, config))]
pub async fn load_tenant_config(
    transport: &dyn Transport,
    config: &ControllerConfig,
    tenant: &str,
) -> ConfigResolution {
    let reason = match fetch_config(transport, config, tenant).await {
        Fetch::Parsed(tenant_config) => return ConfigResolution::Loaded(tenant_config),
        Fetch::Corrupt(reason) => {
            warn!(error = %reason, "Tenant configuration is not valid JSON");
            return ConfigResolution::Failed { reason };
        },
        Fetch::Unavailable(reason) => reason,
    };

    if tenant == config.default_tenant {
        warn!(error = %reason, "Default tenant configuration unavailable");
        return ConfigResolution::Failed { reason };
    }

    warn!(error = %reason, fallback = %config.default_tenant, "Falling back to default tenant configuration");
    match fetch_config(transport, config, &config.default_tenant).await {
        Fetch::Parsed(fallback) => ConfigResolution::FallbackUsed {
            config: fallback,
            requested: tenant.to_string(),
            reason,
        },
        Fetch::Unavailable(reason) | Fetch::Corrupt(reason) => {
            warn!(error = %reason, "Default tenant configuration unavailable");
            ConfigResolution::Failed { reason }
        },
    }
}

/// A page wired for its tenant.
#[derive(Debug)]
pub struct BootedPage {
    /// Resolved tenant.
    pub tenant: String,
    /// Resolved language.
    pub lang: String,
    /// Whether the default tenant's configuration stood in.
    pub fallback_used: bool,
    /// Loaded configuration.
    pub config: TenantConfig,
    /// Inspection controller, when the page has the form.
    pub inspection: Option<InspectionPage>,
    /// Verify controller, when the page has the call-to-action.
    pub verify: Option<VerifyPage>,
}

/// Entry point: boots pages against a site.
#[derive(Debug, Clone)]
pub struct Controller {
    config: ControllerConfig,
    transport: Arc<dyn Transport>,
    drafts: Arc<dyn DraftStore>,
    clock: Arc<dyn Clock>,
}

impl Controller {
    /// Creates a controller with a fresh session draft store and the wall clock.
    pub fn new(config: ControllerConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            drafts: Arc::new(SessionDraftStore::new()),
            clock: Arc::new(RealClock::new()),
        }
    }

    /// Replaces the draft store.
    #[must_use]
    pub fn with_drafts(mut self, drafts: Arc<dyn DraftStore>) -> Self {
        self.drafts = drafts;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Controller settings.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Resolves tenant and language, loads the configuration and wires the
    /// controllers `page` calls for.
    ///
    /// # Errors
    ///
    /// Returns the last load failure when no configuration could be loaded.
    #[instrument(skip_all, fields(tenant = tracing::field::Empty, page = ?page))]
    pub async fn boot(
        &self,
        location: &Location,
        document_lang: Option<&str>,
        page: PageKind,
    ) -> Result<BootedPage> {
        let tenant = resolve_tenant(location, &self.config);
        let lang = resolve_lang(location, document_lang, &self.config);
        tracing::Span::current().record("tenant", tenant.as_str());

        let resolution = load_tenant_config(self.transport.as_ref(), &self.config, &tenant).await;
        let fallback_used = resolution.is_fallback();
        let tenant_config = match resolution {
            ConfigResolution::Loaded(config) | ConfigResolution::FallbackUsed { config, .. } => {
                config
            },
            ConfigResolution::Failed { reason } => return Err(reason),
        };

        let ctx = PageContext {
            tenant: tenant.clone(),
            lang: lang.clone(),
            tenant_config: tenant_config.clone(),
            controller: self.config.clone(),
            transport: Arc::clone(&self.transport),
            drafts: Arc::clone(&self.drafts),
            clock: Arc::clone(&self.clock),
        };

        let verify = page.has_verify().then(|| {
            VerifyPage::new(
                ctx.clone(),
                location.param("idempotencyKey").map(str::to_string),
                location.param("target").map(str::to_string),
            )
        });
        let inspection = page.has_inspection().then(|| InspectionPage::new(ctx));

        info!(%lang, fallback_used, "Page booted");
        Ok(BootedPage { tenant, lang, fallback_used, config: tenant_config, inspection, verify })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::{config::BasePath, transport::HttpTransport};

    async fn serve_config(server: &MockServer, path: &str, status: u16, body: serde_json::Value) {
        Mock::given(matchers::method("GET"))
            .and(matchers::path(path))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    fn controller(server: &MockServer, config: ControllerConfig) -> Controller {
        let transport = HttpTransport::new(reqwest::Client::new(), &server.uri()).unwrap();
        Controller::new(config, Arc::new(transport))
    }

    #[test]
    fn tenant_resolution_uses_allow_list() {
        let config = ControllerConfig::default();

        let pick = |query: &str| resolve_tenant(&Location::from_query(query), &config);

        assert_eq!(pick("?tenant=%20EXTOZ%20"), "extoz");
        assert_eq!(pick("tenant=acme"), "default");
        assert_eq!(pick("tenant="), "default");
        assert_eq!(pick(""), "default");
    }

    #[test]
    fn language_resolution_order() {
        let config = ControllerConfig::default();

        assert_eq!(resolve_lang(&Location::from_query("lang=fr"), Some("de"), &config), "fr");
        assert_eq!(resolve_lang(&Location::from_query("lang="), Some("de"), &config), "de");
        assert_eq!(resolve_lang(&Location::default(), Some(""), &config), "en");
        assert_eq!(resolve_lang(&Location::default(), None, &config), "en");
    }

    #[test]
    fn location_parses_full_urls() {
        let location =
            Location::parse("https://site.example/verify.html?idempotencyKey=abc&target=email-link")
                .unwrap();

        assert_eq!(location.param("idempotencyKey"), Some("abc"));
        assert_eq!(location.param("target"), Some("email-link"));
        assert_eq!(location.param("tenant"), None);
        assert!(Location::parse("no scheme").is_err());
    }

    #[test]
    fn page_detection() {
        assert_eq!(PageKind::detect(true, false), PageKind::Verify);
        assert_eq!(PageKind::detect(false, true), PageKind::Inspection);
        assert_eq!(PageKind::detect(true, true), PageKind::Both);
        assert_eq!(PageKind::detect(false, false), PageKind::Unknown);
    }

    #[tokio::test]
    async fn loads_requested_tenant_and_rebases_assets() {
        let server = MockServer::start().await;
        serve_config(&server, "/site/tenants/extoz.json", 200, json!({
            "assets": {"logo": "img/extoz.svg", "favicon": "https://cdn.example/fav.ico"}
        }))
        .await;

        let config = ControllerConfig::default().with_base_path(BasePath::new(Some("/site/")));
        let transport = HttpTransport::new(reqwest::Client::new(), &server.uri()).unwrap();

        let resolution = load_tenant_config(&transport, &config, "extoz").await;

        let ConfigResolution::Loaded(loaded) = resolution else { panic!("expected Loaded") };
        assert_eq!(loaded.assets.logo.as_deref(), Some("/site/img/extoz.svg"));
        assert_eq!(loaded.assets.favicon.as_deref(), Some("https://cdn.example/fav.ico"));
    }

    #[tokio::test]
    async fn missing_tenant_falls_back_to_default() {
        let server = MockServer::start().await;
        serve_config(&server, "/tenants/ulysses.json", 404, json!({})).await;
        serve_config(&server, "/tenants/default.json", 200, json!({"id": "default"})).await;

        let transport = HttpTransport::new(reqwest::Client::new(), &server.uri()).unwrap();
        let resolution = load_tenant_config(&transport, &ControllerConfig::default(), "ulysses").await;

        assert!(resolution.is_fallback());
        let ConfigResolution::FallbackUsed { config, requested, reason } = resolution else {
            panic!("expected FallbackUsed")
        };
        assert_eq!(config.id.as_deref(), Some("default"));
        assert_eq!(requested, "ulysses");
        assert_eq!(reason.status(), Some(404));
    }

    #[tokio::test]
    async fn corrupt_config_does_not_fall_back() {
        let server = MockServer::start().await;
        Mock::given(matchers::path("/tenants/extoz.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{broken"))
            .mount(&server)
            .await;
        serve_config(&server, "/tenants/default.json", 200, json!({})).await;

        let transport = HttpTransport::new(reqwest::Client::new(), &server.uri()).unwrap();
        let resolution = load_tenant_config(&transport, &ControllerConfig::default(), "extoz").await;

        assert!(matches!(resolution, ConfigResolution::Failed { reason: ClientError::Decode { .. } }));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn default_tenant_failure_is_not_retried() {
        let server = MockServer::start().await;
        serve_config(&server, "/tenants/default.json", 500, json!({})).await;

        let transport = HttpTransport::new(reqwest::Client::new(), &server.uri()).unwrap();
        let resolution = load_tenant_config(&transport, &ControllerConfig::default(), "default").await;

        assert!(resolution.config().is_none());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn boot_wires_requested_pages() {
        let server = MockServer::start().await;
        serve_config(&server, "/tenants/freemano.json", 200, json!({
            "endpoints": {"verifyHttpFlow": "https://flows.example/verify"}
        }))
        .await;

        let location = Location::from_query("tenant=freemano&idempotencyKey=k-9&target=sms");
        let booted = controller(&server, ControllerConfig::default())
            .boot(&location, Some("en-AU"), PageKind::Verify)
            .await
            .unwrap();

        assert_eq!(booted.tenant, "freemano");
        assert_eq!(booted.lang, "en-AU");
        assert!(!booted.fallback_used);
        assert!(booted.inspection.is_none());
        let verify = booted.verify.unwrap();
        assert_eq!(verify.idempotency_key(), Some("k-9"));
        assert_eq!(verify.target(), Some("sms"));
    }

    #[tokio::test]
    async fn boot_fails_when_nothing_loads() {
        let server = MockServer::start().await;

        let result = controller(&server, ControllerConfig::default())
            .boot(&Location::from_query("tenant=extoz"), None, PageKind::Inspection)
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}
