//! Controller configuration and base-path handling.
//!
//! Everything the page script used to keep in module-level constants is
//! passed in explicitly through [`ControllerConfig`].

use serde::{Deserialize, Serialize};

/// Settings the controller is initialized with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Path prefix the site is served under.
    pub base_path: BasePath,
    /// Tenants the `tenant` query parameter may select.
    pub allowed_tenants: Vec<String>,
    /// Tenant used when the query names none or an unknown one.
    pub default_tenant: String,
    /// Language used when neither query nor document provide one.
    pub default_lang: String,
    /// Country calling code for local phone numbers, without `+`.
    pub phone_country_code: String,
    /// Country sent with inspection requests.
    pub country: String,
    /// Inspection endpoint, relative to the base path.
    pub inspection_api_path: String,
    /// Verification endpoint, relative to the base path.
    pub verify_api_path: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_path: BasePath::root(),
            allowed_tenants: ["default", "ulysses", "extoz", "freemano"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_tenant: "default".to_string(),
            default_lang: "en".to_string(),
            phone_country_code: "61".to_string(),
            country: "AU".to_string(),
            inspection_api_path: "api/inspection".to_string(),
            verify_api_path: "api/verify".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Replaces the base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: BasePath) -> Self {
        self.base_path = base_path;
        self
    }

    /// Whether `tenant` may be selected through the query string.
    pub fn is_allowed_tenant(&self, tenant: &str) -> bool {
        self.allowed_tenants.iter().any(|t| t == tenant)
    }

    /// Inspection endpoint resolved through the base path.
    pub fn inspection_endpoint(&self) -> String {
        self.base_path.resolve(&self.inspection_api_path)
    }

    /// Verification endpoint resolved through the base path.
    pub fn verify_endpoint(&self) -> String {
        self.base_path.resolve(&self.verify_api_path)
    }

    /// Path of a tenant's configuration document.
    pub fn tenant_config_path(&self, tenant: &str) -> String {
        self.base_path.resolve(&format!("/tenants/{tenant}.json"))
    }
}

/// Path prefix for a site served below the domain root.
///
/// Stored without a trailing `/`; the root is the empty string.
///
/// # Example
///
/// ```
/// use intake_client::BasePath;
///
/// let base = BasePath::new(Some("/extoz/"));
/// assert_eq!(base.resolve("/img/logo.svg"), "/extoz/img/logo.svg");
/// assert_eq!(base.resolve("api/verify"), "/extoz/api/verify");
/// assert_eq!(BasePath::new(Some("/")).resolve("api/verify"), "/api/verify");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasePath(String);

impl BasePath {
    /// Builds a base path from a deployment-provided value.
    ///
    /// One trailing `/` is dropped; absent, empty and `/` all mean the root.
    pub fn new(provided: Option<&str>) -> Self {
        let provided = provided.unwrap_or_default().trim();
        let trimmed = provided.strip_suffix('/').unwrap_or(provided);
        Self(trimmed.to_string())
    }

    /// The domain root.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// The prefix, empty for the root.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves a path against the base.
    ///
    /// Absolute `http(s)://` URLs pass through, `/x` becomes `<base>/x` and
    /// a relative `x` becomes `<base>/x`. Empty input stays empty.
    pub fn resolve(&self, path: &str) -> String {
        if path.is_empty() || is_absolute_url(path) {
            return path.to_string();
        }
        if path.starts_with('/') {
            return format!("{}{path}", self.0);
        }
        format!("{}/{}", self.0, path.trim_start_matches('/'))
    }
}

fn is_absolute_url(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
