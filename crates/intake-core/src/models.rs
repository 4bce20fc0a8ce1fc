//! Tenant identifiers and tenant configuration.
//!
//! A tenant configuration is a static JSON document, one per tenant, that
//! carries the origin allow-list, the upstream flow URLs and the branding
//! data the browser controller renders. The server only ever reads it.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::origin_matches;

/// Sanitized tenant identifier.
///
/// Only lowercase ASCII letters, digits and `-` survive sanitization, so a
/// `TenantId` is always safe to embed in a file name or URL path.
///
/// # Example
///
/// ```
/// use intake_core::TenantId;
///
/// let tenant = TenantId::sanitize("  Acme_Pest!").unwrap();
/// assert_eq!(tenant.as_str(), "acmepest");
/// assert!(TenantId::sanitize("$$$").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Lowercases `raw` and strips characters outside `[a-z0-9-]`.
    ///
    /// Returns `None` when nothing is left.
    pub fn sanitize(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
            .collect();

        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned))
        }
    }

    /// Extracts and sanitizes the `tenant` field of a JSON payload.
    ///
    /// Strings are used as-is, numbers and `true` are stringified, anything
    /// else counts as missing.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let raw = match payload.get("tenant") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(true)) => "true".to_string(),
            _ => String::new(),
        };
        Self::sanitize(&raw)
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of this tenant's configuration document.
    pub fn config_file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which upstream flow a request is headed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    /// Contact detail verification.
    Verify,
    /// Inspection request submission.
    Inspection,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verify => write!(f, "verify"),
            Self::Inspection => write!(f, "inspection"),
        }
    }
}

/// Per-tenant configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    /// Optional identifier echoed from the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Access policy and localized policy links.
    #[serde(default)]
    pub policy: Policy,
    /// Upstream flow URLs.
    #[serde(default)]
    pub endpoints: Endpoints,
    /// Localized UI text, keyed by text id then language.
    #[serde(default)]
    pub text: HashMap<String, Value>,
    /// Theme variables.
    #[serde(default)]
    pub css_vars: HashMap<String, Value>,
    /// Branding assets.
    #[serde(default)]
    pub assets: Assets,
    /// Services offered in the inspection form.
    #[serde(default)]
    pub services: Vec<ServiceOption>,
}

/// Tenant access policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Origins permitted to call the intake endpoints. Empty means any.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Remaining policy entries, such as localized privacy policy links.
    #[serde(flatten)]
    pub links: HashMap<String, Value>,
}

/// Upstream flow URLs for a tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    /// Verification flow, also the shared fallback for inspections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_http_flow: Option<String>,
    /// Dedicated inspection request flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection_request_flow: Option<String>,
}

/// Branding asset paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assets {
    /// Logo image path or URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Favicon path or URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

/// A selectable service in the inspection form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOption {
    /// Service code submitted with the request.
    pub id: String,
    /// Display label.
    pub label: String,
}

impl TenantConfig {
    /// Parses a configuration document.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Returns the upstream URL for a flow, if one is configured.
    ///
    /// Inspections prefer the dedicated inspection flow and fall back to the
    /// shared verification flow. Blank values count as absent.
    pub fn upstream_for(&self, flow: FlowKind) -> Option<&str> {
        let verify = non_blank(self.endpoints.verify_http_flow.as_deref());
        match flow {
            FlowKind::Verify => verify,
            FlowKind::Inspection => {
                non_blank(self.endpoints.inspection_request_flow.as_deref()).or(verify)
            },
        }
    }

    /// Checks a request origin against the allow-list.
    ///
    /// An absent or empty allow-list admits every origin, including a
    /// missing one.
    pub fn allows_origin(&self, origin: Option<&str>) -> bool {
        let allowed = &self.policy.allowed_origins;
        if allowed.is_empty() {
            return true;
        }

        let origin = origin.unwrap_or_default();
        allowed.iter().any(|candidate| origin_matches(candidate, origin))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
