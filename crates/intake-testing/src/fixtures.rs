//! Tenant configuration and payload builders.

use serde_json::{json, Map, Value};

/// Builder for tenant configuration documents.
#[derive(Debug, Clone)]
pub struct TenantFixture {
    id: String,
    allowed_origins: Vec<String>,
    verify_flow: Option<String>,
    inspection_flow: Option<String>,
    services: Vec<(String, String)>,
    text: Map<String, Value>,
}

impl TenantFixture {
    /// Starts a document for `id` with no policy and no flows.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            allowed_origins: Vec::new(),
            verify_flow: None,
            inspection_flow: None,
            services: Vec::new(),
            text: Map::new(),
        }
    }

    /// Tenant identifier, used as the file name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Adds an allowed origin.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    /// Sets `endpoints.verifyHttpFlow`.
    #[must_use]
    pub fn verify_flow(mut self, url: impl Into<String>) -> Self {
        self.verify_flow = Some(url.into());
        self
    }

    /// Sets `endpoints.inspectionRequestFlow`.
    #[must_use]
    pub fn inspection_flow(mut self, url: impl Into<String>) -> Self {
        self.inspection_flow = Some(url.into());
        self
    }

    /// Adds a selectable service.
    #[must_use]
    pub fn service(mut self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.services.push((id.into(), label.into()));
        self
    }

    /// Adds a localized text entry.
    #[must_use]
    pub fn text(mut self, key: impl Into<String>, lang: &str, value: impl Into<String>) -> Self {
        let entry = self.text.entry(key.into()).or_insert_with(|| json!({}));
        if let Value::Object(map) = entry {
            map.insert(lang.to_string(), Value::String(value.into()));
        }
        self
    }

    /// Renders the configuration document.
    pub fn to_json(&self) -> Value {
        let mut endpoints = Map::new();
        if let Some(url) = &self.verify_flow {
            endpoints.insert("verifyHttpFlow".into(), json!(url));
        }
        if let Some(url) = &self.inspection_flow {
            endpoints.insert("inspectionRequestFlow".into(), json!(url));
        }

        let services: Vec<Value> = self
            .services
            .iter()
            .map(|(id, label)| json!({ "id": id, "label": label }))
            .collect();

        json!({
            "id": self.id,
            "policy": { "allowedOrigins": self.allowed_origins },
            "endpoints": endpoints,
            "text": self.text,
            "services": services,
        })
    }
}

/// A complete inspection payload that passes validation.
pub fn inspection_payload(tenant: &str, idempotency_key: &str) -> Value {
    json!({
        "tenant": tenant,
        "lang": "en",
        "source": "inspection-request",
        "idempotencyKey": idempotency_key,
        "title": "Ms",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.com",
        "phone": "+61412345678",
        "prefMethod": "email",
        "address1": "1 Analytical St",
        "suburb": "Marrickville",
        "state": "NSW",
        "postcode": "2204",
        "country": "AU",
        "service": [{ "code": "pest", "quantity": 1 }],
        "preferences": [{ "date": "2026-11-02", "time": "09:30", "localDateTime": "2026-11-02T09:30" }],
        "metadata": { "policyAccepted": true, "termsAccepted": true }
    })
}

/// A verification payload.
pub fn verification_payload(tenant: &str, idempotency_key: &str) -> Value {
    json!({
        "tenant": tenant,
        "lang": "en",
        "source": "verify",
        "target": "email:ada@example.com",
        "idempotencyKey": idempotency_key,
        "submittedUtc": "2026-10-19T08:00:00Z"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_renders_camel_case_document() {
        let doc = TenantFixture::new("acme")
            .allow_origin("https://acme.example")
            .verify_flow("https://flows.example/verify")
            .service("pest", "Pest inspection")
            .text("title", "en", "Book an inspection")
            .to_json();

        assert_eq!(doc["policy"]["allowedOrigins"][0], "https://acme.example");
        assert_eq!(doc["endpoints"]["verifyHttpFlow"], "https://flows.example/verify");
        assert!(doc["endpoints"].get("inspectionRequestFlow").is_none());
        assert_eq!(doc["services"][0]["id"], "pest");
        assert_eq!(doc["text"]["title"]["en"], "Book an inspection");
    }
}
