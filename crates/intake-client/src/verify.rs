//! Verification page.

use intake_core::{FlowKind, VerificationRequest};
use tracing::{info, instrument, warn};

use crate::{
    busy::BusyGuard,
    error::ClientError,
    page::{Outcome, PageContext},
};

/// Intro shown when the user arrived from an email link.
pub const EMAIL_INTRO: &str =
    "When you click verify we will confirm your email details you provided.";
/// Intro shown otherwise.
pub const PHONE_INTRO: &str =
    "When you click verify we will confirm your phone details you provided.";
/// Shown when the tenant has no verification upstream.
pub const NOT_CONFIGURED_MESSAGE: &str = "No verification endpoint is configured for this tenant.";
/// Shown when the proxy call fails.
pub const FAILURE_MESSAGE: &str = "Could not verify right now. Please try again.";
/// Shown after a successful verification.
pub const SUCCESS_MESSAGE: &str = "Thanks! We’ve verified your details.";

const SOURCE: &str = "verify-page";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Controller for the verification call-to-action.
#[derive(Debug)]
pub struct VerifyPage {
    ctx: PageContext,
    busy: BusyGuard,
    idempotency_key: Option<String>,
    target: Option<String>,
}

impl VerifyPage {
    /// Creates the page from the `idempotencyKey` and `target` query values.
    pub fn new(ctx: PageContext, idempotency_key: Option<String>, target: Option<String>) -> Self {
        Self { ctx, busy: BusyGuard::new(), idempotency_key, target }
    }

    /// Page context.
    pub fn context(&self) -> &PageContext {
        &self.ctx
    }

    /// Key of the submission being verified.
    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    /// Where the user came from.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Whether a verification is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Intro text for the arrival channel.
    pub fn intro_message(&self) -> &'static str {
        match self.target.as_deref() {
            Some(target) if target.starts_with("email") => EMAIL_INTRO,
            _ => PHONE_INTRO,
        }
    }

    /// Builds the request the proxy receives.
    pub fn build_payload(&self) -> VerificationRequest {
        VerificationRequest {
            tenant: self.ctx.tenant.clone(),
            lang: self.ctx.lang.clone(),
            source: SOURCE.to_string(),
            target: self.target.clone(),
            idempotency_key: self.idempotency_key.clone(),
            submitted_utc: self.ctx.clock.now_utc(),
        }
    }

    /// Calls the verification endpoint.
    #[instrument(name = "verify_contact", skip_all, fields(tenant = %self.ctx.tenant))]
    pub async fn verify(&self) -> Outcome {
        if self.ctx.tenant_config.upstream_for(FlowKind::Verify).is_none() {
            return Outcome::NotConfigured { message: NOT_CONFIGURED_MESSAGE };
        }

        let Some(_token) = self.busy.try_acquire() else {
            return Outcome::Busy;
        };

        let endpoint = self.ctx.controller.verify_endpoint();
        let body = match serde_json::to_vec(&self.build_payload()) {
            Ok(body) => body,
            Err(e) => {
                return Outcome::Failed {
                    message: FAILURE_MESSAGE,
                    error: ClientError::decode(endpoint, e.to_string()),
                }
            },
        };

        let headers: Vec<(&str, String)> = self
            .idempotency_key
            .iter()
            .map(|key| (IDEMPOTENCY_HEADER, key.clone()))
            .collect();

        match self.ctx.transport.post_json(&endpoint, &headers, body).await {
            Ok(reply) if reply.is_success() => {
                info!(status = reply.status, "Contact details verified");
                Outcome::Submitted { message: SUCCESS_MESSAGE, reply }
            },
            Ok(reply) => {
                warn!(status = reply.status, "Verification rejected");
                Outcome::Failed {
                    message: FAILURE_MESSAGE,
                    error: ClientError::Status { url: endpoint, status: reply.status, body: reply.text() },
                }
            },
            Err(error) => {
                warn!(error = %error, "Verification failed");
                Outcome::Failed { message: FAILURE_MESSAGE, error }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use intake_core::{TenantConfig, TestClock};
    use serde_json::{json, Value};
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::{config::ControllerConfig, draft::SessionDraftStore, transport::HttpTransport};

    fn page(server: &MockServer, config: Value, key: Option<&str>, target: Option<&str>) -> VerifyPage {
        let ctx = PageContext {
            tenant: "ulysses".into(),
            lang: "en".into(),
            tenant_config: serde_json::from_value::<TenantConfig>(config).unwrap(),
            controller: ControllerConfig::default(),
            transport: Arc::new(HttpTransport::new(reqwest::Client::new(), &server.uri()).unwrap()),
            drafts: Arc::new(SessionDraftStore::new()),
            clock: Arc::new(TestClock::new()),
        };
        VerifyPage::new(ctx, key.map(String::from), target.map(String::from))
    }

    fn configured() -> Value {
        json!({"endpoints": {"verifyHttpFlow": "https://flows.example/verify"}})
    }

    #[tokio::test]
    async fn verify_posts_payload_with_idempotency_header() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/api/verify"))
            .and(matchers::header("idempotency-key", "key-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"verified": true})))
            .expect(1)
            .mount(&server)
            .await;

        let page = page(&server, configured(), Some("key-42"), Some("email-link"));
        let outcome = page.verify().await;

        assert_eq!(outcome.message(), Some(SUCCESS_MESSAGE));
        assert!(!page.is_busy());

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["tenant"], "ulysses");
        assert_eq!(body["source"], "verify-page");
        assert_eq!(body["target"], "email-link");
        assert_eq!(body["idempotencyKey"], "key-42");
        assert!(body["submittedUtc"].is_string());
    }

    #[tokio::test]
    async fn verify_without_key_sends_no_header() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let page = page(&server, configured(), None, None);
        assert!(page.verify().await.is_success());

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("idempotency-key").is_none());
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body["idempotencyKey"].is_null());
    }

    #[tokio::test]
    async fn inspection_flow_alone_does_not_enable_verify() {
        let server = MockServer::start().await;
        let config = json!({"endpoints": {"inspectionRequestFlow": "https://flows.example/inspect"}});

        let outcome = page(&server, config, Some("k"), None).verify().await;

        assert_eq!(outcome.message(), Some(NOT_CONFIGURED_MESSAGE));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_verification_reports_retry_message() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Origin not allowed"})))
            .mount(&server)
            .await;

        let outcome = page(&server, configured(), Some("k"), None).verify().await;

        assert_eq!(outcome.message(), Some(FAILURE_MESSAGE));
        assert!(!outcome.is_success());
        let Outcome::Failed { error, .. } = outcome else { panic!("expected Failed") };
        assert_eq!(error.status(), Some(403));
    }

    #[tokio::test]
    async fn intro_follows_target() {
        let server = MockServer::start().await;

        assert_eq!(page(&server, configured(), None, Some("email-link")).intro_message(), EMAIL_INTRO);
        assert_eq!(page(&server, configured(), None, Some("sms")).intro_message(), PHONE_INTRO);
        assert_eq!(page(&server, configured(), None, None).intro_message(), PHONE_INTRO);
    }
}
