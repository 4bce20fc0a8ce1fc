//! HTTP client that relays validated payloads to tenant upstream flows.
//!
//! The client sends the caller's original bytes, never a re-serialized copy,
//! and hands back whatever status and body the upstream produced. Only
//! transport failures surface as errors.

use std::time::{Duration, Instant};

use bytes::Bytes;
use intake_core::FlowKind;
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::error::{ForwardError, Result};

/// Configuration for the upstream client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Timeout for a complete upstream exchange.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Maximum number of redirects to follow.
    pub max_redirects: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "Intake-Forwarder/1.0".to_string(),
            max_redirects: 3,
        }
    }
}

/// A validated payload ready to be relayed.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    /// Request identifier, propagated as `X-Request-Id`.
    pub request_id: Uuid,
    /// Sanitized tenant identifier, for tracing only.
    pub tenant: String,
    /// Flow being invoked.
    pub flow: FlowKind,
    /// Upstream flow URL.
    pub url: String,
    /// Original JSON body, unchanged.
    pub body: Bytes,
}

/// What the upstream answered.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Raw response body.
    pub body: Bytes,
    /// Total duration of the exchange.
    pub duration: Duration,
    /// Whether the status was 2xx.
    pub is_success: bool,
}

impl UpstreamResponse {
    /// Body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client for upstream flows.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl UpstreamClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `ForwardError::ConfigurationError` if the HTTP client cannot
    /// be built from the provided settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
            .build()
            .map_err(|e| ForwardError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Creates a new client with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Underlying HTTP client, for sharing the connection pool.
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Relays a payload to its upstream flow.
    ///
    /// # Errors
    ///
    /// - `Timeout` when the exchange exceeds the configured timeout
    /// - `NetworkError` for connection and protocol failures
    /// - `BodyError` when the response body cannot be read
    ///
    /// Non-2xx statuses are returned as `Ok`.
    pub async fn forward(&self, request: ForwardRequest) -> Result<UpstreamResponse> {
        let span = info_span!(
            "upstream_forward",
            request_id = %request.request_id,
            tenant = %request.tenant,
            flow = %request.flow,
            url = %request.url,
        );

        async move {
            let start_time = Instant::now();
            tracing::debug!(body_bytes = request.body.len(), "Forwarding payload upstream");

            let result = self
                .client
                .post(&request.url)
                .header("content-type", "application/json")
                .header("x-request-id", request.request_id.to_string())
                .body(request.body)
                .send()
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    let duration = start_time.elapsed();
                    tracing::warn!(
                        duration_ms = duration.as_millis(),
                        "Upstream request failed: {}",
                        e
                    );

                    if e.is_timeout() {
                        return Err(ForwardError::timeout(self.config.timeout.as_secs()));
                    }
                    if e.is_connect() {
                        return Err(ForwardError::network(format!("connection failed: {e}")));
                    }
                    return Err(ForwardError::network(e.to_string()));
                },
            };

            let status = response.status();
            let body = response.bytes().await.map_err(|e| {
                tracing::warn!("Failed to read upstream response body: {}", e);
                ForwardError::body(e.to_string())
            })?;
            let duration = start_time.elapsed();

            if status.is_success() {
                tracing::info!(
                    status = status.as_u16(),
                    duration_ms = duration.as_millis(),
                    "Upstream accepted payload"
                );
            } else {
                tracing::warn!(
                    status = status.as_u16(),
                    duration_ms = duration.as_millis(),
                    "Upstream rejected payload"
                );
            }

            Ok(UpstreamResponse {
                status_code: status.as_u16(),
                body,
                duration,
                is_success: status.is_success(),
            })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;

    fn create_test_request(url: String, body: &'static str) -> ForwardRequest {
        ForwardRequest {
            request_id: Uuid::new_v4(),
            tenant: "acme".to_string(),
            flow: FlowKind::Inspection,
            url,
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[tokio::test]
    async fn successful_forward() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/flow"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .mount(&mock_server)
            .await;

        let client = UpstreamClient::with_defaults().unwrap();
        let request = create_test_request(format!("{}/flow", mock_server.uri()), "{}");

        let response = client.forward(request).await.unwrap();
        assert_eq!(response.status_code, 200);
        assert!(response.is_success);
        assert_eq!(response.body_text(), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn body_forwarded_byte_for_byte() {
        let mock_server = MockServer::start().await;
        let body = r#"{"tenant":"acme",  "zeta":1,"alpha":2}"#;

        Mock::given(matchers::method("POST"))
            .and(matchers::body_string(body))
            .and(matchers::header("content-type", "application/json"))
            .and(matchers::header_exists("x-request-id"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = UpstreamClient::with_defaults().unwrap();
        let response = client.forward(create_test_request(mock_server.uri(), body)).await.unwrap();

        assert_eq!(response.status_code, 202);
    }

    #[tokio::test]
    async fn upstream_errors_are_responses() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad postcode"))
            .mount(&mock_server)
            .await;

        let client = UpstreamClient::with_defaults().unwrap();
        let response = client.forward(create_test_request(mock_server.uri(), "{}")).await.unwrap();

        assert_eq!(response.status_code, 422);
        assert_eq!(response.body_text(), "bad postcode");
        assert!(!response.is_success);
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&mock_server)
            .await;

        let config = ClientConfig { timeout: Duration::from_millis(100), ..Default::default() };
        let client = UpstreamClient::new(config).unwrap();

        let result = client.forward(create_test_request(mock_server.uri(), "{}")).await;
        assert!(matches!(result, Err(ForwardError::Timeout { .. })));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = UpstreamClient::with_defaults().unwrap();
        let result = client.forward(create_test_request(format!("http://{addr}/flow"), "{}")).await;

        assert!(matches!(result, Err(ForwardError::NetworkError { .. })));
    }
}
