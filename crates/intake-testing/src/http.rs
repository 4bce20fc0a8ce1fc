//! Upstream flow mocking.

use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub use wiremock::Request as RecordedRequest;

/// Mock server standing in for tenant upstream flows.
pub struct MockUpstream {
    server: MockServer,
}

impl MockUpstream {
    /// Starts a new mock server on a random port.
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    /// Returns the base URL of the mock server.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Absolute URL of a flow path on this server.
    pub fn flow_url(&self, flow_path: &str) -> String {
        format!("{}{}", self.server.uri(), flow_path)
    }

    /// Configures a flow to answer with a fixed response.
    pub async fn mock_flow(&self, flow: MockFlow) {
        let mut template = ResponseTemplate::new(flow.status).set_body_bytes(flow.body.to_vec());
        if let Some(delay) = flow.delay {
            template = template.set_delay(delay);
        }

        let mut mock = Mock::given(method("POST")).and(path(flow.path.clone()));
        for (key, value) in &flow.expected_headers {
            mock = mock.and(header(key.as_str(), value.as_str()));
        }

        mock.respond_with(template).mount(&self.server).await;
    }

    /// Returns all requests received by the server.
    pub async fn received_requests(&self) -> Vec<RecordedRequest> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Asserts that exactly n requests were received.
    pub async fn assert_request_count(&self, expected: usize) {
        let requests = self.received_requests().await;
        assert_eq!(
            requests.len(),
            expected,
            "Expected {} upstream requests, received {}",
            expected,
            requests.len()
        );
    }
}

/// Configuration for a mocked upstream flow.
pub struct MockFlow {
    /// Flow path, such as `/flows/verify`.
    pub path: String,
    /// Status to answer with.
    pub status: u16,
    /// Body to answer with.
    pub body: Bytes,
    /// Optional delay before answering.
    pub delay: Option<Duration>,
    /// Headers the request must carry to match.
    pub expected_headers: Vec<(String, String)>,
}

impl MockFlow {
    /// A flow answering `200` with an empty body.
    pub fn ok(path: impl Into<String>) -> Self {
        Self::status(path, 200)
    }

    /// A flow answering with the given status and an empty body.
    pub fn status(path: impl Into<String>, status: u16) -> Self {
        Self {
            path: path.into(),
            status,
            body: Bytes::new(),
            delay: None,
            expected_headers: Vec::new(),
        }
    }

    /// Sets the response body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON response body.
    #[must_use]
    pub fn with_json(self, body: &Value) -> Self {
        self.with_body(body.to_string())
    }

    /// Delays the response.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requires a header on matching requests.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.expected_headers.push((key.into(), value.into()));
        self
    }
}

/// Assertions over recorded upstream requests.
pub mod assertions {
    use super::*;

    /// Asserts that a request contains the expected header.
    pub fn assert_header_present(request: &RecordedRequest, key: &str, value: &str) {
        let header_value =
            request.headers.get(key).unwrap_or_else(|| panic!("Header '{key}' not present"));

        assert_eq!(
            header_value.to_str().unwrap_or_default(),
            value,
            "Header '{key}' has unexpected value"
        );
    }

    /// Asserts that the request body matches expected JSON.
    pub fn assert_json_body(request: &RecordedRequest, expected: &Value) {
        let actual: Value = serde_json::from_slice(&request.body)
            .unwrap_or_else(|e| panic!("Request body is not JSON: {e}"));

        assert_eq!(actual, *expected, "Request body does not match expected JSON");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_upstream_starts() {
        let server = MockUpstream::start().await;
        assert!(server.url().starts_with("http://"));
        assert_eq!(server.flow_url("/flows/verify"), format!("{}/flows/verify", server.url()));
    }

    #[tokio::test]
    async fn nothing_received_initially() {
        let server = MockUpstream::start().await;
        server.mock_flow(MockFlow::status("/flows/verify", 202).with_body("queued")).await;
        server.assert_request_count(0).await;
    }
}
