//! Response envelope with CORS headers.
//!
//! Every intake response, success or rejection, leaves through [`Envelope`]
//! so the browser always sees the same CORS headers and content type.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use intake_core::IntakeError;
use serde::Serialize;

/// Methods advertised to browsers.
pub const ALLOWED_METHODS: &str = "POST, OPTIONS";

/// Request headers advertised to browsers.
pub const ALLOWED_HEADERS: &str = "Content-Type, Idempotency-Key";

/// Message body returned for errors and locally generated responses.
#[derive(Debug, Serialize)]
pub struct MessageBody<'a> {
    /// Human-readable message
    pub message: &'a str,
    /// Error code from the intake taxonomy, absent for non-errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

/// Response extension marking a reply built by [`Envelope`].
///
/// Replies without it came from middleware or the router itself.
#[derive(Debug, Clone, Copy)]
pub struct Enveloped;

/// Status, body and caller origin for one intake response.
#[derive(Debug, Clone)]
pub struct Envelope {
    status: StatusCode,
    body: Bytes,
    origin: Option<String>,
}

impl Envelope {
    /// Empty 200 answer to a CORS preflight.
    pub fn preflight(origin: Option<String>) -> Self {
        Self { status: StatusCode::OK, body: Bytes::new(), origin }
    }

    /// JSON `{"message": ...}` body with the given status.
    pub fn message(status: StatusCode, message: &str, origin: Option<String>) -> Self {
        Self { status, body: encode(&MessageBody { message, code: None }), origin }
    }

    /// Rejection derived from the error taxonomy.
    pub fn error(error: &IntakeError, origin: Option<String>) -> Self {
        let status =
            StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = error.to_string();
        let body = encode(&MessageBody { message: &message, code: Some(error.code()) });
        Self { status, body, origin }
    }

    /// Upstream status and body relayed verbatim.
    ///
    /// A status outside the range HTTP allows is reported as an upstream
    /// failure instead.
    pub fn relay(status_code: u16, body: Bytes, origin: Option<String>) -> Self {
        match StatusCode::from_u16(status_code) {
            Ok(status) => Self { status, body, origin },
            Err(_) => Self::error(
                &IntakeError::UpstreamUnavailable {
                    reason: format!("invalid upstream status {status_code}"),
                },
                origin,
            ),
        }
    }

    /// Status code of this envelope.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Body bytes of this envelope.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin_value(self.origin.as_deref()));
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut response = (self.status, headers, self.body).into_response();
        response.extensions_mut().insert(Enveloped);
        response
    }
}

/// Echoes the caller's origin, or `*` when there is none to echo.
fn allow_origin_value(origin: Option<&str>) -> HeaderValue {
    origin
        .filter(|o| !o.is_empty())
        .and_then(|o| HeaderValue::from_str(o).ok())
        .unwrap_or_else(|| HeaderValue::from_static("*"))
}

fn encode(body: &MessageBody<'_>) -> Bytes {
    // Serializing two string fields cannot fail.
    Bytes::from(serde_json::to_vec(body).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_carries_message_and_code() {
        let envelope = Envelope::error(&IntakeError::MissingTenant, None);

        assert_eq!(envelope.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(envelope.body()).unwrap();
        assert_eq!(body["message"], "Missing tenant");
        assert_eq!(body["code"], "E1001");
    }

    #[test]
    fn cors_headers_always_attached() {
        let response =
            Envelope::message(StatusCode::OK, "ok", Some("https://a.example".into())).into_response();
        let headers = response.headers();

        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://a.example");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type, Idempotency-Key");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn wildcard_origin_without_caller_origin() {
        let response = Envelope::preflight(None).into_response();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let response = Envelope::preflight(Some(String::new())).into_response();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[test]
    fn relay_keeps_status_and_body() {
        let envelope = Envelope::relay(409, Bytes::from_static(b"duplicate"), None);
        assert_eq!(envelope.status(), StatusCode::CONFLICT);
        assert_eq!(envelope.body().as_ref(), b"duplicate");
    }

    #[test]
    fn relay_rejects_impossible_status() {
        let envelope = Envelope::relay(42, Bytes::new(), None);
        assert_eq!(envelope.status(), StatusCode::BAD_GATEWAY);
    }
}
