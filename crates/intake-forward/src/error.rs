//! Error types for outbound forwarding.
//!
//! Only transport-level failures are errors here. An upstream that answers
//! with any HTTP status, including 4xx and 5xx, produced a response and is
//! relayed as one.

use thiserror::Error;

/// Result type alias for forwarding operations.
pub type Result<T> = std::result::Result<T, ForwardError>;

/// Errors raised while talking to an upstream flow.
#[derive(Debug, Clone, Error)]
pub enum ForwardError {
    /// Network-level connectivity failure.
    #[error("network connection failed: {message}")]
    NetworkError {
        /// Error message describing the network failure
        message: String,
    },

    /// Request timeout exceeded.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Number of seconds before the request timed out
        timeout_seconds: u64,
    },

    /// Upstream answered but its body could not be read.
    #[error("failed to read upstream response: {message}")]
    BodyError {
        /// Error message from the body stream
        message: String,
    },

    /// Client could not be constructed.
    #[error("invalid forwarder configuration: {message}")]
    ConfigurationError {
        /// Configuration error message
        message: String,
    },
}

impl ForwardError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates a body read error.
    pub fn body(message: impl Into<String>) -> Self {
        Self::BodyError { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError { message: message.into() }
    }
}

impl From<ForwardError> for intake_core::IntakeError {
    fn from(error: ForwardError) -> Self {
        Self::UpstreamUnavailable { reason: error.to_string() }
    }
}
