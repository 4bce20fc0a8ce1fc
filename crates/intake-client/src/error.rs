//! Error types for the form controller.

use thiserror::Error;

/// Result type alias using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures the controller can hit talking to the site or the proxy.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Target URL
        url: String,
        /// Transport error message
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Target URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics only
        body: String,
    },

    /// A response body could not be decoded.
    #[error("invalid response from {url}: {message}")]
    Decode {
        /// Target URL
        url: String,
        /// Decode error message
        message: String,
    },

    /// A URL could not be built from the configured origin and path.
    #[error("invalid URL {url}: {message}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Parse error message
        message: String,
    },
}

impl ClientError {
    /// Creates a transport error.
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport { url: url.into(), message: message.into() }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode { url: url.into(), message: message.into() }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
