//! Error taxonomy for intake requests.
//!
//! Every rejection the proxy can produce maps to exactly one variant here,
//! carrying a stable code for client disambiguation and the HTTP status the
//! API layer answers with. Messages are human readable and are returned to
//! callers verbatim in the `message` field.

use thiserror::Error;

/// Result type alias using `IntakeError`.
pub type Result<T> = std::result::Result<T, IntakeError>;

/// Intake error types with codes and status mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    // Client errors (E1001-E1003)
    /// Tenant missing or empty after sanitization (E1001).
    #[error("Missing tenant")]
    MissingTenant,

    /// Payload carries no usable `idempotencyKey` (E1002).
    #[error("Missing idempotencyKey")]
    MissingIdempotencyKey,

    /// Payload failed structural validation (E1003).
    #[error("{message}")]
    InvalidRequest {
        /// Description of the first failing field
        message: String,
    },

    // Authorization errors (E1101)
    /// Request origin is not in the tenant allow-list (E1101).
    #[error("Origin not allowed")]
    OriginNotAllowed {
        /// The origin that was rejected, empty when absent
        origin: String,
    },

    // Lookup errors (E1201)
    /// Tenant configuration could not be loaded (E1201).
    #[error("Tenant not found")]
    TenantNotFound {
        /// Sanitized tenant identifier
        tenant: String,
    },

    // Configuration errors (E2001)
    /// Tenant has no upstream flow URL for the requested flow (E2001).
    #[error("Tenant misconfigured")]
    TenantMisconfigured {
        /// Sanitized tenant identifier
        tenant: String,
    },

    // Upstream errors (E3001)
    /// Transport-level failure talking to the upstream flow (E3001).
    #[error("Upstream service failed")]
    UpstreamUnavailable {
        /// Underlying transport error, logged but never returned to callers
        reason: String,
    },
}

impl IntakeError {
    /// Creates a validation error from a message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    /// Returns the error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingTenant => "E1001",
            Self::MissingIdempotencyKey => "E1002",
            Self::InvalidRequest { .. } => "E1003",
            Self::OriginNotAllowed { .. } => "E1101",
            Self::TenantNotFound { .. } => "E1201",
            Self::TenantMisconfigured { .. } => "E2001",
            Self::UpstreamUnavailable { .. } => "E3001",
        }
    }

    /// Returns the HTTP status code callers receive for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingTenant | Self::MissingIdempotencyKey | Self::InvalidRequest { .. } => 400,
            Self::OriginNotAllowed { .. } => 403,
            Self::TenantNotFound { .. } => 404,
            Self::TenantMisconfigured { .. } => 500,
            Self::UpstreamUnavailable { .. } => 502,
        }
    }

    /// Whether the caller can fix the request and resubmit.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(IntakeError::MissingTenant.status_code(), 400);
        assert_eq!(IntakeError::MissingIdempotencyKey.status_code(), 400);
        assert_eq!(IntakeError::invalid("bad").status_code(), 400);
        assert_eq!(IntakeError::OriginNotAllowed { origin: String::new() }.status_code(), 403);
        assert_eq!(IntakeError::TenantNotFound { tenant: "x".into() }.status_code(), 404);
        assert_eq!(IntakeError::TenantMisconfigured { tenant: "x".into() }.status_code(), 500);
        assert_eq!(IntakeError::UpstreamUnavailable { reason: "refused".into() }.status_code(), 502);
    }

    #[test]
    fn messages_do_not_leak_internal_detail() {
        let error = IntakeError::UpstreamUnavailable { reason: "dns failure for 10.0.0.1".into() };
        assert_eq!(error.to_string(), "Upstream service failed");

        let error = IntakeError::TenantNotFound { tenant: "acme".into() };
        assert_eq!(error.to_string(), "Tenant not found");
    }

    #[test]
    fn client_errors_identified() {
        assert!(IntakeError::MissingTenant.is_client_error());
        assert!(IntakeError::OriginNotAllowed { origin: "x".into() }.is_client_error());
        assert!(!IntakeError::TenantMisconfigured { tenant: "x".into() }.is_client_error());
        assert!(!IntakeError::UpstreamUnavailable { reason: "x".into() }.is_client_error());
    }

    #[test]
    fn codes_are_unique() {
        let errors = [
            IntakeError::MissingTenant,
            IntakeError::MissingIdempotencyKey,
            IntakeError::invalid("x"),
            IntakeError::OriginNotAllowed { origin: String::new() },
            IntakeError::TenantNotFound { tenant: String::new() },
            IntakeError::TenantMisconfigured { tenant: String::new() },
            IntakeError::UpstreamUnavailable { reason: String::new() },
        ];
        let mut codes: Vec<_> = errors.iter().map(IntakeError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
