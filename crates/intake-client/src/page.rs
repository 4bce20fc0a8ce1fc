//! State shared by both pages and the result of a page action.

use std::sync::Arc;

use intake_core::{Clock, TenantConfig};

use crate::{
    config::ControllerConfig, draft::DraftStore, error::ClientError, transport::Reply,
    transport::Transport,
};

/// Everything a page needs after boot.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// Resolved tenant.
    pub tenant: String,
    /// Resolved language.
    pub lang: String,
    /// Tenant configuration, assets already rebased.
    pub tenant_config: TenantConfig,
    /// Controller settings.
    pub controller: ControllerConfig,
    /// Network access.
    pub transport: Arc<dyn Transport>,
    /// Session draft storage.
    pub drafts: Arc<dyn DraftStore>,
    /// Clock for `submittedUtc`.
    pub clock: Arc<dyn Clock>,
}

/// What a submit or verify action ended with.
#[derive(Debug)]
pub enum Outcome {
    /// The proxy accepted the request.
    Submitted {
        /// Confirmation shown to the user
        message: &'static str,
        /// Proxy response
        reply: Reply,
    },
    /// Honeypot tripped: report success without touching the network.
    Suppressed {
        /// Confirmation shown to the user
        message: &'static str,
    },
    /// Client-side validation failed.
    Invalid {
        /// Inline error
        message: &'static str,
        /// Fields to highlight
        fields: Vec<&'static str>,
    },
    /// No upstream flow is configured for the tenant.
    NotConfigured {
        /// Inline error
        message: &'static str,
    },
    /// The request failed or was rejected.
    Failed {
        /// Inline error, generic and retry-prompting
        message: &'static str,
        /// Underlying cause, for logs
        error: ClientError,
    },
    /// Another action is still in flight.
    Busy,
}

impl Outcome {
    /// Message for the user, if any.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::Submitted { message, .. }
            | Self::Suppressed { message }
            | Self::Invalid { message, .. }
            | Self::NotConfigured { message }
            | Self::Failed { message, .. } => Some(message),
            Self::Busy => None,
        }
    }

    /// Whether the user should see a success confirmation.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Submitted { .. } | Self::Suppressed { .. })
    }

    /// Whether the form should be cleared. Failures keep user input.
    pub fn resets_form(&self) -> bool {
        self.is_success()
    }
}
