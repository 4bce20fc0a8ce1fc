//! Outbound HTTP for the intake service.
//!
//! Two concerns live here because they share one connection pool:
//!
//! 1. **Forwarding** - relaying a validated payload to a tenant's upstream
//!    flow and handing back its status and body untouched
//! 2. **Remote tenant configs** - fetching tenant documents published as
//!    static assets
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use intake_core::FlowKind;
//! use intake_forward::{ForwardRequest, UpstreamClient};
//! use uuid::Uuid;
//!
//! # async fn example() -> intake_forward::Result<()> {
//! let client = UpstreamClient::with_defaults()?;
//! let response = client
//!     .forward(ForwardRequest {
//!         request_id: Uuid::new_v4(),
//!         tenant: "extoz".into(),
//!         flow: FlowKind::Verify,
//!         url: "https://flows.example/verify".into(),
//!         body: Bytes::from_static(br#"{"tenant":"extoz","idempotencyKey":"k"}"#),
//!     })
//!     .await?;
//! println!("upstream answered {}", response.status_code);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod tenants;

pub use client::{ClientConfig, ForwardRequest, UpstreamClient, UpstreamResponse};
pub use error::{ForwardError, Result};
pub use tenants::HttpTenantStore;

/// Default upstream timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
