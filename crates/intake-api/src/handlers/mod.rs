//! HTTP request handlers for the intake API.
//!
//! - `intake` - inspection and verification proxy endpoints
//! - `tenants` - tenant configuration documents for the browser
//! - `health` - health, readiness and liveness probes
//!
//! Intake handlers always answer through [`crate::response::Envelope`] so
//! every response carries CORS headers and a JSON content type.

pub mod health;
pub mod intake;
pub mod tenants;

pub use health::{health_check, liveness_check, readiness_check};
pub use intake::{preflight, submit_inspection, submit_verification};
pub use tenants::tenant_config;
