//! Core domain types for the tenant-aware intake service.
//!
//! Provides tenant identifiers and configuration, the inspection and
//! verification payload models, normalization helpers shared by server and
//! browser controller, the error taxonomy and the tenant store abstraction.
//! All other crates build on these types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod normalize;
pub mod request;
pub mod tenant;
pub mod time;

pub use error::{IntakeError, Result};
pub use models::{Assets, Endpoints, FlowKind, Policy, ServiceOption, TenantConfig, TenantId};
pub use request::{
    BuildingDetails, Consent, InspectionRequest, Preference, ServiceSelection,
    VerificationRequest,
};
pub use tenant::{FileTenantStore, TenantLoadError, TenantStore};
pub use time::{Clock, RealClock, TestClock};
