//! Form controller for the intake pages.
//!
//! Boots a page for a tenant (with explicit fallback to the default
//! tenant's configuration), then drives either the inspection request form
//! or the verification call-to-action against the intake proxy. All
//! network access goes through [`Transport`]; the DOM is reduced to
//! [`FormFields`] and the pages return an [`Outcome`] describing what the
//! user should see.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod boot;
pub mod busy;
pub mod config;
pub mod draft;
pub mod error;
pub mod form;
pub mod inspection;
pub mod page;
pub mod transport;
pub mod verify;

pub use boot::{
    load_tenant_config, resolve_lang, resolve_tenant, BootedPage, ConfigResolution, Controller,
    Location, PageKind,
};
pub use busy::BusyGuard;
pub use config::{BasePath, ControllerConfig};
pub use draft::{draft_key, DraftStore, SessionDraftStore};
pub use error::{ClientError, Result};
pub use form::FormFields;
pub use inspection::InspectionPage;
pub use page::{Outcome, PageContext};
pub use transport::{HttpTransport, Reply, Transport};
pub use verify::VerifyPage;
