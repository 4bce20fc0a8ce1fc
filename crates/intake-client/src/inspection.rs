//! Inspection request page.
//!
//! Submit runs these checks in order, stopping at the first that fires:
//! honeypot, required fields, building counts, upstream configured, busy.
//! Only then is the proxy called. Failures never touch the form, so the
//! user can fix things and resubmit.

use intake_core::{
    normalize::{is_plausible_email, normalize_phone, round_to_half_hour},
    request::requires_building_details,
    BuildingDetails, Consent, FlowKind, InspectionRequest, Preference, ServiceOption,
    ServiceSelection,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    busy::BusyGuard,
    draft::draft_key,
    error::ClientError,
    form::FormFields,
    page::{Outcome, PageContext},
};

/// Hidden field only bots fill in.
pub const HONEYPOT_FIELD: &str = "website";

/// Time inputs rounded to the half hour on change.
pub const TIME_FIELDS: [&str; 2] = ["time1", "time2"];

/// Fields the form marks as required.
pub const REQUIRED_FIELDS: [&str; 8] =
    ["firstName", "lastName", "email", "phone", "address1", "suburb", "state", "postcode"];

/// Shown when the honeypot is filled.
pub const HONEYPOT_MESSAGE: &str = "Thank you! We will be in touch shortly.";
/// Shown when required fields are missing or malformed.
pub const FIX_FIELDS_MESSAGE: &str = "Please fix the highlighted fields and try again.";
/// Shown when a building service has no structure count.
pub const BUILDING_COUNT_MESSAGE: &str =
    "Please specify the number of buildings/structures to be inspected.";
/// Shown when the tenant has no inspection upstream.
pub const NOT_CONFIGURED_MESSAGE: &str = "Submission endpoint is not configured for this tenant.";
/// Shown when the proxy call fails.
pub const FAILURE_MESSAGE: &str =
    "Something went wrong submitting your request. Please try again.";
/// Shown after a successful submission.
pub const SUCCESS_MESSAGE: &str = "Thanks! Your inspection request has been submitted.";
/// Shown after saving a draft.
pub const DRAFT_SAVED_MESSAGE: &str = "Draft saved on this device.";

const DEFAULT_TIME: &str = "09:00";
const SOURCE: &str = "inspection-form";

/// Controller for the inspection form.
#[derive(Debug)]
pub struct InspectionPage {
    ctx: PageContext,
    busy: BusyGuard,
}

impl InspectionPage {
    /// Creates the page for a booted tenant.
    pub fn new(ctx: PageContext) -> Self {
        Self { ctx, busy: BusyGuard::new() }
    }

    /// Page context.
    pub fn context(&self) -> &PageContext {
        &self.ctx
    }

    /// Services to list in the multi-select.
    pub fn service_options(&self) -> &[ServiceOption] {
        &self.ctx.tenant_config.services
    }

    /// Whether the building detail fields should be visible.
    pub fn shows_building_fields(form: &FormFields) -> bool {
        requires_building_details(&selected_services(form))
    }

    /// Rounds a time field in place, as its change handler does.
    pub fn on_time_changed(form: &mut FormFields, field: &str) {
        if TIME_FIELDS.contains(&field) {
            let rounded = round_to_half_hour(form.get(field));
            form.set(field, rounded);
        }
    }

    /// Session key of this tenant's draft.
    pub fn draft_key(&self) -> String {
        draft_key(&self.ctx.tenant)
    }

    /// Saves the current form as this tenant's draft.
    pub fn save_draft(&self, form: &FormFields) -> &'static str {
        self.ctx.drafts.save_fields(&self.draft_key(), form);
        DRAFT_SAVED_MESSAGE
    }

    /// Loads this tenant's draft into `form`. Returns whether one existed.
    pub fn restore_draft(&self, form: &mut FormFields) -> bool {
        match self.ctx.drafts.load_fields(&self.draft_key()) {
            Some(draft) => {
                form.restore_from(&draft);
                true
            },
            None => false,
        }
    }

    /// Whether a submission is in flight; the submit control is disabled while true.
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Submit control label for the current state.
    pub fn submit_label(&self) -> &'static str {
        if self.is_busy() {
            "Submitting…"
        } else {
            "Submit request"
        }
    }

    /// Required fields that are blank or malformed.
    pub fn invalid_fields(form: &FormFields) -> Vec<&'static str> {
        let mut invalid: Vec<&'static str> =
            REQUIRED_FIELDS.into_iter().filter(|f| form.trimmed(f).is_none()).collect();

        if !invalid.contains(&"email") && !is_plausible_email(form.get("email")) {
            invalid.push("email");
        }
        if form.selected_services().is_empty() {
            invalid.push("service");
        }
        invalid
    }

    /// Builds the request the proxy receives.
    ///
    /// Each call draws a fresh idempotency key.
    ///
    /// # Errors
    ///
    /// Returns [`Outcome::Invalid`] when a building service is selected
    /// without a positive structure count.
    pub fn build_payload(&self, form: &FormFields) -> Result<InspectionRequest, Outcome> {
        let service = selected_services(form);

        let building = if requires_building_details(&service) {
            let nbr_buildings = number(form, "nbrBuildings");
            if nbr_buildings <= 0 {
                return Err(Outcome::Invalid {
                    message: BUILDING_COUNT_MESSAGE,
                    fields: vec!["nbrBuildings"],
                });
            }
            Some(BuildingDetails {
                nbr_buildings: clamp(nbr_buildings),
                nbr_lounge: clamp(number(form, "nbrLounge")),
                nbr_kitchen: clamp(number(form, "nbrKitchen")),
                nbr_bathroom: clamp(number(form, "nbrBathroom")),
                nbr_bedroom: clamp(number(form, "nbrBedroom")),
                nbr_toilet: clamp(number(form, "nbrToilet")),
                nbr_laundry: clamp(number(form, "nbrLaundry")),
                nbr_other: clamp(number(form, "nbrOther")),
            })
        } else {
            None
        };

        let preferences = [("date1", "time1"), ("date2", "time2")]
            .into_iter()
            .filter_map(|(date, time)| preference(form.trimmed(date), form.trimmed(time)))
            .collect();

        Ok(InspectionRequest {
            tenant: self.ctx.tenant.clone(),
            lang: self.ctx.lang.clone(),
            source: SOURCE.to_string(),
            idempotency_key: Uuid::new_v4().to_string(),
            title: form.trimmed("title"),
            first_name: form.get("firstName").trim().to_string(),
            last_name: form.get("lastName").trim().to_string(),
            email: form.get("email").trim().to_lowercase(),
            phone: normalize_phone(form.get("phone").trim(), &self.ctx.controller.phone_country_code),
            pref_method: form.trimmed("contactMethod"),
            address1: form.get("address1").trim().to_string(),
            address2: form.trimmed("address2"),
            address3: form.trimmed("address3"),
            suburb: form.get("suburb").trim().to_string(),
            state: form.get("state").trim().to_string(),
            postcode: form.get("postcode").trim().to_string(),
            country: self.ctx.controller.country.clone(),
            service,
            service_notes: form.trimmed("notes"),
            preferences,
            building,
            submitted_utc: Some(self.ctx.clock.now_utc()),
            metadata: Consent {
                policy_accepted: form.is_checked("privacyPolicy"),
                terms_accepted: form.is_checked("termsConsent"),
            },
        })
    }

    /// Validates and submits the form.
    ///
    /// On success the tenant's draft is cleared and the outcome asks for a
    /// form reset.
    #[instrument(name = "submit_inspection_form", skip_all, fields(tenant = %self.ctx.tenant))]
    pub async fn submit(&self, form: &FormFields) -> Outcome {
        if form.trimmed(HONEYPOT_FIELD).is_some() {
            info!("Honeypot filled, skipping submission");
            return Outcome::Suppressed { message: HONEYPOT_MESSAGE };
        }

        let invalid = Self::invalid_fields(form);
        if !invalid.is_empty() {
            return Outcome::Invalid { message: FIX_FIELDS_MESSAGE, fields: invalid };
        }

        let payload = match self.build_payload(form) {
            Ok(payload) => payload,
            Err(outcome) => return outcome,
        };

        if self.ctx.tenant_config.upstream_for(FlowKind::Inspection).is_none() {
            return Outcome::NotConfigured { message: NOT_CONFIGURED_MESSAGE };
        }

        let Some(_token) = self.busy.try_acquire() else {
            return Outcome::Busy;
        };

        let endpoint = self.ctx.controller.inspection_endpoint();
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(e) => {
                return Outcome::Failed {
                    message: FAILURE_MESSAGE,
                    error: ClientError::decode(endpoint, e.to_string()),
                }
            },
        };

        match self.ctx.transport.post_json(&endpoint, &[], body).await {
            Ok(reply) if reply.is_success() => {
                self.ctx.drafts.remove(&self.draft_key());
                info!(status = reply.status, "Inspection request submitted");
                Outcome::Submitted { message: SUCCESS_MESSAGE, reply }
            },
            Ok(reply) => {
                warn!(status = reply.status, "Inspection request rejected");
                Outcome::Failed {
                    message: FAILURE_MESSAGE,
                    error: ClientError::Status { url: endpoint, status: reply.status, body: reply.text() },
                }
            },
            Err(error) => {
                warn!(error = %error, "Inspection request failed");
                Outcome::Failed { message: FAILURE_MESSAGE, error }
            },
        }
    }
}

fn selected_services(form: &FormFields) -> Vec<ServiceSelection> {
    form.selected_services()
        .iter()
        .map(|code| ServiceSelection { code: code.clone(), quantity: 1 })
        .collect()
}

/// Builds a preference slot; `None` when both parts are empty.
fn preference(date: Option<String>, time: Option<String>) -> Option<Preference> {
    if date.is_none() && time.is_none() {
        return None;
    }
    let time = round_to_half_hour(time.as_deref().unwrap_or(DEFAULT_TIME));
    let local_date_time = date.as_ref().map(|d| format!("{d}T{time}"));
    Some(Preference { date, time, local_date_time })
}

/// Numeric field value; blank or unparsable counts as zero.
fn number(form: &FormFields, field: &str) -> i64 {
    form.get(field).trim().parse::<f64>().map_or(0, |n| n as i64)
}

fn clamp(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}
