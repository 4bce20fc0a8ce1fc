//! Inspection and verification payloads.
//!
//! These types describe the JSON the browser controller produces. The proxy
//! validates inbound inspection payloads against [`InspectionRequest`] but
//! always forwards the original bytes, so fields it does not model survive
//! the trip upstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{IntakeError, Result},
    normalize::is_plausible_email,
};

/// Service codes that require building sub-structure counts.
pub const BUILDING_SERVICE_CODES: [&str; 2] = ["building", "prepurchase"];

/// A submitted inspection request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRequest {
    /// Tenant identifier as sent by the client.
    pub tenant: String,
    /// UI language.
    #[serde(default)]
    pub lang: String,
    /// Page that produced the payload.
    #[serde(default)]
    pub source: String,
    /// Client-generated key, fresh per submission attempt.
    pub idempotency_key: String,
    /// Salutation.
    #[serde(default)]
    pub title: Option<String>,
    /// Contact first name.
    #[serde(default)]
    pub first_name: String,
    /// Contact last name.
    #[serde(default)]
    pub last_name: String,
    /// Contact email, lowercased.
    #[serde(default)]
    pub email: String,
    /// Contact phone, international form when entered locally.
    #[serde(default)]
    pub phone: String,
    /// Preferred contact method.
    #[serde(default)]
    pub pref_method: Option<String>,
    /// Street address line.
    #[serde(default)]
    pub address1: String,
    /// Second address line.
    #[serde(default)]
    pub address2: Option<String>,
    /// Third address line.
    #[serde(default)]
    pub address3: Option<String>,
    /// Suburb or locality.
    #[serde(default)]
    pub suburb: String,
    /// State or region.
    #[serde(default)]
    pub state: String,
    /// Postal code.
    #[serde(default)]
    pub postcode: String,
    /// Country code.
    #[serde(default)]
    pub country: String,
    /// Selected services.
    #[serde(default)]
    pub service: Vec<ServiceSelection>,
    /// Free-form notes.
    #[serde(default)]
    pub service_notes: Option<String>,
    /// Scheduling preferences in priority order.
    #[serde(default)]
    pub preferences: Vec<Preference>,
    /// Building sub-structure counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<BuildingDetails>,
    /// Client-side submission timestamp.
    #[serde(default)]
    pub submitted_utc: Option<DateTime<Utc>>,
    /// Consent flags.
    #[serde(default)]
    pub metadata: Consent,
}

/// A selected service with quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSelection {
    /// Service code from the tenant's service list.
    pub code: String,
    /// Number of units requested.
    pub quantity: u32,
}

/// A preferred inspection slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preference {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Time of day rounded to a half hour, `HH:MM`.
    pub time: String,
    /// `date` and `time` joined with `T`, present when a date was given.
    pub local_date_time: Option<String>,
}

/// Counts of building sub-structures to inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct BuildingDetails {
    pub nbr_buildings: u32,
    pub nbr_lounge: u32,
    pub nbr_kitchen: u32,
    pub nbr_bathroom: u32,
    pub nbr_bedroom: u32,
    pub nbr_toilet: u32,
    pub nbr_laundry: u32,
    pub nbr_other: u32,
}

/// Consent flags captured with the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consent {
    /// Privacy policy accepted.
    #[serde(default)]
    pub policy_accepted: bool,
    /// Terms and conditions accepted.
    #[serde(default)]
    pub terms_accepted: bool,
}

/// A verification request from the verify page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    /// Tenant identifier.
    pub tenant: String,
    /// UI language.
    pub lang: String,
    /// Page that produced the payload.
    pub source: String,
    /// Where the user came from, such as `email-link`.
    pub target: Option<String>,
    /// Key of the submission being verified.
    pub idempotency_key: Option<String>,
    /// Client-side submission timestamp.
    pub submitted_utc: DateTime<Utc>,
}

impl InspectionRequest {
    /// Whether any selected service needs building details.
    pub fn requires_building_details(&self) -> bool {
        requires_building_details(&self.service)
    }

    /// Checks the fields the inspection flow cannot do without.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidRequest` naming the first failing field.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address1", &self.address1),
            ("suburb", &self.suburb),
            ("state", &self.state),
            ("postcode", &self.postcode),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(IntakeError::invalid(format!("Missing required field: {field}")));
            }
        }

        if !is_plausible_email(&self.email) {
            return Err(IntakeError::invalid("Invalid email address"));
        }

        if self.service.is_empty() {
            return Err(IntakeError::invalid("At least one service must be selected"));
        }

        if self.requires_building_details()
            && self.building.as_ref().map_or(0, |b| b.nbr_buildings) == 0
        {
            return Err(IntakeError::invalid(
                "Please specify the number of buildings/structures to be inspected.",
            ));
        }

        Ok(())
    }
}

/// Whether a service selection includes a building-type inspection.
pub fn requires_building_details(services: &[ServiceSelection]) -> bool {
    services.iter().any(|s| BUILDING_SERVICE_CODES.contains(&s.code.as_str()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn valid_request() -> InspectionRequest {
        serde_json::from_value(json!({
            "tenant": "extoz",
            "lang": "en",
            "source": "inspection-form",
            "idempotencyKey": "0b6f8f58-3f7c-4f55-9d40-5d5b1b7c8b11",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "phone": "+61412345678",
            "address1": "1 Analytical Way",
            "suburb": "Carlton",
            "state": "VIC",
            "postcode": "3053",
            "country": "AU",
            "service": [{"code": "pest", "quantity": 1}],
            "preferences": [],
            "metadata": {"policyAccepted": true, "termsAccepted": true}
        }))
        .unwrap()
    }

    #[test]
    fn valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn missing_contact_field_rejected() {
        let mut request = valid_request();
        request.last_name = "  ".to_string();

        let err = request.validate().unwrap_err();
        assert_eq!(err, IntakeError::invalid("Missing required field: lastName"));
    }

    #[test]
    fn malformed_email_rejected() {
        let mut request = valid_request();
        request.email = "ada.example.com".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn empty_service_list_rejected() {
        let mut request = valid_request();
        request.service.clear();
        assert!(request.validate().is_err());
    }

    #[test]
    fn building_service_requires_building_count() {
        let mut request = valid_request();
        request.service = vec![ServiceSelection { code: "prepurchase".into(), quantity: 1 }];
        assert!(request.validate().is_err());

        request.building = Some(BuildingDetails { nbr_buildings: 2, ..Default::default() });
        assert!(request.validate().is_ok());
    }

    #[test]
    fn building_details_omitted_from_json_when_absent() {
        let value = serde_json::to_value(valid_request()).unwrap();
        assert!(value.get("building").is_none());
        assert_eq!(value["idempotencyKey"], "0b6f8f58-3f7c-4f55-9d40-5d5b1b7c8b11");
        assert_eq!(value["metadata"]["policyAccepted"], true);
    }
}
