//! Form field values.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Name of the multi-select service field.
pub const SERVICE_FIELD: &str = "service";

/// Current values of a form, keyed by field name.
///
/// Text inputs hold their string value, checkboxes hold `"on"` when
/// checked, and the service multi-select keeps its own ordered list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    values: BTreeMap<String, String>,
    services: Vec<String>,
}

impl FormFields {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Value of a field, empty when unset.
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map_or("", String::as_str)
    }

    /// Trimmed value, `None` when blank.
    pub fn trimmed(&self, name: &str) -> Option<String> {
        Some(self.get(name).trim()).filter(|v| !v.is_empty()).map(str::to_string)
    }

    /// Ticks or clears a checkbox.
    pub fn check(&mut self, name: &str, checked: bool) -> &mut Self {
        if checked {
            self.values.insert(name.to_string(), "on".to_string());
        } else {
            self.values.remove(name);
        }
        self
    }

    /// Whether a checkbox is ticked.
    pub fn is_checked(&self, name: &str) -> bool {
        !matches!(self.get(name), "" | "false")
    }

    /// Replaces the service selection.
    pub fn select_services<I, S>(&mut self, codes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Selected service codes in selection order.
    pub fn selected_services(&self) -> &[String] {
        &self.services
    }

    /// Clears every field.
    pub fn reset(&mut self) {
        self.values.clear();
        self.services.clear();
    }

    /// Copies every value of `draft` into this form.
    pub fn restore_from(&mut self, draft: &FormFields) {
        for (name, value) in &draft.values {
            self.values.insert(name.clone(), value.clone());
        }
        if !draft.services.is_empty() {
            self.services.clone_from(&draft.services);
        }
    }

    /// Serializes the form as a flat JSON draft.
    pub fn to_draft_json(&self) -> String {
        let mut map: Map<String, Value> =
            self.values.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();
        if !self.services.is_empty() {
            map.insert(
                SERVICE_FIELD.to_string(),
                Value::Array(self.services.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(map).to_string()
    }

    /// Parses a draft produced by [`FormFields::to_draft_json`].
    ///
    /// Returns `None` for anything that is not a JSON object.
    pub fn from_draft_json(raw: &str) -> Option<Self> {
        let Value::Object(map) = serde_json::from_str::<Value>(raw).ok()? else {
            return None;
        };

        let mut fields = Self::new();
        for (name, value) in map {
            match (name.as_str(), value) {
                (SERVICE_FIELD, Value::Array(items)) => {
                    fields.services =
                        items.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                },
                (_, Value::String(s)) => {
                    fields.values.insert(name, s);
                },
                (_, Value::Number(n)) => {
                    fields.values.insert(name, n.to_string());
                },
                (_, Value::Bool(true)) => {
                    fields.values.insert(name, "on".to_string());
                },
                _ => {},
            }
        }
        Some(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_round_trip_keeps_services() {
        let mut form = FormFields::new();
        form.set("firstName", "Ada").check("privacyPolicy", true);
        form.select_services(["pest", "building"]);

        let restored = FormFields::from_draft_json(&form.to_draft_json()).unwrap();

        assert_eq!(restored, form);
    }

    #[test]
    fn trimmed_treats_blank_as_absent() {
        let mut form = FormFields::new();
        form.set("address2", "   ").set("suburb", " Newtown ");

        assert_eq!(form.trimmed("address2"), None);
        assert_eq!(form.trimmed("suburb").as_deref(), Some("Newtown"));
        assert_eq!(form.trimmed("missing"), None);
    }

    #[test]
    fn restore_overlays_existing_values() {
        let mut form = FormFields::new();
        form.set("firstName", "Grace").set("lastName", "Hopper");

        let mut draft = FormFields::new();
        draft.set("firstName", "Ada");
        form.restore_from(&draft);

        assert_eq!(form.get("firstName"), "Ada");
        assert_eq!(form.get("lastName"), "Hopper");
    }

    #[test]
    fn non_object_draft_rejected() {
        assert!(FormFields::from_draft_json("[1,2]").is_none());
        assert!(FormFields::from_draft_json("null").is_none());
    }
}
