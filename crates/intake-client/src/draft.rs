//! Session-scoped draft storage.

use std::{collections::HashMap, sync::Mutex};

use crate::form::FormFields;

/// Storage key for a tenant's draft.
pub fn draft_key(tenant: &str) -> String {
    format!("draft:{tenant}")
}

/// Key/value storage local to one browsing session.
pub trait DraftStore: Send + Sync + std::fmt::Debug {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);

    /// Removes `key`.
    fn remove(&self, key: &str);

    /// Saves form fields as a JSON draft.
    fn save_fields(&self, key: &str, fields: &FormFields) {
        self.set(key, fields.to_draft_json());
    }

    /// Loads a JSON draft. Corrupt drafts read as absent.
    fn load_fields(&self, key: &str) -> Option<FormFields> {
        self.get(key).and_then(|raw| FormFields::from_draft_json(&raw))
    }
}

/// In-memory [`DraftStore`], one per tab.
#[derive(Debug, Default)]
pub struct SessionDraftStore {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionDraftStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for SessionDraftStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
    }
}
