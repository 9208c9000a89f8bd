use std::sync::Arc;

use tracing::{debug, info};

use super::models::ApiKeys;
use super::storage::{KeyValueStore, MemoryStore};
use crate::errors::PlannerError;

pub const API_KEYS_STORAGE_KEY: &str = "trip_planner_api_keys";

const MASK: &str = "****";
const MASK_MIN_CHARS: usize = 8;

/// Saves, loads and clears the user's `ApiKeys` under one storage entry.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key", &API_KEYS_STORAGE_KEY)
            .finish_non_exhaustive()
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// # Errors
    ///
    /// Returns an error if the keys cannot be serialized or written.
    pub fn save(&self, keys: &ApiKeys) -> Result<(), PlannerError> {
        let value = serde_json::to_string(keys)
            .map_err(|e| PlannerError::Serialization(format!("api keys serialize: {e}")))?;
        self.store.set(API_KEYS_STORAGE_KEY, &value)?;
        info!("Saved API keys to credential store");
        Ok(())
    }

    /// Returns the stored keys, or an empty set if nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or the stored value is not valid JSON.
    pub fn load(&self) -> Result<ApiKeys, PlannerError> {
        let Some(stored) = self.store.get(API_KEYS_STORAGE_KEY)? else {
            debug!("No API keys stored; using empty set");
            return Ok(ApiKeys::default());
        };
        serde_json::from_str(&stored)
            .map_err(|e| PlannerError::Serialization(format!("api keys parse: {e}")))
    }

    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn clear(&self) -> Result<(), PlannerError> {
        self.store.remove(API_KEYS_STORAGE_KEY)?;
        info!("Cleared API keys from credential store");
        Ok(())
    }

    /// The stored AMap JS key, or an empty string when unset.
    ///
    /// # Errors
    ///
    /// Propagates any `load` failure.
    pub fn map_js_key(&self) -> Result<String, PlannerError> {
        Ok(self.load()?.amap_js_key.unwrap_or_default())
    }
}

/// Masks a secret for display: `sk-1234567890` becomes `sk-1****7890`.
///
/// Keys shorter than eight characters are fully masked; a missing or empty key
/// yields an empty string.
#[must_use]
pub fn mask_key(key: Option<&str>) -> String {
    let Some(key) = key.filter(|k| !k.is_empty()) else {
        return String::new();
    };

    let chars: Vec<char> = key.chars().collect();
    if chars.len() < MASK_MIN_CHARS {
        return MASK.to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{MASK}{tail}")
}
