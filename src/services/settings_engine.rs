// TabSnooze Settings Engine
// Manages the delay settings behind the quick-delay presets: loading, saving,
// updating individual values, and resetting to defaults.
// Settings live under a single key of the persisted-state collaborator.

use std::sync::Arc;

use tracing::debug;

use crate::host::KeyValueStore;
use crate::types::errors::SettingsError;
use crate::types::settings::DelaySettings;

/// Storage key of the delay settings.
pub const DELAY_SETTINGS_KEY: &str = "delaySettings";

/// Settings engine that persists [`DelaySettings`] as JSON.
pub struct SettingsEngine {
    kv: Arc<dyn KeyValueStore>,
    settings: DelaySettings,
}

impl SettingsEngine {
    /// Creates an engine holding default settings. Call [`SettingsEngine::load`] to
    /// pick up persisted values.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            settings: DelaySettings::default(),
        }
    }

    /// Loads settings from the store.
    ///
    /// If nothing is stored yet, returns default settings.
    /// If the stored value is malformed, returns a serialization error and keeps
    /// the in-memory settings unchanged.
    pub async fn load(&mut self) -> Result<DelaySettings, SettingsError> {
        match self.kv.get(DELAY_SETTINGS_KEY).await? {
            None => {
                self.settings = DelaySettings::default();
            }
            Some(value) => {
                self.settings = serde_json::from_value(value).map_err(|e| {
                    SettingsError::SerializationError(format!("Failed to parse settings: {}", e))
                })?;
            }
        }
        Ok(self.settings.clone())
    }

    /// Saves the current settings to the store.
    pub async fn save(&self) -> Result<(), SettingsError> {
        let value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;
        self.kv.set(DELAY_SETTINGS_KEY, value).await?;
        debug!("delay settings saved");
        Ok(())
    }

    /// Returns a reference to the current in-memory settings.
    pub fn get_settings(&self) -> &DelaySettings {
        &self.settings
    }

    /// Updates an individual setting by dot-notation key path.
    ///
    /// Converts the current settings to a `serde_json::Value`, navigates the
    /// dot-separated key path, updates the target value, then deserializes
    /// back into `DelaySettings`, so a value of the wrong type is rejected and
    /// the settings stay unchanged. Does not save; call [`SettingsEngine::save`].
    ///
    /// # Examples
    /// - `"laterToday"` → updates `settings.later_today`
    /// - `"weekendDay"` → updates `settings.weekend_day`
    pub fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }

        let parts: Vec<&str> = key.split('.').collect();

        let mut json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        {
            let mut current = &mut json_value;
            for (i, part) in parts.iter().enumerate() {
                let map = match current {
                    serde_json::Value::Object(map) => map,
                    _ => {
                        return Err(SettingsError::InvalidKey(format!(
                            "Cannot navigate to key '{}': intermediate value is not an object",
                            key
                        )))
                    }
                };
                if !map.contains_key(*part) {
                    return Err(SettingsError::InvalidKey(format!(
                        "Key '{}' not found in settings",
                        key
                    )));
                }
                if i == parts.len() - 1 {
                    map.insert(part.to_string(), value.clone());
                    break;
                }
                current = map
                    .get_mut(*part)
                    .ok_or_else(|| SettingsError::InvalidKey(key.to_string()))?;
            }
        }

        let updated: DelaySettings = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for '{}': {}", key, e))
        })?;
        self.settings = updated;
        Ok(())
    }

    /// Resets all settings to their default values and saves them.
    pub async fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = DelaySettings::default();
        self.save().await
    }
}
