//! Persisted user settings: endpoint and mode toggles

use ragline_client::DEFAULT_ENDPOINT;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::SharedStorage;

/// Storage key of the settings record
pub const SETTINGS_KEY: &str = "rag-ui-settings";

/// The settings record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Query endpoint URL
    pub endpoint: String,
    /// Receive answers as a server-sent event stream
    pub use_streaming: bool,
    /// Answer locally without touching the network
    pub use_mock: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            use_streaming: false,
            use_mock: false,
        }
    }
}

impl Settings {
    /// Overlay the fields of a stored record that have the expected type.
    ///
    /// Returns the number of fields applied.
    pub fn apply_stored(&mut self, stored: &Value) -> usize {
        let Some(obj) = stored.as_object() else {
            return 0;
        };
        let mut applied = 0;

        if let Some(endpoint) = obj.get("endpoint").and_then(Value::as_str) {
            let endpoint = endpoint.trim();
            if !endpoint.is_empty() {
                self.endpoint = endpoint.to_string();
                applied += 1;
            }
        }
        if let Some(flag) = obj.get("useStreaming").and_then(Value::as_bool) {
            self.use_streaming = flag;
            applied += 1;
        }
        if let Some(flag) = obj.get("useMock").and_then(Value::as_bool) {
            self.use_mock = flag;
            applied += 1;
        }

        applied
    }

    /// The trimmed endpoint, or the default one if it is blank
    pub fn effective_endpoint(&self) -> &str {
        let trimmed = self.endpoint.trim();
        if trimmed.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            trimmed
        }
    }
}

/// Settings bound to their storage key
pub struct SettingsStore {
    settings: Settings,
    storage: SharedStorage,
}

impl SettingsStore {
    /// Load settings, starting from `defaults` and overlaying whatever is stored
    pub fn load(storage: SharedStorage, defaults: Settings) -> Self {
        let mut settings = defaults;

        match storage.get(SETTINGS_KEY) {
            Ok(Some(raw)) if !raw.is_empty() => match serde_json::from_str::<Value>(&raw) {
                Ok(stored) => {
                    let applied = settings.apply_stored(&stored);
                    tracing::debug!("Loaded {} stored setting(s)", applied);
                }
                Err(e) => tracing::warn!("Failed to load settings: {}", e),
            },
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to load settings: {}", e),
        }

        Self { settings, storage }
    }

    /// Current settings
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Set the endpoint (stored trimmed) and persist
    pub fn set_endpoint(&mut self, endpoint: &str) {
        self.settings.endpoint = endpoint.trim().to_string();
        self.save();
    }

    /// Toggle streaming and persist
    pub fn set_streaming(&mut self, enabled: bool) {
        self.settings.use_streaming = enabled;
        self.save();
    }

    /// Toggle mock mode and persist
    pub fn set_mock(&mut self, enabled: bool) {
        self.settings.use_mock = enabled;
        self.save();
    }

    /// See [`Settings::effective_endpoint`]
    pub fn effective_endpoint(&self) -> &str {
        self.settings.effective_endpoint()
    }

    /// Persist the record. Failures are logged and otherwise ignored.
    pub fn save(&self) {
        let result = serde_json::to_string(&self.settings)
            .map_err(crate::Error::from)
            .and_then(|json| self.storage.set(SETTINGS_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to save settings: {}", e);
        }
    }
}
