//! Helpers for reading and writing the `apps.config` payload.
//!
//! The orchestrator and reconciler persist identities, flags, and API
//! credentials inside the app's free-form configuration map. This module
//! centralizes parsing and serialization so background workers share the
//! same contract instead of poking at raw JSON keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::warn;
use uuid::Uuid;

/// API credentials for the e-commerce provider.
///
/// Immutable value object: validated once at configuration time and
/// re-derived from the stored configuration for every operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiCredentials {
    pub domain: String,
    pub app_key: String,
    pub app_token: String,
}

impl ApiCredentials {
    /// All three parts must be present for any synchronization to start.
    pub fn is_complete(&self) -> bool {
        !self.domain.is_empty() && !self.app_key.is_empty() && !self.app_token.is_empty()
    }
}

/// Typed view over the recognized keys of `apps.config`.
///
/// Unknown keys are carried in `extra` and preserved on write-back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppSettings {
    /// Business identity on the catalog provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wa_business_id: Option<String>,
    /// Catalog-account identity on the catalog provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wa_waba_id: Option<String>,
    /// Set once the first full product synchronization has completed
    #[serde(default)]
    pub initial_sync_completed: bool,
    /// Set once a catalog has been connected to this app
    #[serde(default)]
    pub connected_catalog: bool,
    /// Opt-in to the batch synchronization mode
    #[serde(default)]
    pub use_sync_v2: bool,
    /// Public storefront domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_domain: Option<String>,
    /// Downstream channel app this commerce app feeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_app_id: Option<Uuid>,
    /// E-commerce API credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_credentials: Option<ApiCredentials>,
    /// Unrecognized keys, preserved on write-back
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl AppSettings {
    /// Parse settings from the given config value, falling back to defaults
    /// on unexpected shapes.
    pub fn from_config(config: &JsonValue) -> Self {
        match config {
            JsonValue::Object(_) => {
                serde_json::from_value::<Self>(config.clone()).unwrap_or_else(|err| {
                    warn!(error = %err, "Failed to parse app config; using defaults");
                    Self::default()
                })
            }
            other => {
                warn!(value = ?other, "Unexpected app config format; expected object");
                Self::default()
            }
        }
    }

    /// Serialize the settings back into a config value.
    pub fn to_config(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Object(Map::new()))
    }

    /// Credentials, provided all three parts are present.
    pub fn complete_credentials(&self) -> Option<&ApiCredentials> {
        self.api_credentials
            .as_ref()
            .filter(|creds| creds.is_complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_settings_from_object() {
        let raw = json!({
            "wa_business_id": "1001",
            "wa_waba_id": "2002",
            "initial_sync_completed": true,
            "use_sync_v2": true,
            "api_credentials": {
                "domain": "store.example",
                "app_key": "key",
                "app_token": "token"
            },
            "rules": ["currency_pt_br"]
        });

        let settings = AppSettings::from_config(&raw);
        assert_eq!(settings.wa_business_id.as_deref(), Some("1001"));
        assert_eq!(settings.wa_waba_id.as_deref(), Some("2002"));
        assert!(settings.initial_sync_completed);
        assert!(settings.use_sync_v2);
        assert!(!settings.connected_catalog);
        assert!(settings.complete_credentials().is_some());
        assert!(settings.extra.contains_key("rules"));
    }

    #[test]
    fn write_back_preserves_unknown_keys() {
        let raw = json!({
            "connected_catalog": false,
            "rules": ["calculate_by_weight"]
        });

        let mut settings = AppSettings::from_config(&raw);
        settings.connected_catalog = true;
        let updated = settings.to_config();

        assert_eq!(updated.get("connected_catalog"), Some(&json!(true)));
        assert_eq!(updated.get("rules"), Some(&json!(["calculate_by_weight"])));
    }

    #[test]
    fn incomplete_credentials_are_rejected() {
        let raw = json!({
            "api_credentials": {
                "domain": "store.example",
                "app_key": "",
                "app_token": "token"
            }
        });

        let settings = AppSettings::from_config(&raw);
        assert!(settings.api_credentials.is_some());
        assert!(settings.complete_credentials().is_none());
    }

    #[test]
    fn non_object_config_falls_back_to_defaults() {
        let settings = AppSettings::from_config(&json!("oops"));
        assert_eq!(settings, AppSettings::default());
    }
}
