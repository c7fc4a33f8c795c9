use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

pub const KEY_ENABLED: &str = "enabled";
pub const KEY_ENABLE_NEW_SITES: &str = "enableNewSites";
pub const KEY_ENABLED_SITES: &str = "enabledSites";
pub const KEY_DISABLED_SITES: &str = "disabledSites";
pub const KEY_CUSTOM_PARAMS: &str = "customParams";
pub const KEY_INFINITE_SCROLL: &str = "infiniteScroll";

pub const ALL_KEYS: [&str; 6] = [
    KEY_ENABLED,
    KEY_ENABLE_NEW_SITES,
    KEY_ENABLED_SITES,
    KEY_DISABLED_SITES,
    KEY_CUSTOM_PARAMS,
    KEY_INFINITE_SCROLL,
];

/// Extension-wide key-value settings store.
///
/// The engine only reads; writes belong to the popup.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Values for the requested keys. Missing keys are simply absent.
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>>;
}

/// User-defined URL parameter override for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomParam {
    pub param: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    pub enable_new_sites: bool,
    pub enabled_sites: Vec<String>,
    pub disabled_sites: Vec<String>,
    pub custom_params: BTreeMap<String, CustomParam>,
    pub infinite_scroll: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_new_sites: true,
            enabled_sites: Vec::new(),
            disabled_sites: Vec::new(),
            custom_params: BTreeMap::new(),
            infinite_scroll: false,
        }
    }
}

impl Settings {
    /// Decodes raw store values the way the extension reads them: toggles
    /// are on unless explicitly `false`, infinite scroll is off unless
    /// explicitly `true`, and malformed entries are ignored.
    pub fn from_values(values: &Map<String, Value>) -> Self {
        let custom_params = values
            .get(KEY_CUSTOM_PARAMS)
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(domain, raw)| {
                        serde_json::from_value::<CustomParam>(raw.clone())
                            .ok()
                            .map(|param| (domain.clone(), param))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            enabled: values.get(KEY_ENABLED) != Some(&Value::Bool(false)),
            enable_new_sites: values.get(KEY_ENABLE_NEW_SITES) != Some(&Value::Bool(false)),
            enabled_sites: string_list(values.get(KEY_ENABLED_SITES)),
            disabled_sites: string_list(values.get(KEY_DISABLED_SITES)),
            custom_params,
            infinite_scroll: values.get(KEY_INFINITE_SCROLL) == Some(&Value::Bool(true)),
        }
    }

    pub fn to_values(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Site is enabled if explicitly enabled, or not disabled while unknown
    /// sites are enabled by default.
    pub fn is_site_enabled(&self, host: &str) -> bool {
        let explicitly_enabled = self.enabled_sites.iter().any(|s| host_matches(host, s));
        let explicitly_disabled = self.disabled_sites.iter().any(|s| host_matches(host, s));
        explicitly_enabled || (!explicitly_disabled && self.enable_new_sites)
    }

    pub fn is_active_for(&self, host: &str) -> bool {
        self.enabled && self.is_site_enabled(host)
    }

    pub fn custom_param_for(&self, host: &str) -> Option<(&str, &CustomParam)> {
        self.custom_params
            .iter()
            .find(|(domain, _)| host_matches(host, domain))
            .map(|(domain, param)| (domain.as_str(), param))
    }
}

/// Substring match in either direction. Empty strings never match.
pub fn host_matches(host: &str, site: &str) -> bool {
    if host.is_empty() || site.is_empty() {
        return false;
    }
    host.contains(site) || site.contains(host)
}

/// Reads the given keys, failing open to defaults when the store is
/// unreachable.
pub async fn load_settings(store: &dyn SettingsStore, keys: &[&str]) -> Settings {
    match store.get(keys).await {
        Ok(values) => Settings::from_values(&values),
        Err(e) => {
            warn!("Settings store unavailable, using defaults: {}", e);
            Settings::default()
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(raw: Value) -> Map<String, Value> {
        raw.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_keys_use_install_defaults() {
        let settings = Settings::from_values(&Map::new());
        assert_eq!(settings, Settings::default());
        assert!(settings.is_active_for("shop.example.com"));
    }

    #[test]
    fn test_toggles_only_off_when_false() {
        let settings = Settings::from_values(&values(json!({
            "enabled": null,
            "enableNewSites": 0,
            "infiniteScroll": "yes"
        })));
        assert!(settings.enabled);
        assert!(settings.enable_new_sites);
        assert!(!settings.infinite_scroll);
    }

    #[test]
    fn test_site_lists() {
        let settings = Settings::from_values(&values(json!({
            "enableNewSites": false,
            "enabledSites": ["example.com"],
            "disabledSites": ["blocked.org"]
        })));
        assert!(settings.is_site_enabled("www.example.com"));
        assert!(!settings.is_site_enabled("blocked.org"));
        assert!(!settings.is_site_enabled("unknown.net"));
    }

    #[test]
    fn test_explicit_enable_beats_disable() {
        let settings = Settings::from_values(&values(json!({
            "enabledSites": ["example.com"],
            "disabledSites": ["example.com"]
        })));
        assert!(settings.is_site_enabled("example.com"));
    }

    #[test]
    fn test_custom_param_lookup_skips_malformed() {
        let settings = Settings::from_values(&values(json!({
            "customParams": {
                "broken.com": {"param": 3},
                "shop.com": {"param": "limit", "value": "200"}
            }
        })));
        assert_eq!(settings.custom_params.len(), 1);
        let (domain, param) = settings.custom_param_for("www.shop.com").unwrap();
        assert_eq!(domain, "shop.com");
        assert_eq!(param.value, "200");
        assert!(settings.custom_param_for("broken.com").is_none());
    }

    #[test]
    fn test_empty_host_never_matches() {
        assert!(!host_matches("", "example.com"));
        assert!(!host_matches("example.com", ""));
        assert!(host_matches("example.com", "www.example.com"));
    }
}
