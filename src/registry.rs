//! Known-site configurations.
//!
//! The table itself is data (`data/sites.json`); this module only decodes it
//! and picks the entry for a host.

use crate::errors::{PageSizeError, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use tracing::debug;

const BUILTIN_SITES: &str = include_str!("../data/sites.json");

/// Compiled URL guard on a descriptor.
#[derive(Clone)]
pub struct UrlPattern(Regex);

impl UrlPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self(Regex::new(pattern)?))
    }

    pub fn matches(&self, url: &str) -> bool {
        self.0.is_match(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.0.as_str())
    }
}

impl Serialize for UrlPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UrlPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        UrlPattern::new(&pattern).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum Strategy {
    /// Pick the largest numeric option of the first matching select.
    SelectMaxNumeric { selectors: Vec<String> },
    /// Rewrite a query parameter and reload.
    UrlParam {
        param: String,
        #[serde(rename = "maxValue")]
        max_value: String,
    },
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::SelectMaxNumeric { .. } => "select-max-numeric",
            Strategy::UrlParam { .. } => "url-param",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    #[serde(flatten)]
    pub strategy: Strategy,
    #[serde(rename = "urlPattern", default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<UrlPattern>,
}

impl StrategyDescriptor {
    pub fn select_max_numeric<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            strategy: Strategy::SelectMaxNumeric {
                selectors: selectors.into_iter().map(Into::into).collect(),
            },
            url_pattern: None,
        }
    }

    pub fn url_param(param: impl Into<String>, max_value: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::UrlParam {
                param: param.into(),
                max_value: max_value.into(),
            },
            url_pattern: None,
        }
    }

    pub fn with_url_pattern(mut self, pattern: UrlPattern) -> Self {
        self.url_pattern = Some(pattern);
        self
    }

    /// Whether the descriptor may run on `url`. Descriptors without a
    /// pattern apply everywhere on their site.
    pub fn applies_to(&self, url: &str) -> bool {
        self.url_pattern
            .as_ref()
            .map(|pattern| pattern.matches(url))
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub domain: String,
    #[serde(flatten)]
    pub descriptor: StrategyDescriptor,
}

impl SiteConfig {
    pub fn new(domain: impl Into<String>, descriptor: StrategyDescriptor) -> Self {
        Self {
            domain: domain.into(),
            descriptor,
        }
    }

    /// Substring match against the host in either direction, ignoring a
    /// leading `www.` on the host.
    pub fn matches_host(&self, host: &str) -> bool {
        let bare = host.strip_prefix("www.").unwrap_or(host);
        if self.domain.is_empty() || bare.is_empty() {
            return false;
        }
        host.contains(&self.domain) || self.domain.contains(bare)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    entries: Vec<SiteConfig>,
}

impl SiteRegistry {
    pub fn new(entries: Vec<SiteConfig>) -> Self {
        Self { entries }
    }

    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_SITES)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: Vec<SiteConfig> = serde_json::from_str(raw)
            .map_err(|e| PageSizeError::Registry(format!("invalid site table: {}", e)))?;
        debug!("Loaded {} site configurations", entries.len());
        Ok(Self { entries })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn entries(&self) -> &[SiteConfig] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for `host`: the longest matching domain key, earliest entry on
    /// ties.
    pub fn lookup(&self, host: &str) -> Option<&SiteConfig> {
        self.entries
            .iter()
            .filter(|entry| entry.matches_host(host))
            .fold(None, |best: Option<&SiteConfig>, entry| match best {
                Some(b) if b.domain.len() >= entry.domain.len() => Some(b),
                _ => Some(entry),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_loads() {
        let registry = SiteRegistry::builtin().unwrap();
        assert!(registry.len() >= 40);

        let bing = registry.lookup("www.bing.com").unwrap();
        assert_eq!(
            bing.descriptor.strategy,
            Strategy::UrlParam {
                param: "count".to_string(),
                max_value: "50".to_string()
            }
        );
        assert!(bing.descriptor.applies_to("https://www.bing.com/search?q=rust"));
        assert!(!bing.descriptor.applies_to("https://www.bing.com/images"));
    }

    #[test]
    fn test_lookup_is_www_insensitive_and_bidirectional() {
        let registry = SiteRegistry::new(vec![SiteConfig::new(
            "example.com",
            StrategyDescriptor::select_max_numeric(["select#size"]),
        )]);
        assert!(registry.lookup("www.example.com").is_some());
        assert!(registry.lookup("shop.example.com").is_some());
        // host is a substring of the key
        assert!(registry.lookup("example.co").is_some());
        assert!(registry.lookup("other.org").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn test_lookup_prefers_longest_key() {
        let registry = SiteRegistry::new(vec![
            SiteConfig::new("yahoo.com", StrategyDescriptor::url_param("p", "1")),
            SiteConfig::new("search.yahoo.com", StrategyDescriptor::url_param("n", "100")),
        ]);
        let entry = registry.lookup("search.yahoo.com").unwrap();
        assert_eq!(entry.domain, "search.yahoo.com");
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let err = SiteRegistry::from_json(r#"[{"domain": "a.com", "strategy": "scroll"}]"#)
            .unwrap_err();
        assert!(matches!(err, PageSizeError::Registry(_)));
    }

    #[test]
    fn test_bad_url_pattern_is_rejected() {
        let raw = r#"[{"domain": "a.com", "strategy": "url-param", "param": "n",
                       "maxValue": "9", "urlPattern": "("}]"#;
        assert!(SiteRegistry::from_json(raw).is_err());
    }

    #[test]
    fn test_descriptor_round_trips_wire_shape() {
        let descriptor = StrategyDescriptor::url_param("count", "50")
            .with_url_pattern(UrlPattern::new("/search").unwrap());
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "strategy": "url-param",
                "param": "count",
                "maxValue": "50",
                "urlPattern": "/search"
            })
        );
    }
}
