use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub classifier: ClassifierConfig,
    pub infinite_scroll: InfiniteScrollConfig,
    pub features: FeatureFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub mutation_debounce_ms: u64,
    pub retry_delays_ms: Vec<u64>,
    /// Run smart detection when a known site's URL pattern does not match
    /// the current page. Off by default: a known site's unrelated pages are
    /// left alone.
    pub fallthrough_on_url_mismatch: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub page_size_keywords: Vec<String>,
    pub common_page_sizes: Vec<i64>,
    pub min_numeric_options: usize,
    pub progression: ProgressionBounds,
    /// Characters of the enclosing container's text included in a
    /// page-size signature.
    pub container_text_limit: usize,
    pub load_more_keywords: Vec<String>,
}

/// Bounds of the "reasonable progression" test: sorted option values must
/// start within `[first_min, first_max]` and increase strictly up to `max`.
///
/// Empirically tuned; recalibrate against real pages before changing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressionBounds {
    pub first_min: i64,
    pub first_max: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfiniteScrollConfig {
    pub root_margin_px: f64,
    pub near_bottom_px: f64,
    pub visible_below_px: f64,
    pub visible_above_px: f64,
    pub scroll_debounce_ms: u64,
    pub rescan_debounce_ms: u64,
    pub cooldown_ms: u64,
    pub settle_ms: u64,
    pub observed_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub infinite_scroll: bool,
    pub smart_detection: bool,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl DetectionConfig {
    pub fn mutation_debounce(&self) -> Duration {
        Duration::from_millis(self.mutation_debounce_ms)
    }

    pub fn retry_delays(&self) -> impl Iterator<Item = Duration> + '_ {
        self.retry_delays_ms.iter().copied().map(Duration::from_millis)
    }
}

impl InfiniteScrollConfig {
    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }

    pub fn rescan_debounce(&self) -> Duration {
        Duration::from_millis(self.rescan_debounce_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            mutation_debounce_ms: 500,
            retry_delays_ms: vec![2000, 5000],
            fallthrough_on_url_mismatch: false,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            page_size_keywords: to_strings(&[
                "per page",
                "per_page",
                "perpage",
                "pagesize",
                "page-size",
                "page_size",
                "items",
                "results",
                "show",
                "display",
                "view",
                "count",
                "limit",
                "rows",
            ]),
            common_page_sizes: vec![
                10, 12, 15, 16, 20, 24, 25, 30, 32, 36, 40, 48, 50, 60, 64, 72, 75, 80, 96, 100,
                120, 150, 200, 250, 500,
            ],
            min_numeric_options: 2,
            progression: ProgressionBounds::default(),
            container_text_limit: 100,
            load_more_keywords: to_strings(&[
                "load more",
                "show more",
                "view more",
                "see more",
                "more results",
                "load additional",
                "show all",
                "view all",
                "see all",
                "display more",
                "next page",
                "continue",
                "expand",
                "more items",
                "more products",
                "load next",
                "show next",
                "fetch more",
                "get more",
                "view more products",
                "show more products",
                "load more products",
                "see more products",
            ]),
        }
    }
}

impl Default for ProgressionBounds {
    fn default() -> Self {
        Self {
            first_min: 5,
            first_max: 50,
            max: 1000,
        }
    }
}

impl Default for InfiniteScrollConfig {
    fn default() -> Self {
        Self {
            root_margin_px: 500.0,
            near_bottom_px: 800.0,
            visible_below_px: 800.0,
            visible_above_px: 100.0,
            scroll_debounce_ms: 200,
            rescan_debounce_ms: 500,
            cooldown_ms: 1500,
            settle_ms: 1000,
            observed_marker: "data-max-page-size-observed".to_string(),
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            infinite_scroll: true,
            smart_detection: true,
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"detection": {"retry_delays_ms": [1000]}}"#).unwrap();
        assert_eq!(config.detection.retry_delays_ms, vec![1000]);
        assert_eq!(config.detection.mutation_debounce_ms, 500);
        assert_eq!(config.infinite_scroll.cooldown_ms, 1500);
        assert!(config.features.smart_detection);
    }

    #[test]
    fn test_progression_defaults() {
        let bounds = ClassifierConfig::default().progression;
        assert_eq!((bounds.first_min, bounds.first_max, bounds.max), (5, 50, 1000));
    }
}
