pub mod config;
pub mod dom;
pub mod notifier;
pub mod settings;

pub use config::{
    ClassifierConfig, Config, DetectionConfig, FeatureFlags, InfiniteScrollConfig,
    ProgressionBounds,
};
pub use dom::{DomEvent, NodeId, PageDom};
pub use notifier::{notify_best_effort, DetectionMethod, Notification, Notifier};
pub use settings::{host_matches, load_settings, CustomParam, Settings, SettingsStore};
