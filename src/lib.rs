pub mod classifier;
pub mod core;
pub mod detection;
pub mod dom;
pub mod errors;
pub mod host;
pub mod registry;
pub mod runtime;
pub mod scroll;
pub mod strategy;
#[cfg(test)]
pub mod testing;
pub mod types;

pub use crate::core::{Config, DetectionMethod, Notification, Notifier, PageDom, Settings, SettingsStore};
pub use detection::{DetectionOrchestrator, RetryReport};
pub use dom::{DomElement, HtmlDocument};
pub use errors::{PageSizeError, Result};
pub use registry::{SiteConfig, SiteRegistry, Strategy, StrategyDescriptor};
pub use runtime::{MessageResponse, PageSession, RuntimeMessage};
pub use scroll::InfiniteScrollController;
pub use strategy::ApplyOutcome;
pub use types::*;
