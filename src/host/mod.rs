//! Stand-ins for the browser extension environment: where settings come
//! from and where notifications go.

pub mod notifier;
pub mod settings;

pub use notifier::{ChannelNotifier, TracingNotifier};
pub use settings::{FileSettingsStore, MemorySettingsStore};
