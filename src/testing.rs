use crate::core::{CustomParam, DetectionMethod, Notification, Notifier, Settings, SettingsStore};
use crate::dom::HtmlDocument;
use crate::errors::{PageSizeError, Result};
use crate::host::MemorySettingsStore;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Mutex;

pub const DEFAULT_URL: &str = "https://shop.test/";

pub struct TestHelper;

impl TestHelper {
    pub fn document(html: &str) -> HtmlDocument {
        Self::document_at(DEFAULT_URL, html)
    }

    pub fn document_at(url: &str, html: &str) -> HtmlDocument {
        HtmlDocument::parse(url, html).unwrap()
    }

    pub fn settings(settings: Settings) -> MemorySettingsStore {
        MemorySettingsStore::new(settings)
    }

    pub fn with_custom_param(domain: &str, param: &str, value: &str) -> Settings {
        let mut settings = Settings::default();
        settings.custom_params.insert(
            domain.to_string(),
            CustomParam {
                param: param.to_string(),
                value: value.to_string(),
            },
        );
        settings
    }
}

/// Keeps every notification; optionally refuses them all.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Methods of the page-size notifications, in order.
    pub fn methods(&self) -> Vec<DetectionMethod> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::PageSizeApplied { method, .. } => Some(method),
                Notification::LoadMoreClicked { .. } => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> Result<()> {
        if self.fail {
            return Err(PageSizeError::NotifierUnavailable("recording notifier closed".to_string()));
        }
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// A settings store that is never reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSettingsStore;

#[async_trait]
impl SettingsStore for UnavailableSettingsStore {
    async fn get(&self, _keys: &[&str]) -> Result<Map<String, Value>> {
        Err(PageSizeError::SettingsUnavailable("context invalidated".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::load_settings;
    use crate::core::settings::ALL_KEYS;

    #[test]
    fn test_unavailable_store_falls_back_to_defaults() {
        let settings = tokio_test::block_on(load_settings(&UnavailableSettingsStore, &ALL_KEYS));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_failing_notifier_records_nothing() {
        let notifier = RecordingNotifier::failing();
        let result = notifier.notify(Notification::LoadMoreClicked {
            host: "shop.test".to_string(),
        });
        assert!(result.is_err());
        assert!(notifier.notifications().is_empty());
    }
}
