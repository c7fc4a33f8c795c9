use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Which pipeline stage applied the page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    Custom,
    Known,
    Detected,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectionMethod::Custom => "custom",
            DetectionMethod::Known => "known",
            DetectionMethod::Detected => "detected",
        };
        f.write_str(name)
    }
}

/// Messages sent to the extension's background process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    PageSizeApplied {
        method: DetectionMethod,
        host: String,
        url: String,
    },
    LoadMoreClicked {
        host: String,
    },
}

/// Fire-and-forget channel to the background process.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<()>;
}

/// Sends a notification, logging delivery failures instead of returning them.
pub fn notify_best_effort(notifier: &dyn Notifier, notification: Notification) {
    if let Err(e) = notifier.notify(notification) {
        warn!("Could not notify background: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_wire_format() {
        let applied = Notification::PageSizeApplied {
            method: DetectionMethod::Known,
            host: "www.example.com".to_string(),
            url: "https://www.example.com/list".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&applied).unwrap(),
            json!({
                "type": "PAGE_SIZE_APPLIED",
                "method": "known",
                "host": "www.example.com",
                "url": "https://www.example.com/list"
            })
        );

        let clicked = Notification::LoadMoreClicked {
            host: "shop.test".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&clicked).unwrap(),
            json!({"type": "LOAD_MORE_CLICKED", "host": "shop.test"})
        );
    }
}
