use crate::detection::RetryReport;
use serde::{Deserialize, Serialize};

/// Requests delivered to a page session by the popup or background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeMessage {
    RetryDetection,
    InfiniteScrollChanged { enabled: bool },
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageResponse {
    Retry(RetryReport),
    Ack { success: bool },
}

impl MessageResponse {
    pub fn is_success(&self) -> bool {
        match self {
            MessageResponse::Retry(report) => report.applied_after,
            MessageResponse::Ack { success } => *success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_wire_format() {
        let retry: RuntimeMessage = serde_json::from_value(json!({"type": "RETRY_DETECTION"})).unwrap();
        assert_eq!(retry, RuntimeMessage::RetryDetection);

        let changed: RuntimeMessage =
            serde_json::from_value(json!({"type": "INFINITE_SCROLL_CHANGED", "enabled": true}))
                .unwrap();
        assert_eq!(changed, RuntimeMessage::InfiniteScrollChanged { enabled: true });

        assert!(serde_json::from_value::<RuntimeMessage>(json!({"type": "PING"})).is_err());
        assert_eq!(
            serde_json::to_value(MessageResponse::Ack { success: true }).unwrap(),
            json!({"success": true})
        );
    }
}
