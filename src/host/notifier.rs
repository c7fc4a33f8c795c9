use crate::core::{Notification, Notifier};
use crate::errors::{PageSizeError, Result};
use tokio::sync::mpsc;
use tracing::info;

/// Logs every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) -> Result<()> {
        let payload = serde_json::to_string(&notification)?;
        info!(target: "max_page_size::background", "{}", payload);
        Ok(())
    }
}

/// Forwards notifications to a background consumer over an unbounded
/// channel. Sending never blocks; it fails once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) -> Result<()> {
        self.sender
            .send(notification)
            .map_err(|_| PageSizeError::NotifierUnavailable("background receiver dropped".to_string()))
    }
}
