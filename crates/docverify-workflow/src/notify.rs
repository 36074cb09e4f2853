//! Transient user notifications.
//!
//! Fire-and-forget: events go onto an unbounded channel that a presenter drains, and
//! are mirrored to `tracing`. A closed or absent receiver is not an error.

use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<Notification>>,
}

impl Notifier {
    /// Notifier plus the receiving end a presenter drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Notifier that only logs.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(notification = %message, "Success notification");
        self.emit(NotificationLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(notification = %message, "Error notification");
        self.emit(NotificationLevel::Error, message);
    }

    fn emit(&self, level: NotificationLevel, message: String) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Notification { level, message });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_delivers_in_order() {
        let (notifier, mut rx) = Notifier::channel();
        notifier.success("OTP Sent Successfully");
        notifier.error("Upload failed");

        assert_eq!(
            rx.try_recv().unwrap(),
            Notification {
                level: NotificationLevel::Success,
                message: "OTP Sent Successfully".to_string()
            }
        );
        assert_eq!(rx.try_recv().unwrap().level, NotificationLevel::Error);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let (notifier, rx) = Notifier::channel();
        drop(rx);
        notifier.error("nobody listening");
        Notifier::disabled().success("no channel");
    }
}
