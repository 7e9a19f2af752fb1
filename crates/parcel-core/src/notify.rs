//! Best-effort outbound notifications.
//!
//! Domain operations enqueue without waiting; a single worker task drains
//! the bounded queue into a [`NotificationSink`]. When the queue is full the
//! new notification is dropped and a warning logged. Delivery errors are
//! logged and swallowed.

use std::future::Future;

use parcel_telegram::BotClient;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub chat_id: i64,
    /// Telegram HTML.
    pub text: String,
}

/// Where queued notifications end up.
pub trait NotificationSink: Send + Sync + 'static {
    fn deliver(&self, chat_id: i64, text: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl NotificationSink for BotClient {
    async fn deliver(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        self.send_message(chat_id, text, None).await?;
        Ok(())
    }
}

/// Enqueue side of the notification queue. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<mpsc::Sender<Notification>>,
}

impl Notifier {
    /// Creates the queue; hand the receiver to [`run_worker`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier that discards everything (no bot token configured).
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queues without blocking. Returns whether the notification was queued.
    pub fn enqueue(&self, notification: Notification) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(notification) {
            Ok(()) => true,
            Err(TrySendError::Full(n)) => {
                warn!("Notification queue full, dropping message for chat {}", n.chat_id);
                false
            }
            Err(TrySendError::Closed(n)) => {
                debug!("Notification worker gone, dropping message for chat {}", n.chat_id);
                false
            }
        }
    }

    pub fn send(&self, chat_id: i64, text: impl Into<String>) -> bool {
        self.enqueue(Notification {
            chat_id,
            text: text.into(),
        })
    }
}

/// Drains the queue until every [`Notifier`] clone is dropped.
pub async fn run_worker<S: NotificationSink>(mut rx: mpsc::Receiver<Notification>, sink: S) {
    while let Some(notification) = rx.recv().await {
        if let Err(e) = sink.deliver(notification.chat_id, &notification.text).await {
            warn!("Failed to deliver notification to chat {}: {}", notification.chat_id, e);
        }
    }
    debug!("Notification queue closed");
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records deliveries; chat ids in `failing` error out.
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub delivered: Arc<Mutex<Vec<Notification>>>,
        pub failing: Vec<i64>,
    }

    impl NotificationSink for RecordingSink {
        async fn deliver(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
            if self.failing.contains(&chat_id) {
                anyhow::bail!("chat {} blocked the bot", chat_id);
            }
            self.delivered.lock().unwrap().push(Notification {
                chat_id,
                text: text.to_string(),
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    #[test]
    fn full_queue_drops_new_notifications() {
        let (notifier, mut rx) = Notifier::channel(1);
        assert!(notifier.send(1, "first"));
        assert!(!notifier.send(2, "second"));

        assert_eq!(rx.try_recv().unwrap().chat_id, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disabled_and_closed_queues_drop_silently() {
        assert!(!Notifier::disabled().send(1, "x"));

        let (notifier, rx) = Notifier::channel(4);
        drop(rx);
        assert!(!notifier.send(1, "x"));
    }

    #[tokio::test]
    async fn worker_survives_delivery_errors() {
        let sink = RecordingSink {
            failing: vec![2],
            ..RecordingSink::default()
        };
        let delivered = sink.delivered.clone();

        let (notifier, rx) = Notifier::channel(8);
        notifier.send(1, "a");
        notifier.send(2, "b");
        notifier.send(3, "c");
        drop(notifier);

        run_worker(rx, sink).await;

        let chats: Vec<_> = delivered.lock().unwrap().iter().map(|n| n.chat_id).collect();
        assert_eq!(chats, vec![1, 3]);
    }
}
