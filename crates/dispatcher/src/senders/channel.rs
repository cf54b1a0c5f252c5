//! ChannelSender - forwards notifications into a bounded tokio channel

use async_trait::async_trait;
use contracts::{ContractError, Notification, NotificationSender};
use tokio::sync::mpsc;
use tracing::error;

/// Sender that hands each notification to a downstream task
///
/// `send` suspends while the channel is full and fails once the receiver
/// has been dropped.
pub struct ChannelSender {
    name: String,
    tx: mpsc::Sender<Notification>,
}

impl ChannelSender {
    /// Create a sender and the receiver it feeds
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                name: name.into(),
                tx,
            },
            rx,
        )
    }

    /// Wrap an existing channel sender
    pub fn from_sender(name: impl Into<String>, tx: mpsc::Sender<Notification>) -> Self {
        Self {
            name: name.into(),
            tx,
        }
    }
}

#[async_trait]
impl NotificationSender for ChannelSender {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification) -> Result<(), ContractError> {
        self.tx.send(notification.clone()).await.map_err(|_| {
            error!(sender = %self.name, "Receiver dropped");
            ContractError::send(&self.name, "receiver dropped")
        })
    }
}
