//! DiscardSender - accepts and drops notifications (dry runs)

use async_trait::async_trait;
use contracts::{ContractError, Notification, NotificationSender};
use tracing::debug;

/// Sender that accepts every notification and does nothing with it
pub struct DiscardSender {
    name: String,
}

impl DiscardSender {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl NotificationSender for DiscardSender {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification) -> Result<(), ContractError> {
        debug!(sender = %self.name, kind = %notification.kind, "Notification discarded");
        Ok(())
    }
}
