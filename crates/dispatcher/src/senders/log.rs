//! LogSender - delivers notifications by logging them via tracing

use std::collections::HashMap;

use async_trait::async_trait;
use contracts::{ContractError, Notification, NotificationSender};
use tracing::{info, instrument};

/// Sender that logs each notification, standing in for a real channel
pub struct LogSender {
    name: String,
    channel: String,
}

impl LogSender {
    /// Create a LogSender for the given channel label
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            channel: name.clone(),
            name,
        }
    }

    /// Create from route parameters
    ///
    /// Supported params:
    /// - `channel`: label written with every line (default: the sender name)
    pub fn from_params(name: impl Into<String>, params: &HashMap<String, String>) -> Self {
        let mut sender = Self::new(name);
        if let Some(channel) = params.get("channel") {
            sender.channel = channel.clone();
        }
        sender
    }

    /// Channel label
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl NotificationSender for LogSender {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sender_send",
        skip(self, notification),
        fields(sender = %self.name, kind = %notification.kind)
    )]
    async fn send(&self, notification: &Notification) -> Result<(), ContractError> {
        info!(
            channel = %self.channel,
            recipient = %notification.name,
            target = %notification.target_id,
            content = %notification.content,
            "Notification delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sender_send() {
        let sender = LogSender::new("email");
        let n = Notification::new("Ann", "email", "ann@example.com", "hello");
        assert!(sender.send(&n).await.is_ok());
    }

    #[test]
    fn test_log_sender_params() {
        let params = HashMap::from([("channel".to_string(), "telegram-bot".to_string())]);
        let sender = LogSender::from_params("telegram", &params);
        assert_eq!(sender.name(), "telegram");
        assert_eq!(sender.channel(), "telegram-bot");
        assert_eq!(LogSender::new("email").channel(), "email");
    }
}
