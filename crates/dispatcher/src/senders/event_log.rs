//! EventLogSender - renders one line per notification into an EventLog

use std::sync::Arc;

use async_trait::async_trait;
use contracts::{ContractError, EventLog, Notification, NotificationSender};

/// Sender that writes a formatted delivery line to an injected log
pub struct EventLogSender {
    name: String,
    log: Arc<dyn EventLog>,
}

impl EventLogSender {
    pub fn new(name: impl Into<String>, log: Arc<dyn EventLog>) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }

    /// Line written for one notification
    pub fn render(&self, notification: &Notification) -> String {
        format!(
            "Sending {} to {} ({}): {}",
            self.name, notification.name, notification.target_id, notification.content
        )
    }
}

#[async_trait]
impl NotificationSender for EventLogSender {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification) -> Result<(), ContractError> {
        self.log.record(&self.render(notification));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Lines(Mutex<Vec<String>>);

    impl EventLog for Lines {
        fn record(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    #[tokio::test]
    async fn test_event_log_sender_renders_line() {
        let lines = Arc::new(Lines::default());
        let sender = EventLogSender::new("telegram", lines.clone());
        let n = Notification::new("Cy", "telegram", "@cy", "build passed");

        sender.send(&n).await.unwrap();
        assert_eq!(
            lines.0.lock().unwrap().as_slice(),
            ["Sending telegram to Cy (@cy): build passed"]
        );
    }
}
