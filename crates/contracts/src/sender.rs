//! Sender and parser capabilities used by the dispatcher
//!
//! Both are injected by callers; the dispatcher only knows these traits.

use async_trait::async_trait;

use crate::{ContractError, Notification};

/// Delivery capability for one notification channel
///
/// Senders live in the route table behind `Arc<dyn NotificationSender>` and
/// are invoked concurrently from many dispatch calls, so `send` takes `&self`.
///
/// # Example
///
/// ```ignore
/// struct Sms;
///
/// #[async_trait]
/// impl NotificationSender for Sms {
///     fn name(&self) -> &str { "sms" }
///     async fn send(&self, n: &Notification) -> Result<(), ContractError> {
///         gateway.post(&n.target_id, &n.content).await
///     }
/// }
/// ```
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sender name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one notification
    ///
    /// # Errors
    /// Returns `ContractError::Send` when delivery fails
    async fn send(&self, notification: &Notification) -> Result<(), ContractError>;
}

/// Raw text to `Notification` parser
pub trait NotificationParser: Send + Sync {
    /// Parse one raw record
    ///
    /// # Errors
    /// Returns `ContractError::Parse` for malformed input. A parser must never
    /// return a default-filled notification in place of an error.
    fn parse(&self, raw: &str) -> Result<Notification, ContractError>;
}
