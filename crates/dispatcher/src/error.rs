//! Dispatcher error types

use contracts::{ContractError, FormatTag};
use thiserror::Error;

/// Dispatcher-specific errors
///
/// Every variant is returned to the caller of `dispatch`; none of them stops
/// other in-flight dispatch calls.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No sender registered for the notification kind
    #[error("no route registered for kind '{kind}'")]
    NoRoute { kind: String },

    /// No parser registered for the requested format tag
    #[error("no parser registered for format '{format}'")]
    UnknownFormat { format: FormatTag },

    /// Raw input could not be parsed into a notification
    #[error("parse failed: {0}")]
    Parse(#[source] ContractError),

    /// The selected sender failed to deliver
    #[error("sender '{sender}' failed for kind '{kind}': {source}")]
    Send {
        kind: String,
        sender: String,
        #[source]
        source: ContractError,
    },

    /// Sender creation from configuration failed
    #[error("failed to create sender for kind '{kind}': {message}")]
    SenderCreation { kind: String, message: String },
}

impl DispatchError {
    /// Create a no-route error
    pub fn no_route(kind: impl Into<String>) -> Self {
        Self::NoRoute { kind: kind.into() }
    }

    /// Create a sender creation error
    pub fn sender_creation(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SenderCreation {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Whether this is a missing-route error
    pub fn is_no_route(&self) -> bool {
        matches!(self, Self::NoRoute { .. })
    }
}
