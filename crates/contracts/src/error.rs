//! Layered error definitions
//!
//! Categorized by source: item / parse / send / config

use thiserror::Error;

use crate::ItemId;

/// Per-item transform failure
///
/// Recoverable: it travels downstream as the item's result instead of
/// crashing the worker that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("item {id} failed: {cause}")]
pub struct ItemError {
    /// Identifier of the originating item
    pub id: ItemId,
    /// Human readable cause
    pub cause: String,
}

impl ItemError {
    /// Create an item error
    pub fn new(id: ItemId, cause: impl Into<String>) -> Self {
        Self {
            id,
            cause: cause.into(),
        }
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Item Errors =====
    /// Transform failure for a single item
    #[error(transparent)]
    Item(#[from] ItemError),

    // ===== Parse Errors =====
    /// Malformed raw input
    #[error("parse error ({format}): {message}")]
    Parse { format: String, message: String },

    // ===== Send Errors =====
    /// Sender capability failed to deliver
    #[error("sender '{sender}' failed: {message}")]
    Send { sender: String, message: String },

    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create parse error
    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Create send error
    pub fn send(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Send {
            sender: sender.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from malformed input
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
