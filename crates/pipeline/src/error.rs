//! Pipeline error types

use thiserror::Error;

use crate::state::PipelineState;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Submit after shutdown has been initiated
    #[error("pipeline is closed (state: {state})")]
    Closed {
        /// State observed by the rejected call
        state: PipelineState,
    },

    /// `close` called a second time
    ///
    /// A contract breach by the producer. Reported, never masked.
    #[error("pipeline input was already closed")]
    DoubleClose,

    /// Cancellation fired while the call was pending
    #[error("pipeline was cancelled")]
    Cancelled,

    /// `wait` called while the producer may still submit
    #[error("wait called before close (state: {state})")]
    NotClosed {
        /// State observed by the rejected call
        state: PipelineState,
    },

    /// Invalid configuration rejected at start
    #[error("invalid pipeline config: {message}")]
    InvalidConfig {
        /// What was wrong
        message: String,
    },

    /// A pipeline task could not be joined
    #[error("{unit} task failed: {message}")]
    Join {
        /// Which unit ("coordinator", "sink")
        unit: &'static str,
        /// Join error description
        message: String,
    },
}

impl PipelineError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Pipeline Result type alias
pub type Result<T> = std::result::Result<T, PipelineError>;
