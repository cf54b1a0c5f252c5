//! ResultSink trait - pipeline output interface
//!
//! Defines the abstract interface for the final pipeline stage.

use crate::{ContractError, ItemResult};

/// Pipeline output trait
///
/// A sink is owned by exactly one execution unit (the pipeline's sink task),
/// so it may keep accumulation state without locking.
#[trait_variant::make(ResultSink: Send)]
pub trait LocalResultSink<O> {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Consume one result
    ///
    /// # Errors
    /// Returns write error (should include context); the pipeline logs it
    /// and keeps consuming.
    async fn write(&mut self, result: ItemResult<O>) -> Result<(), ContractError>;

    /// Called once after the output queue has been closed and drained
    async fn close(&mut self) -> Result<(), ContractError>;
}
