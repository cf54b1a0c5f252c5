//! CollectingSink - single-owner accumulator at the end of a pipeline

use contracts::{ContractError, ItemError, ItemResult, Processed, ResultSink};
use tracing::{debug, instrument};

/// Sink that keeps every result it receives
///
/// Only the sink task touches it, so no lock is needed. Recovered from
/// `Completion::sink` after `wait`.
#[derive(Debug)]
pub struct CollectingSink<O> {
    name: String,
    results: Vec<ItemResult<O>>,
}

impl<O> CollectingSink<O> {
    /// Create an empty collecting sink
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            results: Vec::new(),
        }
    }

    /// Results in delivery order
    pub fn results(&self) -> &[ItemResult<O>] {
        &self.results
    }

    /// Consume the sink, returning its results
    pub fn into_results(self) -> Vec<ItemResult<O>> {
        self.results
    }

    /// Successful results in delivery order
    pub fn successes(&self) -> impl Iterator<Item = &Processed<O>> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    /// Failed results in delivery order
    pub fn failures(&self) -> impl Iterator<Item = &ItemError> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }
}

impl<O: Send> ResultSink<O> for CollectingSink<O> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, result: ItemResult<O>) -> Result<(), ContractError> {
        self.results.push(result);
        Ok(())
    }

    #[instrument(name = "collecting_sink_close", skip(self), fields(sink = %self.name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(results = self.results.len(), "CollectingSink closed");
        Ok(())
    }
}
