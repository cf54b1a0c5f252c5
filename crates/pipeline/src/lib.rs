//! # Pipeline
//!
//! Bounded concurrent pipeline with safe shutdown.
//!
//! Responsibilities:
//! - Producer → Worker(s) → Sink over two bounded queues
//! - Backpressure: `submit` suspends while the input queue is full
//! - Single-closer shutdown: the producer closes the input queue, the
//!   coordinator closes the output queue after every worker has exited
//! - Cancellation with a `Drain` or `Abandon` policy
//! - Optional submission-order delivery
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::{transform_fn, Item};
//! use pipeline::{CollectingSink, Pipeline, PipelineConfig};
//!
//! let transform = transform_fn(|item: Item| Ok(format!("processed:{}", item.id)));
//! let mut handle = Pipeline::start(
//!     PipelineConfig::with_workers(4),
//!     transform,
//!     CollectingSink::new("results"),
//! )?;
//!
//! handle.submit(Item::new(1, "a".to_string())).await?;
//! handle.close()?;
//!
//! let completion = handle.wait().await?;
//! println!("{} results", completion.sink.results().len());
//! ```

mod accumulator;
mod cancel;
mod collect;
mod config;
mod error;
mod pipeline;
mod queue;
mod reorder;
mod state;
mod worker;

// Re-exports
pub use accumulator::SharedAccumulator;
pub use cancel::CancelToken;
pub use collect::CollectingSink;
pub use config::{MetricsSnapshot, OrderingMode, PipelineConfig, PipelineMetrics, ShutdownPolicy};
pub use error::{PipelineError, Result};
pub use pipeline::{Completion, Pipeline, PipelineHandle, PipelineReport};
pub use reorder::Reorderer;
pub use state::PipelineState;
