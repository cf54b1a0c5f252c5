//! Orders Pipeline Demo
//!
//! A producer task submits orders into a bounded pipeline, several workers
//! process them concurrently and record each result into shared state.
//! The run finishes through the normal close/wait shutdown path.
//!
//! Run with: cargo run -p demos --bin orders_pipeline [ORDERS] [WORKERS]

use std::time::Duration;

use contracts::{Item, OrderingMode, PipelineConfig, ShutdownPolicy, Transform};
use observability::{LogFormat, ObservabilityConfig};
use pipeline::{CollectingSink, Pipeline, SharedAccumulator};
use rand::Rng;

/// Simulated order handler
struct ProcessOrder {
    processed: SharedAccumulator<u64, String>,
}

impl Transform<String, String> for ProcessOrder {
    async fn apply(&self, item: Item) -> Result<String, String> {
        let work_ms = rand::rng().random_range(1..10);
        tokio::time::sleep(Duration::from_millis(work_ms)).await;

        let line = format!("Order {} processed", item.id);
        self.processed.insert(item.id, line.clone());
        Ok(line)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_with_config(ObservabilityConfig::logging_only(
        LogFormat::Compact,
        "info",
    ))?;

    let mut args = std::env::args().skip(1);
    let orders: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(20);
    let workers: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(4);

    tracing::info!(orders, workers, "Starting orders pipeline demo");

    // ==== Stage 1: Start pipeline ====
    let processed = SharedAccumulator::new();
    let config = PipelineConfig {
        worker_count: workers,
        queue_capacity: 8,
        ordering: OrderingMode::Submission,
        shutdown: ShutdownPolicy::Drain,
    };
    let handle = Pipeline::start(
        config,
        ProcessOrder {
            processed: processed.clone(),
        },
        CollectingSink::new("orders"),
    )?;

    // ==== Stage 2: Producer task owns the handle ====
    let producer = tokio::spawn(async move {
        for id in 1..=orders {
            handle.submit(Item::new(id, format!("order-{id}"))).await?;
        }
        tracing::info!("All orders submitted, closing input");
        handle.close_and_wait().await
    });

    // ==== Stage 3: Wait for shutdown ====
    let completion = producer.await??;

    for result in completion.sink.results() {
        match result {
            Ok(done) => println!("{}", done.payload),
            Err(e) => println!("{e}"),
        }
    }

    let report = &completion.report;
    println!("\n=== Summary ===");
    println!("Submitted:  {}", report.submitted);
    println!("Succeeded:  {}", report.succeeded);
    println!("Failed:     {}", report.failed);
    println!("Recorded:   {}", processed.len());
    println!("Duration:   {:.2?}", report.duration);
    println!("Throughput: {:.1} items/s", report.throughput());

    Ok(())
}
