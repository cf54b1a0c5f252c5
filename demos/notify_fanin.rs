//! Notification Fan-in Demo
//!
//! Several tasks dispatch notifications through one shared `Dispatcher`.
//! One of them uses a kind with no registered sender; its failure is
//! reported and the other tasks keep delivering.
//!
//! Run with: cargo run -p demos --bin notify_fanin

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use contracts::{ContractError, EventLog, FormatTag, Notification, NotificationSender, TracingLog};
use dispatcher::{DispatchError, Dispatcher, EventLogSender, ParserRegistry};
use observability::{LogFormat, ObservabilityConfig};
use rand::Rng;
use tokio::task::JoinSet;

/// Sender that takes a random amount of time per delivery
struct SlowGateway {
    name: String,
    log: Arc<dyn EventLog>,
}

#[async_trait]
impl NotificationSender for SlowGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification) -> Result<(), ContractError> {
        let delay = rand::rng().random_range(5..50);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.log.record(&format!(
            "Sending {} to {} ({}): {}",
            self.name, notification.name, notification.target_id, notification.content
        ));
        Ok(())
    }
}

/// "name,kind,target_id,content"
struct CsvParser;

impl contracts::NotificationParser for CsvParser {
    fn parse(&self, raw: &str) -> Result<Notification, ContractError> {
        match raw.splitn(4, ',').collect::<Vec<_>>().as_slice() {
            [name, kind, target, content] => Ok(Notification::new(*name, *kind, *target, *content)),
            fields => Err(ContractError::parse(
                "csv",
                format!("expected 4 fields, got {}", fields.len()),
            )),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_with_config(ObservabilityConfig::logging_only(
        LogFormat::Compact,
        "info",
    ))?;

    tracing::info!("Starting notification fan-in demo");

    let log: Arc<dyn EventLog> = Arc::new(TracingLog::new("notify"));

    // ==== Stage 1: Register routes ====
    let dispatcher = Dispatcher::builder()
        .route("email", EventLogSender::new("email", log.clone()))
        .route(
            "telegram",
            SlowGateway {
                name: "telegram".into(),
                log: log.clone(),
            },
        )
        .build();
    tracing::info!(kinds = ?dispatcher.kinds(), "Dispatcher ready");

    let parsers = Arc::new(ParserRegistry::new().with(FormatTag::Tabular, CsvParser));

    // ==== Stage 2: Concurrent producers ====
    let records = [
        "Ann,email,ann@example.com,Your invoice is ready",
        "Bo,telegram,@bo,Build passed",
        "Cy,sms,+15550100,Your code is 1234",
        "Dee,telegram,@dee,Deploy finished",
        "Eve,email,eve@example.com,Password changed",
        "malformed record",
    ];

    let mut tasks = JoinSet::new();
    for raw in records {
        let dispatcher = dispatcher.clone();
        let parsers = parsers.clone();
        let log = log.clone();
        tasks.spawn(async move {
            match dispatcher.dispatch_raw(&parsers, &FormatTag::Tabular, raw).await {
                Ok(n) => Ok(n.kind),
                Err(e) => {
                    let who = raw.split(',').next().unwrap_or(raw);
                    log.record(&format!("Failed to notify {who}: {e}"));
                    Err(e)
                }
            }
        });
    }

    let mut no_route = 0;
    let mut other_failures = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok(_) => {}
            Err(DispatchError::NoRoute { .. }) => no_route += 1,
            Err(_) => other_failures += 1,
        }
    }

    // ==== Stage 3: Summary ====
    let metrics = dispatcher.metrics();
    println!("\n=== Summary ===");
    println!("Dispatched: {}", metrics.dispatched);
    println!("Delivered:  {}", metrics.delivered);
    println!("No route:   {no_route}");
    println!("Other:      {other_failures}");

    Ok(())
}
