//! DispatchSink - terminal pipeline stage that dispatches every result

use std::sync::Arc;
use std::time::Instant;

use contracts::{ContractError, EventLog, ItemResult, Notification, ResultSink};
use observability::{DispatchMetricsAggregator, DispatchStatus, MetricsSummary};
use tracing::{info, instrument};

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;

/// Pipeline sink that routes each successful result through a `Dispatcher`
///
/// Item failures and dispatch failures are written to the injected
/// `EventLog` and counted; they never abort the batch.
pub struct DispatchSink {
    name: String,
    dispatcher: Dispatcher,
    log: Arc<dyn EventLog>,
    aggregator: DispatchMetricsAggregator,
    item_failures: u64,
}

impl DispatchSink {
    pub fn new(name: impl Into<String>, dispatcher: Dispatcher, log: Arc<dyn EventLog>) -> Self {
        Self {
            name: name.into(),
            dispatcher,
            log,
            aggregator: DispatchMetricsAggregator::new(),
            item_failures: 0,
        }
    }

    /// Dispatch statistics gathered so far
    pub fn summary(&self) -> MetricsSummary {
        self.aggregator.summary()
    }

    /// Results that arrived as `ItemError`
    pub fn item_failures(&self) -> u64 {
        self.item_failures
    }

    async fn dispatch_one(&mut self, notification: &Notification) {
        let started = Instant::now();
        let result = self.dispatcher.dispatch(notification).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let status = match &result {
            Ok(()) => DispatchStatus::Delivered,
            Err(DispatchError::NoRoute { .. }) => DispatchStatus::NoRoute,
            Err(_) => DispatchStatus::Failed,
        };
        self.aggregator
            .update(&notification.kind, status, latency_ms);

        if let Err(e) = result {
            self.log
                .record(&format!("Failed to notify {}: {e}", notification.name));
        }
    }
}

impl ResultSink<Notification> for DispatchSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, result: ItemResult<Notification>) -> Result<(), ContractError> {
        match result {
            Ok(processed) => self.dispatch_one(&processed.payload).await,
            Err(item_error) => {
                self.item_failures += 1;
                self.log.record(&format!("Skipped: {item_error}"));
            }
        }
        Ok(())
    }

    #[instrument(name = "dispatch_sink_close", skip(self), fields(sink = %self.name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        let summary = self.aggregator.summary();
        info!(
            total = summary.total,
            delivered = summary.delivered,
            no_route = summary.no_route,
            failed = summary.failed,
            item_failures = self.item_failures,
            "DispatchSink closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::senders::{ChannelSender, EventLogSender};
    use contracts::{transform_fn, Item, ItemError, Processed};
    use pipeline::{Pipeline, PipelineConfig};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Lines(Mutex<Vec<String>>);

    impl EventLog for Lines {
        fn record(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    impl Lines {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_dispatch_sink_reports_and_continues() {
        let lines = Arc::new(Lines::default());
        let (email, mut inbox) = ChannelSender::new("email", 8);
        let dispatcher = Dispatcher::builder().route("email", email).build();
        let mut sink = DispatchSink::new("notify", dispatcher, lines.clone());

        let ok = Notification::new("Ann", "email", "ann@example.com", "hi");
        let sms = Notification::new("Dee", "sms", "+100", "code");

        sink.write(Ok(Processed::new(1, ok.clone()))).await.unwrap();
        sink.write(Ok(Processed::new(2, sms))).await.unwrap();
        sink.write(Err(ItemError::new(3, "bad record"))).await.unwrap();
        sink.write(Ok(Processed::new(4, ok.clone()))).await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(inbox.recv().await, Some(ok.clone()));
        assert_eq!(inbox.recv().await, Some(ok));

        let summary = sink.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.no_route, 1);
        assert_eq!(sink.item_failures(), 1);
        assert_eq!(
            lines.lines(),
            vec![
                "Failed to notify Dee: no route registered for kind 'sms'".to_string(),
                "Skipped: item 3 failed: bad record".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_sink_behind_pipeline() {
        let lines = Arc::new(Lines::default());
        let dispatcher = Dispatcher::builder()
            .route("email", EventLogSender::new("email", lines.clone()))
            .build();
        let sink = DispatchSink::new("notify", dispatcher, lines.clone());

        let transform = transform_fn(|item: Item<Notification>| {
            if item.payload.target_id.is_empty() {
                Err("missing target".to_string())
            } else {
                Ok(item.payload)
            }
        });
        let handle = Pipeline::start(PipelineConfig::default(), transform, sink).unwrap();

        let records = [
            Notification::new("Ann", "email", "ann@example.com", "a"),
            Notification::new("Bo", "email", "", "b"),
            Notification::new("Cy", "sms", "+1", "c"),
        ];
        for (id, n) in records.into_iter().enumerate() {
            handle.submit(Item::new(id as u64, n)).await.unwrap();
        }

        let completion = handle.close_and_wait().await.unwrap();
        assert_eq!(completion.report.succeeded, 2);
        assert_eq!(completion.report.failed, 1);
        assert_eq!(completion.sink.item_failures(), 1);
        assert_eq!(
            lines.lines(),
            vec![
                "Sending email to Ann (ann@example.com): a".to_string(),
                "Skipped: item 1 failed: missing target".to_string(),
                "Failed to notify Cy: no route registered for kind 'sms'".to_string(),
            ]
        );
    }
}
