//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 → pipeline → dispatcher 端到端测试
//! - 并发竞态回归 (重复运行)

#[cfg(test)]
mod contract_tests {
    use contracts::{FormatTag, ItemError, Notification, PipelineConfig};

    #[test]
    fn test_contract_defaults() {
        let _ = contracts::ConfigVersion::V1;
        let config = PipelineConfig::default();
        assert_eq!((config.worker_count, config.queue_capacity), (1, 64));
    }

    #[test]
    fn test_contract_shapes() {
        let n = Notification::new("Ann", "email", "ann@example.com", "hi");
        assert_eq!(n.clone(), n);
        assert_eq!(n.kind, "email");
        assert_eq!("csv".parse::<FormatTag>(), Ok(FormatTag::Tabular));
        assert_eq!(ItemError::new(7, "boom").to_string(), "item 7 failed: boom");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ContractError, Item, Notification, NotificationSender, OrderingMode, PipelineConfig,
        ShutdownPolicy, Transform, TracingLog,
    };
    use dispatcher::{ChannelSender, DispatchError, DispatchSink, Dispatcher};
    use pipeline::{CancelToken, CollectingSink, Pipeline, SharedAccumulator};
    use rand::Rng;
    use tokio::time::{sleep, timeout};

    const BOUND: Duration = Duration::from_secs(10);

    /// Order processing transform that also records into shared state
    struct ProcessOrder {
        results: SharedAccumulator<u64, String>,
    }

    impl Transform<String, String> for ProcessOrder {
        async fn apply(&self, item: Item) -> Result<String, String> {
            let line = format!("Order {} processed", item.id);
            self.results.insert(item.id, line.clone());
            tokio::task::yield_now().await;
            Ok(line)
        }
    }

    struct Identity;

    impl Transform<Notification, Notification> for Identity {
        async fn apply(&self, item: Item<Notification>) -> Result<Notification, String> {
            Ok(item.payload)
        }
    }

    /// Sender with a random delay, so concurrent dispatches overlap
    struct Jittery;

    #[async_trait]
    impl NotificationSender for Jittery {
        fn name(&self) -> &str {
            "jittery"
        }

        async fn send(&self, _notification: &Notification) -> Result<(), ContractError> {
            let delay = rand::rng().random_range(0..3);
            sleep(Duration::from_millis(delay)).await;
            Ok(())
        }
    }

    /// Repeated runs: every order recorded exactly once, nothing lost
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_accumulator_race_property() {
        const ORDERS: u64 = 50;

        for round in 0..100 {
            let results = SharedAccumulator::new();
            let transform = ProcessOrder {
                results: results.clone(),
            };
            let config = PipelineConfig {
                worker_count: 4,
                queue_capacity: 8,
                ..Default::default()
            };
            let handle = Pipeline::start(config, transform, CollectingSink::new("orders")).unwrap();

            // Producer runs as its own task and owns the handle
            let producer = tokio::spawn(async move {
                for id in 1..=ORDERS {
                    handle.submit(Item::new(id, format!("order-{id}"))).await?;
                }
                handle.close_and_wait().await
            });

            let completion = timeout(BOUND, producer)
                .await
                .unwrap_or_else(|_| panic!("round {round} timed out"))
                .unwrap()
                .unwrap();

            assert_eq!(results.len() as u64, ORDERS, "round {round}");
            assert_eq!(completion.sink.successes().count() as u64, ORDERS);
            let snapshot = results.snapshot();
            assert_eq!(snapshot.get(&7).map(String::as_str), Some("Order 7 processed"));
        }
    }

    #[tokio::test]
    async fn test_e2e_config_pipeline_dispatch() {
        let config = ConfigLoader::load_from_str(
            r#"
[pipeline]
worker_count = 3
queue_capacity = 4
ordering = "submission"

[[routes]]
kind = "email"
sender = "log"

[[routes]]
kind = "audit"
sender = "discard"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let dispatcher = Dispatcher::from_config(&config.routes).unwrap();
        let (telegram, mut inbox) = ChannelSender::new("telegram", 64);
        dispatcher.register("telegram", telegram);

        let sink = DispatchSink::new("notify", dispatcher.clone(), Arc::new(TracingLog::new("e2e")));
        let handle = Pipeline::start(config.pipeline.clone(), Identity, sink).unwrap();

        let kinds = ["email", "telegram", "audit", "sms"];
        for id in 0..40u64 {
            let kind = kinds[(id % 4) as usize];
            let n = Notification::new(format!("user{id}"), kind, format!("t{id}"), "msg");
            handle.submit(Item::new(id, n)).await.unwrap();
        }
        let completion = timeout(BOUND, handle.close_and_wait())
            .await
            .unwrap()
            .unwrap();

        let summary = completion.sink.summary();
        assert_eq!(summary.total, 40);
        assert_eq!(summary.delivered, 30);
        assert_eq!(summary.no_route, 10);
        assert_eq!(dispatcher.metrics().no_route, 10);

        // Submission ordering holds across workers
        let mut received = Vec::new();
        while let Ok(n) = inbox.try_recv() {
            received.push(n.name);
        }
        let expected: Vec<String> = (0..40u64)
            .filter(|id| id % 4 == 1)
            .map(|id| format!("user{id}"))
            .collect();
        assert_eq!(received, expected);
    }

    /// Several tasks dispatch through one dispatcher; one uses an unknown kind
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_notify_fan_in_isolated_failures() {
        let dispatcher = Dispatcher::builder()
            .route("email", Jittery)
            .route("telegram", Jittery)
            .build();

        let mut tasks = tokio::task::JoinSet::new();
        for task in 0..8 {
            let dispatcher = dispatcher.clone();
            tasks.spawn(async move {
                let kind = if task == 3 { "sms" } else { ["email", "telegram"][task % 2] };
                let mut outcomes = Vec::new();
                for i in 0..10 {
                    let n = Notification::new(format!("t{task}-{i}"), kind, "x", "y");
                    outcomes.push(dispatcher.dispatch(&n).await);
                }
                (task, outcomes)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (task, outcomes) = joined.unwrap();
            for outcome in outcomes {
                if task == 3 {
                    assert!(matches!(outcome, Err(DispatchError::NoRoute { .. })));
                } else {
                    assert!(outcome.is_ok());
                }
            }
        }
        assert_eq!(dispatcher.metrics().delivered, 70);
        assert_eq!(dispatcher.metrics().no_route, 10);
    }

    /// Cancellation from outside the producer terminates the run
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_external_cancel_terminates_producer() {
        struct Slow;
        impl Transform<String, String> for Slow {
            async fn apply(&self, item: Item) -> Result<String, String> {
                sleep(Duration::from_millis(5)).await;
                Ok(item.payload)
            }
        }

        for shutdown in [ShutdownPolicy::Drain, ShutdownPolicy::Abandon] {
            let cancel = CancelToken::new();
            let config = PipelineConfig {
                worker_count: 2,
                queue_capacity: 2,
                ordering: OrderingMode::Submission,
                shutdown,
            };
            let handle = Pipeline::start_with_cancel(
                config,
                Slow,
                CollectingSink::new("slow"),
                cancel.clone(),
            )
            .unwrap();

            let producer = tokio::spawn(async move {
                let mut submitted = 0u64;
                for id in 0..10_000u64 {
                    if handle.submit(Item::new(id, id.to_string())).await.is_err() {
                        break;
                    }
                    submitted += 1;
                }
                (submitted, handle.wait().await)
            });

            sleep(Duration::from_millis(30)).await;
            cancel.cancel();

            let (submitted, completion) = timeout(BOUND, producer).await.unwrap().unwrap();
            let completion = completion.unwrap();
            let report = completion.report;

            assert!(report.cancelled);
            assert!(submitted < 10_000);
            assert_eq!(report.submitted, submitted);
            assert_eq!(report.delivered() + report.abandoned, report.submitted);

            // Whatever was delivered arrives in submission order
            let ids: Vec<u64> = completion.sink.successes().map(|p| p.id).collect();
            let unique: HashSet<u64> = ids.iter().copied().collect();
            assert_eq!(unique.len(), ids.len());
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
