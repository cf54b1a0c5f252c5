//! Dispatcher - type-keyed route table from notification kind to sender

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use contracts::{FormatTag, Notification, NotificationSender, RouteConfig, SenderType};
use observability::{record_dispatch, record_dispatch_latency_ms, DispatchStatus};
use tracing::{debug, info, instrument, warn};

use crate::error::DispatchError;
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::parser::ParserRegistry;
use crate::senders::{DiscardSender, LogSender};

type Route = Arc<dyn NotificationSender>;

struct Shared {
    routes: RwLock<HashMap<String, Route>>,
    metrics: DispatcherMetrics,
}

/// Routes each notification to the sender registered for its kind
///
/// Cheap to clone; clones share the route table and metrics. Adding a new
/// kind is a `register` call, not an edit to dispatch logic.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a dispatcher with an empty route table
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                routes: RwLock::new(HashMap::new()),
                metrics: DispatcherMetrics::new(),
            }),
        }
    }

    /// Start building a dispatcher
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Build a dispatcher from configured routes
    ///
    /// # Errors
    /// Returns `SenderCreation` if a route cannot be turned into a sender
    #[instrument(name = "dispatcher_from_config", skip(routes), fields(routes = routes.len()))]
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, DispatchError> {
        let mut builder = Self::builder();
        for route in routes {
            builder = builder.route_arc(route.kind.clone(), create_sender(route)?);
        }
        Ok(builder.build())
    }

    /// Insert or replace the sender for `kind`
    ///
    /// Returns the sender it replaced. Safe to call while other tasks are
    /// dispatching; they see either the old or the new sender.
    pub fn register(
        &self,
        kind: impl Into<String>,
        sender: impl NotificationSender + 'static,
    ) -> Option<Arc<dyn NotificationSender>> {
        self.register_arc(kind, Arc::new(sender))
    }

    /// `register` for an already shared sender
    pub fn register_arc(
        &self,
        kind: impl Into<String>,
        sender: Arc<dyn NotificationSender>,
    ) -> Option<Arc<dyn NotificationSender>> {
        let kind = kind.into();
        debug!(kind = %kind, sender = %sender.name(), "Route registered");
        self.shared
            .routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, sender)
    }

    /// Remove the route for `kind`
    pub fn unregister(&self, kind: &str) -> Option<Arc<dyn NotificationSender>> {
        self.shared
            .routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(kind)
    }

    // The read guard is dropped before any send is awaited.
    fn route(&self, kind: &str) -> Option<Route> {
        self.shared
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .cloned()
    }

    /// Deliver one notification through the sender registered for its kind
    ///
    /// The sender is invoked exactly once on success of the lookup.
    ///
    /// # Errors
    /// - `NoRoute` if no sender is registered for `notification.kind`; no
    ///   sender is invoked
    /// - `Send` if the sender fails
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, notification),
        fields(kind = %notification.kind)
    )]
    pub async fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        let metrics = &self.shared.metrics;
        metrics.inc_dispatched();

        let Some(sender) = self.route(&notification.kind) else {
            metrics.inc_no_route();
            record_dispatch(&notification.kind, DispatchStatus::NoRoute);
            warn!(recipient = %notification.name, "No route for notification kind");
            return Err(DispatchError::no_route(&notification.kind));
        };

        let started = Instant::now();
        let result = sender.send(notification).await;
        record_dispatch_latency_ms(
            &notification.kind,
            started.elapsed().as_secs_f64() * 1000.0,
        );

        match result {
            Ok(()) => {
                metrics.inc_delivered();
                record_dispatch(&notification.kind, DispatchStatus::Delivered);
                debug!(sender = %sender.name(), "Notification dispatched");
                Ok(())
            }
            Err(source) => {
                metrics.inc_failed();
                record_dispatch(&notification.kind, DispatchStatus::Failed);
                warn!(sender = %sender.name(), error = %source, "Sender failed");
                Err(DispatchError::Send {
                    kind: notification.kind.clone(),
                    sender: sender.name().to_string(),
                    source,
                })
            }
        }
    }

    /// Parse `raw` with the parser selected by `format`, then dispatch it
    ///
    /// Returns the parsed notification on success.
    ///
    /// # Errors
    /// `UnknownFormat` / `Parse` from the registry, otherwise as `dispatch`
    pub async fn dispatch_raw(
        &self,
        parsers: &ParserRegistry,
        format: &FormatTag,
        raw: &str,
    ) -> Result<Notification, DispatchError> {
        let notification = parsers.parse(format, raw)?;
        self.dispatch(&notification).await?;
        Ok(notification)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self
            .shared
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        kinds.sort();
        kinds
    }

    /// Whether a sender is registered for `kind`
    pub fn contains(&self, kind: &str) -> bool {
        self.shared
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(kind)
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.shared
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the route table is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Builder for creating a Dispatcher
#[derive(Default)]
pub struct DispatcherBuilder {
    routes: Vec<(String, Route)>,
}

impl DispatcherBuilder {
    /// Add a route
    pub fn route(self, kind: impl Into<String>, sender: impl NotificationSender + 'static) -> Self {
        self.route_arc(kind, Arc::new(sender))
    }

    /// Add a route with an already shared sender
    pub fn route_arc(mut self, kind: impl Into<String>, sender: Arc<dyn NotificationSender>) -> Self {
        self.routes.push((kind.into(), sender));
        self
    }

    /// Build the dispatcher. A later route for the same kind replaces an
    /// earlier one.
    #[instrument(name = "dispatcher_builder_build", skip(self), fields(routes = self.routes.len()))]
    pub fn build(self) -> Dispatcher {
        let dispatcher = Dispatcher::new();
        for (kind, sender) in self.routes {
            if dispatcher.register_arc(kind.clone(), sender).is_some() {
                warn!(kind = %kind, "Duplicate route, earlier sender replaced");
            }
        }
        info!(kinds = ?dispatcher.kinds(), "Dispatcher ready");
        dispatcher
    }
}

/// Create a sender from route configuration
#[instrument(
    name = "dispatcher_create_sender",
    skip(config),
    fields(kind = %config.kind, sender_type = ?config.sender)
)]
fn create_sender(config: &RouteConfig) -> Result<Route, DispatchError> {
    if config.kind.trim().is_empty() {
        return Err(DispatchError::sender_creation(&config.kind, "empty kind"));
    }
    let sender: Route = match config.sender {
        SenderType::Log => Arc::new(LogSender::from_params(&config.kind, &config.params)),
        SenderType::Discard => Arc::new(DiscardSender::new(&config.kind)),
    };
    Ok(sender)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::senders::ChannelSender;
    use async_trait::async_trait;
    use contracts::ContractError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts invocations
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NotificationSender for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn send(&self, _notification: &Notification) -> Result<(), ContractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl NotificationSender for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn send(&self, _notification: &Notification) -> Result<(), ContractError> {
            Err(ContractError::send("failing", "gateway down"))
        }
    }

    /// Slow sender used to overlap concurrent dispatches
    struct Slow;

    #[async_trait]
    impl NotificationSender for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn send(&self, _notification: &Notification) -> Result<(), ContractError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        }
    }

    fn email(name: &str) -> Notification {
        Notification::new(name, "email", format!("{name}@example.com"), "hello")
    }

    #[tokio::test]
    async fn test_dispatch_invokes_registered_sender_once() {
        let counting = Arc::new(Counting::default());
        let dispatcher = Dispatcher::builder()
            .route_arc("email", counting.clone())
            .build();

        dispatcher.dispatch(&email("ann")).await.unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.metrics().delivered, 1);
    }

    #[tokio::test]
    async fn test_dispatch_without_route() {
        let counting = Arc::new(Counting::default());
        let dispatcher = Dispatcher::builder()
            .route_arc("email", counting.clone())
            .route("telegram", LogSender::new("telegram"))
            .build();

        let sms = Notification::new("Dee", "sms", "+100", "code 1234");
        let err = dispatcher.dispatch(&sms).await.unwrap_err();

        assert!(matches!(err, DispatchError::NoRoute { ref kind } if kind == "sms"));
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            dispatcher.metrics(),
            MetricsSnapshot {
                dispatched: 1,
                delivered: 0,
                no_route: 1,
                failed: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_sender_failure_is_returned() {
        let dispatcher = Dispatcher::builder().route("email", Failing).build();
        let err = dispatcher.dispatch(&email("ann")).await.unwrap_err();
        match err {
            DispatchError::Send { kind, sender, .. } => {
                assert_eq!(kind, "email");
                assert_eq!(sender, "failing");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(dispatcher.metrics().failed, 1);
    }

    #[tokio::test]
    async fn test_register_new_kind_at_runtime() {
        let dispatcher = Dispatcher::new();
        assert!(dispatcher.is_empty());
        assert!(dispatcher.dispatch(&email("ann")).await.is_err());

        let (sender, mut rx) = ChannelSender::new("email", 4);
        assert!(dispatcher.register("email", sender).is_none());
        dispatcher.dispatch(&email("ann")).await.unwrap();

        assert_eq!(rx.recv().await.map(|n| n.name), Some("ann".to_string()));
        assert!(dispatcher.contains("email"));
        assert!(dispatcher.unregister("email").is_some());
        assert!(!dispatcher.contains("email"));
    }

    #[tokio::test]
    async fn test_builder_later_route_wins() {
        let first = Arc::new(Counting::default());
        let second = Arc::new(Counting::default());
        let dispatcher = Dispatcher::builder()
            .route_arc("email", first.clone())
            .route_arc("email", second.clone())
            .build();

        dispatcher.dispatch(&email("ann")).await.unwrap();
        assert_eq!(dispatcher.len(), 1);
        assert_eq!(first.calls.load(Ordering::SeqCst), 0);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dispatch_failures_are_isolated() {
        let dispatcher = Dispatcher::builder()
            .route("email", Slow)
            .route("telegram", Slow)
            .build();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..30 {
            let dispatcher = dispatcher.clone();
            let kind = ["email", "telegram", "sms"][i % 3];
            tasks.spawn(async move {
                let n = Notification::new(format!("user{i}"), kind, "t", "c");
                (kind, dispatcher.dispatch(&n).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (kind, result) = joined.unwrap();
            match kind {
                "sms" => assert!(result.unwrap_err().is_no_route()),
                _ => assert!(result.is_ok()),
            }
        }

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.dispatched, 30);
        assert_eq!(metrics.delivered, 20);
        assert_eq!(metrics.no_route, 10);
    }

    #[tokio::test]
    async fn test_dispatch_raw_with_parser() {
        struct KindOnly;
        impl contracts::NotificationParser for KindOnly {
            fn parse(&self, raw: &str) -> Result<Notification, ContractError> {
                if raw.is_empty() {
                    return Err(ContractError::parse("kind-only", "empty record"));
                }
                Ok(Notification::new("n", raw, "t", "c"))
            }
        }

        let tag = FormatTag::Other("kind-only".into());
        let parsers = ParserRegistry::new().with(tag.clone(), KindOnly);
        let dispatcher = Dispatcher::builder().route("email", DiscardSender::new("email")).build();

        let n = dispatcher.dispatch_raw(&parsers, &tag, "email").await.unwrap();
        assert_eq!(n.kind, "email");

        let err = dispatcher.dispatch_raw(&parsers, &tag, "").await.unwrap_err();
        assert!(matches!(err, DispatchError::Parse(_)));
        // Parse failures never reach the route table
        assert_eq!(dispatcher.metrics().dispatched, 1);
    }

    #[tokio::test]
    async fn test_from_config() {
        let routes = vec![
            RouteConfig {
                kind: "email".into(),
                sender: SenderType::Log,
                params: HashMap::new(),
            },
            RouteConfig {
                kind: "audit".into(),
                sender: SenderType::Discard,
                params: HashMap::new(),
            },
        ];
        let dispatcher = Dispatcher::from_config(&routes).unwrap();
        assert_eq!(dispatcher.kinds(), vec!["audit", "email"]);

        let audit = Notification::new("sys", "audit", "-", "rotated keys");
        dispatcher.dispatch(&audit).await.unwrap();
    }
}
