//! Pipeline main entry
//!
//! Producer → Worker(s) → Sink over two bounded queues.
//!
//! Shutdown runs in one direction only:
//! 1. the producer closes the input queue through the handle (once)
//! 2. workers drain it and exit; the coordinator joins them all and then
//!    closes the output queue (once)
//! 3. the sink drains the output queue and returns; `wait` joins it last

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_channel::Sender;
use contracts::{Item, ResultSink, Transform};
use observability::record_item_submitted;
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use crate::cancel::CancelToken;
use crate::config::{check_config, MetricsSnapshot, OrderingMode, PipelineConfig, PipelineMetrics};
use crate::error::{PipelineError, Result};
use crate::queue::{input_queue, output_queue, Envelope, InputQueue, WorkQueue};
use crate::reorder::reorder_window;
use crate::state::PipelineState;
use crate::worker::{
    drain_leftovers, run_coordinator, run_sink, run_worker, CoordinatorReport, InputEnvelope,
    SinkReport, WorkerContext,
};

/// Pipeline launcher
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline with its own cancellation token
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<I, O, T, S>(
        config: PipelineConfig,
        transform: T,
        sink: S,
    ) -> Result<PipelineHandle<I, S>>
    where
        I: Send + 'static,
        O: Send + 'static,
        T: Transform<I, O> + Sync + 'static,
        S: ResultSink<O> + 'static,
    {
        Self::start_with_cancel(config, transform, sink, CancelToken::new())
    }

    /// Start a pipeline observing an external cancellation token
    ///
    /// Spawns `worker_count` workers, the coordinator and the sink task.
    ///
    /// # Errors
    /// `InvalidConfig` if `worker_count` or `queue_capacity` is zero; nothing
    /// is spawned in that case.
    #[instrument(
        name = "pipeline_start",
        skip_all,
        fields(
            workers = config.worker_count,
            capacity = config.queue_capacity,
            ordering = ?config.ordering,
            shutdown = ?config.shutdown,
            sink = %sink.name()
        )
    )]
    pub fn start_with_cancel<I, O, T, S>(
        config: PipelineConfig,
        transform: T,
        sink: S,
        cancel: CancelToken,
    ) -> Result<PipelineHandle<I, S>>
    where
        I: Send + 'static,
        O: Send + 'static,
        T: Transform<I, O> + Sync + 'static,
        S: ResultSink<O> + 'static,
    {
        check_config(&config)?;

        let (state, _) = watch::channel(PipelineState::Created);
        let state = Arc::new(state);
        let metrics = Arc::new(PipelineMetrics::new());
        let transform = Arc::new(transform);

        let (input, work_queue) = input_queue(config.queue_capacity);
        let (closer, output_rx) = output_queue(config.queue_capacity);

        // Submission ordering bounds the reorderer to one queue's worth
        let (release, window) = match config.ordering {
            OrderingMode::Submission => {
                let (release, window) = reorder_window(config.queue_capacity);
                (Some(release), Some(window))
            }
            OrderingMode::Unordered => (None, None),
        };

        let sink_task = tokio::spawn(run_sink(sink, output_rx, release));

        let mut workers = JoinSet::new();
        for worker_id in 0..config.worker_count {
            workers.spawn(run_worker(WorkerContext {
                worker_id,
                transform: Arc::clone(&transform),
                input: work_queue.clone(),
                output: closer.emitter(),
                cancel: cancel.clone(),
                policy: config.shutdown,
                metrics: Arc::clone(&metrics),
                window: window.clone(),
            }));
        }

        let coordinator = tokio::spawn(run_coordinator(workers, closer, Arc::clone(&state)));

        state.send_replace(PipelineState::Running);
        info!("Pipeline started");

        Ok(PipelineHandle {
            input,
            leftovers: work_queue,
            next_seq: Mutex::new(0),
            state,
            cancel,
            config,
            metrics,
            coordinator,
            sink_task,
            started_at: Instant::now(),
        })
    }
}

/// Handle to a running pipeline
///
/// Owned by the single producer. Not `Clone`: `close` takes `&mut self`, so
/// it can neither race a `submit` nor be called from a second owner.
pub struct PipelineHandle<I, S> {
    input: InputQueue<InputEnvelope<I>>,
    leftovers: WorkQueue<InputEnvelope<I>>,
    /// Held across the enqueue so sequence order equals queue order
    next_seq: Mutex<u64>,
    state: Arc<watch::Sender<PipelineState>>,
    cancel: CancelToken,
    config: PipelineConfig,
    metrics: Arc<PipelineMetrics>,
    coordinator: JoinHandle<CoordinatorReport>,
    sink_task: JoinHandle<(S, SinkReport)>,
    started_at: Instant,
}

impl<I, S> PipelineHandle<I, S>
where
    I: Send + 'static,
    S: Send + 'static,
{
    /// Enqueue one item, suspending while the input queue is full
    ///
    /// # Errors
    /// - `Closed` if shutdown has begun (close, cancellation, or every worker
    ///   gone); never blocks in that case
    /// - `Cancelled` if cancellation fires while the call is suspended
    /// - `Closed` if every worker exits while the call is suspended
    pub async fn submit(&self, item: Item<I>) -> Result<()> {
        if self.cancel.is_cancelled() {
            // An external token does not go through `cancel()`
            self.enter_closing();
        }
        let state = self.state();
        let tx = match self.input.sender() {
            Some(tx) if state.accepts_items() => tx,
            _ => return Err(PipelineError::Closed { state }),
        };

        let item_id = item.id;
        let mut states = self.state.subscribe();

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(item_id, "Submit interrupted by cancellation");
                self.enter_closing();
                Err(PipelineError::Cancelled)
            }
            _ = states.wait_for(|state| !state.accepts_items()) => {
                warn!(item_id, "Submit interrupted, workers are gone");
                Err(PipelineError::Closed { state: self.state() })
            }
            sent = self.enqueue(tx, item) => {
                sent?;
                self.metrics.record_submitted();
                record_item_submitted();
                Ok(())
            }
        }
    }

    /// Assign the next sequence number and send. Cancel-safe: a dropped
    /// call consumes no sequence number.
    async fn enqueue(&self, tx: &Sender<InputEnvelope<I>>, item: Item<I>) -> Result<()> {
        let mut next_seq = self.next_seq.lock().await;
        let seq = *next_seq;
        // The handle keeps a receiver, so the channel only closes through `close`
        tx.send(Envelope { seq, body: item })
            .await
            .map_err(|_| PipelineError::Closed { state: self.state() })?;
        *next_seq += 1;
        Ok(())
    }

    /// Signal that no more items will be submitted
    ///
    /// # Errors
    /// `DoubleClose` if the input was already closed. This is a producer
    /// bug; it is logged at error level and reported, never ignored.
    #[instrument(name = "pipeline_close", skip(self))]
    pub fn close(&mut self) -> Result<()> {
        if !self.input.close() {
            error!("Pipeline input closed twice");
            return Err(PipelineError::DoubleClose);
        }
        self.enter_closing();
        info!(
            submitted = self.metrics.snapshot().items_submitted,
            "Pipeline input closed"
        );
        Ok(())
    }

    /// Request early shutdown, honouring the configured `ShutdownPolicy`
    pub fn cancel(&self) {
        info!(policy = ?self.config.shutdown, "Pipeline cancellation requested");
        self.cancel.cancel();
        self.enter_closing();
    }

    /// Wait for every in-flight item to reach the sink and every unit to exit
    ///
    /// Returns the sink together with the run report.
    ///
    /// # Errors
    /// - `NotClosed` if called while the producer may still submit (neither
    ///   `close` nor cancellation happened). The handle is consumed; dropping
    ///   it closes the input, so the units still wind down on their own.
    /// - `Join` if the coordinator or sink task panicked
    #[instrument(name = "pipeline_wait", skip(self))]
    pub async fn wait(self) -> Result<Completion<S>> {
        let state = self.state();
        if state == PipelineState::Running && !self.cancel.is_cancelled() {
            error!("wait called before close");
            return Err(PipelineError::NotClosed { state });
        }
        self.enter_closing();

        let Self {
            input,
            leftovers,
            state,
            cancel,
            metrics,
            coordinator,
            sink_task,
            started_at,
            ..
        } = self;

        let coordinator = coordinator.await.map_err(|e| PipelineError::Join {
            unit: "coordinator",
            message: e.to_string(),
        })?;
        // Workers are gone and `self` is consumed, so nothing can enqueue now
        drop(input);
        drain_leftovers(&leftovers, &metrics);

        let (sink, sink_report) = sink_task.await.map_err(|e| PipelineError::Join {
            unit: "sink",
            message: e.to_string(),
        })?;
        state.send_replace(PipelineState::Drained);

        let snapshot = metrics.snapshot();
        let report = PipelineReport {
            submitted: snapshot.items_submitted,
            succeeded: sink_report.succeeded,
            failed: sink_report.failed,
            abandoned: snapshot.items_abandoned,
            worker_panics: coordinator.worker_panics,
            sink_write_failures: sink_report.write_failures,
            cancelled: cancel.is_cancelled(),
            duration: started_at.elapsed(),
        };
        state.send_replace(PipelineState::Stopped);

        info!(
            submitted = report.submitted,
            succeeded = report.succeeded,
            failed = report.failed,
            abandoned = report.abandoned,
            cancelled = report.cancelled,
            duration_ms = report.duration.as_millis() as u64,
            "Pipeline stopped"
        );

        Ok(Completion { sink, report })
    }

    /// Close the input and wait, for producers that are done in one go
    pub async fn close_and_wait(mut self) -> Result<Completion<S>> {
        self.close()?;
        self.wait().await
    }

    /// Current lifecycle state
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions (observes `Drained` / `Stopped` too)
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Cancellation token observed by this pipeline
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Configuration the pipeline was started with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        let mut snapshot = self.metrics.snapshot();
        snapshot.queue_len = self.input.len();
        snapshot
    }

    fn enter_closing(&self) {
        self.state.send_if_modified(|state| {
            if *state == PipelineState::Running {
                *state = PipelineState::Closing;
                true
            } else {
                false
            }
        });
    }
}

/// Outcome of a finished pipeline
#[derive(Debug)]
pub struct Completion<S> {
    /// The sink, returned by its task after the output queue closed
    pub sink: S,
    /// Run statistics
    pub report: PipelineReport,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Items accepted by `submit`
    pub submitted: u64,
    /// Successful results delivered to the sink
    pub succeeded: u64,
    /// `ItemError` results delivered to the sink
    pub failed: u64,
    /// Items discarded on cancellation
    pub abandoned: u64,
    /// Worker tasks that panicked
    pub worker_panics: u64,
    /// Sink writes that returned an error
    pub sink_write_failures: u64,
    /// Whether the run was cancelled
    pub cancelled: bool,
    /// Wall time from start to stop
    pub duration: Duration,
}

impl PipelineReport {
    /// Results delivered to the sink
    pub fn delivered(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Items per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.delivered() as f64 / secs
        } else {
            0.0
        }
    }
}
