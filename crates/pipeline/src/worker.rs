//! Worker, coordinator and sink units

use std::sync::Arc;
use std::time::Instant;

use async_channel::Receiver;
use contracts::{Item, ItemError, ItemResult, Processed, ResultSink, Transform};
use observability::{
    record_item_completed, record_items_abandoned, record_queue_depth, record_transform_latency_ms,
};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, warn};

use crate::cancel::CancelToken;
use crate::config::{PipelineMetrics, ShutdownPolicy};
use crate::queue::{Envelope, OutputCloser, ResultEmitter, WorkQueue};
use crate::reorder::{ReorderWindow, Reorderer};
use crate::state::PipelineState;

pub(crate) type InputEnvelope<I> = Envelope<Item<I>>;
pub(crate) type OutputEnvelope<O> = Envelope<ItemResult<O>>;

/// Everything one worker needs
pub(crate) struct WorkerContext<I, O, T> {
    pub worker_id: usize,
    pub transform: Arc<T>,
    pub input: WorkQueue<InputEnvelope<I>>,
    pub output: ResultEmitter<OutputEnvelope<O>>,
    pub cancel: CancelToken,
    pub policy: ShutdownPolicy,
    pub metrics: Arc<PipelineMetrics>,
    /// Set for submission ordering only
    pub window: Option<ReorderWindow>,
}

/// Worker loop: pull until the input queue is closed and drained, or until
/// cancellation. Returns the number of items handled.
#[instrument(name = "pipeline_worker", skip(ctx), fields(worker = ctx.worker_id))]
pub(crate) async fn run_worker<I, O, T>(ctx: WorkerContext<I, O, T>) -> u64
where
    I: Send + 'static,
    O: Send + 'static,
    T: Transform<I, O> + Sync + 'static,
{
    debug!("Worker started");
    let mut handled = 0u64;

    loop {
        let next = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => None,
            envelope = ctx.input.recv() => match envelope {
                Some(envelope) => Some(envelope),
                // Input closed and drained
                None => break,
            },
        };

        match next {
            Some(envelope) => {
                if !process(&ctx, envelope).await {
                    break;
                }
                handled += 1;
            }
            None => {
                if ctx.policy == ShutdownPolicy::Drain {
                    while let Some(envelope) = ctx.input.try_recv() {
                        if !process(&ctx, envelope).await {
                            break;
                        }
                        handled += 1;
                    }
                }
                debug!(policy = ?ctx.policy, "Worker observed cancellation");
                break;
            }
        }
    }

    debug!(handled, "Worker stopped");
    handled
}

/// Transform one item and emit its result. Returns `false` when the worker
/// should stop (output gone, or abandoned on cancellation).
async fn process<I, O, T>(ctx: &WorkerContext<I, O, T>, envelope: InputEnvelope<I>) -> bool
where
    I: Send + 'static,
    O: Send + 'static,
    T: Transform<I, O> + Sync + 'static,
{
    let Envelope { seq, body: item } = envelope;
    let id = item.id;
    let started = Instant::now();

    let depth = ctx.input.len();
    ctx.metrics.update_queue_len(depth);
    record_queue_depth("input", depth);

    // A panicking transform surfaces as a JoinError here
    let transform = Arc::clone(&ctx.transform);
    let outcome = tokio::spawn(async move { transform.apply(item).await }).await;

    let result = match outcome {
        Ok(Ok(payload)) => Ok(Processed::new(id, payload)),
        Ok(Err(cause)) => {
            warn!(item_id = id, cause = %cause, "Transform failed");
            Err(ItemError::new(id, cause))
        }
        Err(join_err) => {
            error!(item_id = id, error = %join_err, "Transform panicked");
            Err(ItemError::new(id, format!("transform panicked: {join_err}")))
        }
    };

    let success = result.is_ok();
    ctx.metrics.record_completed(success);
    record_item_completed(ctx.worker_id, success);
    record_transform_latency_ms(started.elapsed().as_secs_f64() * 1000.0);

    let abandon = ctx.policy == ShutdownPolicy::Abandon;

    // Hold the result until the reorderer can take it without growing past
    // its window. On cancellation Drain skips the wait, Abandon drops it.
    if let Some(window) = ctx.window.as_ref().filter(|w| !w.admits(seq)) {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                if abandon {
                    ctx.metrics.record_abandoned(1);
                    return false;
                }
            }
            _ = window.admit(seq) => {}
        }
    }

    let envelope = Envelope { seq, body: result };
    tokio::select! {
        biased;
        _ = ctx.cancel.cancelled(), if abandon => {
            ctx.metrics.record_abandoned(1);
            false
        }
        sent = ctx.output.emit(envelope) => {
            if !sent {
                error!(item_id = id, "Output queue closed unexpectedly, sink is gone");
                ctx.metrics.record_abandoned(1);
            }
            sent
        }
    }
}

/// Coordinator outcome
#[derive(Debug, Default)]
pub(crate) struct CoordinatorReport {
    pub worker_panics: u64,
    pub handled: u64,
}

/// Join every worker, then close the output queue.
///
/// The coordinator is the only owner of `OutputCloser`, so the output queue
/// is closed exactly once and only after no worker can emit. Once the last
/// worker is gone a still `Running` pipeline moves to `Closing`, which
/// releases a producer suspended on a full input queue.
#[instrument(name = "pipeline_coordinator", skip_all)]
pub(crate) async fn run_coordinator<O>(
    mut workers: JoinSet<u64>,
    closer: OutputCloser<OutputEnvelope<O>>,
    state: Arc<watch::Sender<PipelineState>>,
) -> CoordinatorReport {
    let mut report = CoordinatorReport::default();

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(count) => report.handled += count,
            Err(e) => {
                report.worker_panics += 1;
                error!(error = ?e, "Worker task panicked");
            }
        }
    }

    closer.close();
    let stopped_early = state.send_if_modified(|state| {
        if *state == PipelineState::Running {
            *state = PipelineState::Closing;
            true
        } else {
            false
        }
    });
    if stopped_early {
        error!("All workers exited while the pipeline was still accepting items");
    }
    debug!(handled = report.handled, "All workers joined, output queue closed");
    report
}

/// Count and discard items nobody picked up (cancelled with `Abandon`, or
/// accepted while the workers were already stopping).
///
/// Only called once the producer can no longer submit.
pub(crate) fn drain_leftovers<I>(
    leftovers: &WorkQueue<InputEnvelope<I>>,
    metrics: &PipelineMetrics,
) -> u64 {
    let mut abandoned = 0u64;
    while leftovers.try_recv().is_some() {
        abandoned += 1;
    }
    if abandoned > 0 {
        warn!(abandoned, "Queued items abandoned");
        metrics.record_abandoned(abandoned);
        record_items_abandoned(abandoned);
    }
    metrics.update_queue_len(0);
    abandoned
}

/// Sink outcome
#[derive(Debug, Default)]
pub(crate) struct SinkReport {
    pub delivered: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub write_failures: u64,
}

/// Consume the output queue until it is closed, then close the sink.
///
/// With `release` set, results are re-sequenced and the next expected
/// sequence is published to the workers' `ReorderWindow`.
#[instrument(name = "pipeline_sink", skip_all, fields(sink = %sink.name()))]
pub(crate) async fn run_sink<O, S>(
    mut sink: S,
    rx: Receiver<OutputEnvelope<O>>,
    release: Option<watch::Sender<u64>>,
) -> (S, SinkReport)
where
    O: Send + 'static,
    S: ResultSink<O> + 'static,
{
    debug!(ordered = release.is_some(), "Sink started");
    let mut report = SinkReport::default();
    let mut reorderer = release.as_ref().map(|_| Reorderer::new());

    while let Ok(Envelope { seq, body }) = rx.recv().await {
        match (reorderer.as_mut(), release.as_ref()) {
            (Some(reorderer), Some(release)) => {
                for result in reorderer.push(seq, body) {
                    deliver(&mut sink, result, &mut report).await;
                }
                release.send_replace(reorderer.next_seq());
            }
            _ => deliver(&mut sink, body, &mut report).await,
        }
    }

    if let Some(mut reorderer) = reorderer {
        for result in reorderer.drain() {
            deliver(&mut sink, result, &mut report).await;
        }
    }

    if let Err(e) = sink.close().await {
        error!(error = %e, "Sink close failed");
    }

    debug!(delivered = report.delivered, "Sink stopped");
    (sink, report)
}

async fn deliver<O, S>(sink: &mut S, result: ItemResult<O>, report: &mut SinkReport)
where
    S: ResultSink<O>,
{
    let id = contracts::result_id(&result);
    if result.is_ok() {
        report.succeeded += 1;
    } else {
        report.failed += 1;
    }
    report.delivered += 1;

    if let Err(e) = sink.write(result).await {
        report.write_failures += 1;
        error!(item_id = id, error = %e, "Sink write failed");
    }
}
