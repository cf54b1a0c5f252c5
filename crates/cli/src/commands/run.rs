//! `run` command implementation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{FormatTag, Item, RelayConfig, TracingLog};
use dispatcher::{DispatchSink, Dispatcher};
use pipeline::{CancelToken, Pipeline, PipelineError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::{ensure_config_exists, CliError};
use crate::formats::{parser_registry, ParseTransform};
use crate::stats::RunStats;

type InputLines = Lines<BufReader<Box<dyn AsyncRead + Unpin + Send>>>;

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");
    ensure_config_exists(&args.config)?;

    let mut config = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(workers) = args.workers {
        info!(workers, "Overriding worker count from CLI");
        config.pipeline.worker_count = workers;
        ConfigLoader::validate(&config).context("Invalid --workers override")?;
    }
    let format = match args.format.as_deref() {
        Some(tag) => tag.parse::<FormatTag>()?,
        None => config.input.format.clone(),
    };

    info!(
        workers = config.pipeline.worker_count,
        capacity = config.pipeline.queue_capacity,
        ordering = ?config.pipeline.ordering,
        shutdown = ?config.pipeline.shutdown,
        routes = config.routes.len(),
        format = %format,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config, &format);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let stats = execute(&config, format, args.input.as_deref(), timeout).await?;

    info!(
        submitted = stats.report.submitted,
        delivered = stats.dispatch.delivered,
        duration_secs = stats.report.duration.as_secs_f64(),
        "Relay finished"
    );
    stats.print_summary();
    Ok(())
}

/// Feed every input record through the pipeline and dispatch the results
async fn execute(
    config: &RelayConfig,
    format: FormatTag,
    input: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<RunStats> {
    let parsers = parser_registry();
    if !parsers.contains(&format) {
        anyhow::bail!("Unsupported input format '{format}'");
    }

    let source = input.map_or_else(|| "<stdin>".to_string(), |p| p.display().to_string());
    let mut lines = open_input(input).await?;

    let dispatcher = Dispatcher::from_config(&config.routes).map_err(CliError::from)?;
    let sink = DispatchSink::new("dispatch", dispatcher, Arc::new(TracingLog::new("relay")));
    let transform = ParseTransform::new(parsers, format);

    let cancel = CancelToken::new();
    let mut handle =
        Pipeline::start_with_cancel(config.pipeline.clone(), transform, sink, cancel.clone())
            .map_err(CliError::from)?;
    let watcher = tokio::spawn(cancel_on_shutdown(cancel.clone(), timeout));

    let mut next_id = 0u64;
    let mut skipped_lines = 0u64;

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line.map_err(|e| CliError::input(&source, e))?,
        };
        let Some(line) = line else { break };

        let record = line.trim();
        if record.is_empty() || record.starts_with('#') {
            skipped_lines += 1;
            continue;
        }

        match handle.submit(Item::new(next_id, record.to_string())).await {
            Ok(()) => next_id += 1,
            Err(PipelineError::Cancelled) => break,
            Err(PipelineError::Closed { .. }) if cancel.is_cancelled() => break,
            Err(e) => return Err(CliError::from(e).into()),
        }
    }

    handle.close().map_err(CliError::from)?;
    let completion = handle.wait().await.map_err(CliError::from)?;
    watcher.abort();

    if completion.report.cancelled {
        warn!(
            abandoned = completion.report.abandoned,
            "Run was cancelled before all input was read"
        );
    }

    Ok(RunStats {
        dispatch: completion.sink.summary(),
        parse_failures: completion.sink.item_failures(),
        report: completion.report,
        skipped_lines,
    })
}

async fn open_input(input: Option<&Path>) -> Result<InputLines, CliError> {
    let reader: Box<dyn AsyncRead + Unpin + Send> = match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| CliError::input(path.display().to_string(), e))?;
            Box::new(file)
        }
        None => Box::new(tokio::io::stdin()),
    };
    Ok(BufReader::new(reader).lines())
}

/// Cancel on Ctrl+C or when the optional timeout expires
async fn cancel_on_shutdown(cancel: CancelToken, timeout: Option<Duration>) {
    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => warn!("Received Ctrl+C, cancelling pipeline..."),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                (&mut deadline).await;
                warn!("Run timed out, cancelling pipeline...");
            }
        },
        _ = &mut deadline => warn!("Run timed out, cancelling pipeline..."),
    }

    cancel.cancel();
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &RelayConfig, format: &FormatTag) {
    println!("\n=== Configuration Summary ===\n");
    println!("Pipeline:");
    println!("  Workers: {}", config.pipeline.worker_count);
    println!("  Queue capacity: {}", config.pipeline.queue_capacity);
    println!("  Ordering: {:?}", config.pipeline.ordering);
    println!("  Shutdown: {:?}", config.pipeline.shutdown);
    println!("  Input format: {}", format);

    println!("\nRoutes ({}):", config.routes.len());
    for route in &config.routes {
        println!("  - {} ({:?})", route.kind, route.sender);
    }

    println!();
}
