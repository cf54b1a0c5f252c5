//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus 指标导出 (可选)
//! - Pipeline / Dispatcher 指标收集与统计
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{LogFormat, ObservabilityConfig};
//!
//! // 仅日志
//! observability::init_with_config(ObservabilityConfig::logging_only(LogFormat::Compact, "info"))?;
//!
//! // 或从 RELAY_LOG_FORMAT / RELAY_LOG_LEVEL / RELAY_METRICS_PORT 读取
//! observability::init_with_config(ObservabilityConfig::from_env())?;
//! ```

pub mod metrics;

use std::str::FromStr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    describe_metrics, record_dispatch, record_dispatch_latency_ms, record_item_completed,
    record_item_submitted, record_items_abandoned, record_queue_depth,
    record_transform_latency_ms, DispatchMetricsAggregator, DispatchStatus, MetricsSummary,
    RunningStats, StatsSummary,
};

/// Default Prometheus port when enabled without an explicit port
pub const DEFAULT_METRICS_PORT: u16 = 9000;

/// Environment variable names read by [`ObservabilityConfig::from_env`]
pub const ENV_LOG_FORMAT: &str = "RELAY_LOG_FORMAT";
pub const ENV_LOG_LEVEL: &str = "RELAY_LOG_LEVEL";
pub const ENV_METRICS_PORT: &str = "RELAY_METRICS_PORT";

/// 初始化可观测性（JSON 日志 + Prometheus on 9000）
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 可观测性配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 默认日志级别, overridden by `RUST_LOG`
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(DEFAULT_METRICS_PORT),
            default_log_level: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// 仅日志、不启用 Prometheus 的配置
    pub fn logging_only(log_format: LogFormat, default_log_level: impl Into<String>) -> Self {
        Self {
            log_format,
            metrics_port: None,
            default_log_level: default_log_level.into(),
        }
    }

    /// Build from `RELAY_*` environment variables
    ///
    /// Unset or unparsable values fall back to logging only, compact output
    /// and `info`. A port of `0` disables the exporter.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_format = lookup(ENV_LOG_FORMAT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(LogFormat::Compact);
        let metrics_port = lookup(ENV_METRICS_PORT)
            .and_then(|v| v.trim().parse::<u16>().ok())
            .filter(|port| *port != 0);
        let default_log_level = lookup(ENV_LOG_LEVEL).unwrap_or_else(|| "info".to_string());

        Self {
            log_format,
            metrics_port,
            default_log_level,
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// 使用自定义配置初始化
///
/// Fails if a global subscriber or recorder is already installed.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    init_tracing(config.log_format, &config.default_log_level)?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
///
/// 用于 Tracing 已由其他模块初始化的场景。
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(port)
}

fn init_tracing(format: LogFormat, default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")
}

fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;

    describe_metrics();
    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
