//! Pipeline / Dispatcher 指标收集模块
//!
//! Prometheus counters for the relay plus an in-memory aggregator used for
//! end-of-run summaries.

use std::collections::HashMap;

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// Register descriptions for every relay metric with the installed recorder
pub fn describe_metrics() {
    describe_counter!(
        "relay_items_submitted_total",
        "Items accepted into the input queue"
    );
    describe_counter!(
        "relay_items_completed_total",
        "Items finished by a worker, by worker and status"
    );
    describe_counter!(
        "relay_items_abandoned_total",
        "Queued items dropped by an Abandon cancellation"
    );
    describe_histogram!(
        "relay_transform_latency_ms",
        Unit::Milliseconds,
        "Time spent in the item transform"
    );
    describe_gauge!("relay_queue_depth", "Items waiting in a pipeline queue");
    describe_counter!("relay_dispatch_total", "Dispatch calls by kind and outcome");
    describe_histogram!(
        "relay_dispatch_latency_ms",
        Unit::Milliseconds,
        "Time spent delivering one notification"
    );
}

/// 记录提交到输入队列的 item
pub fn record_item_submitted() {
    counter!("relay_items_submitted_total").increment(1);
}

/// 记录 worker 完成的 item
pub fn record_item_completed(worker_id: usize, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "relay_items_completed_total",
        "worker" => worker_id.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录取消时被丢弃的 item
pub fn record_items_abandoned(count: u64) {
    if count > 0 {
        counter!("relay_items_abandoned_total").increment(count);
    }
}

/// 记录 transform 耗时
pub fn record_transform_latency_ms(latency_ms: f64) {
    histogram!("relay_transform_latency_ms").record(latency_ms);
}

/// 记录队列深度
pub fn record_queue_depth(queue: &str, depth: usize) {
    gauge!(
        "relay_queue_depth",
        "queue" => queue.to_string()
    )
    .set(depth as f64);
}

/// Outcome of a single dispatch call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Sender accepted the notification
    Delivered,
    /// No sender registered for the kind
    NoRoute,
    /// Sender returned an error
    Failed,
}

impl DispatchStatus {
    /// Label value used in metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::NoRoute => "no_route",
            Self::Failed => "failed",
        }
    }
}

/// 记录一次分发
pub fn record_dispatch(kind: &str, status: DispatchStatus) {
    counter!(
        "relay_dispatch_total",
        "kind" => kind.to_string(),
        "status" => status.as_str()
    )
    .increment(1);
}

/// 记录分发耗时
pub fn record_dispatch_latency_ms(kind: &str, latency_ms: f64) {
    histogram!(
        "relay_dispatch_latency_ms",
        "kind" => kind.to_string()
    )
    .record(latency_ms);
}

/// 分发指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
/// Owned by a single unit (the sink task); no locking.
#[derive(Debug, Clone, Default)]
pub struct DispatchMetricsAggregator {
    /// 分发总数
    pub total: u64,

    /// 成功投递数
    pub delivered: u64,

    /// 无路由数
    pub no_route: u64,

    /// 投递失败数
    pub failed: u64,

    /// 各 kind 计数
    pub per_kind: HashMap<String, u64>,

    /// 分发耗时统计 (ms)
    pub latency_stats: RunningStats,
}

impl DispatchMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, kind: &str, status: DispatchStatus, latency_ms: f64) {
        self.total += 1;
        match status {
            DispatchStatus::Delivered => self.delivered += 1,
            DispatchStatus::NoRoute => self.no_route += 1,
            DispatchStatus::Failed => self.failed += 1,
        }
        *self.per_kind.entry(kind.to_string()).or_insert(0) += 1;
        self.latency_stats.push(latency_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total: self.total,
            delivered: self.delivered,
            no_route: self.no_route,
            failed: self.failed,
            delivery_rate: if self.total > 0 {
                self.delivered as f64 / self.total as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            per_kind: self.per_kind.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total: u64,
    pub delivered: u64,
    pub no_route: u64,
    pub failed: u64,
    pub delivery_rate: f64,
    pub latency_ms: StatsSummary,
    pub per_kind: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Metrics Summary ===")?;
        writeln!(f, "Total dispatched: {}", self.total)?;
        writeln!(
            f,
            "Delivered: {} ({:.2}%)",
            self.delivered, self.delivery_rate
        )?;
        writeln!(f, "No route: {}", self.no_route)?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.per_kind.is_empty() {
            let mut kinds: Vec<_> = self.per_kind.iter().collect();
            kinds.sort();
            writeln!(f, "Per kind:")?;
            for (kind, count) in kinds {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
