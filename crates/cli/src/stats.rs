//! Run statistics.

use observability::MetricsSummary;
use pipeline::PipelineReport;

/// Statistics from a `run` invocation
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Pipeline report returned by `wait`
    pub report: PipelineReport,

    /// Dispatch outcome gathered by the sink
    pub dispatch: MetricsSummary,

    /// Records the sink skipped because parsing failed
    pub parse_failures: u64,

    /// Input lines ignored (blank or comment)
    pub skipped_lines: u64,
}

impl RunStats {
    /// Share of delivered notifications among dispatched ones, in percent
    pub fn delivery_rate(&self) -> f64 {
        self.dispatch.delivery_rate
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let report = &self.report;

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                       Relay Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Pipeline");
        println!("   ├─ Duration: {:.2}s", report.duration.as_secs_f64());
        println!("   ├─ Submitted: {}", report.submitted);
        println!("   ├─ Succeeded: {}", report.succeeded);
        println!("   ├─ Failed (parse): {}", self.parse_failures);
        println!("   ├─ Abandoned: {}", report.abandoned);
        println!("   ├─ Skipped lines: {}", self.skipped_lines);
        if report.cancelled {
            println!("   ├─ Cancelled: yes");
        }
        println!("   └─ Throughput: {:.2} items/s", report.throughput());

        let dispatch = &self.dispatch;
        println!("\n📤 Dispatch");
        println!("   ├─ Dispatched: {}", dispatch.total);
        println!(
            "   ├─ Delivered: {} ({:.2}%)",
            dispatch.delivered,
            self.delivery_rate()
        );
        println!("   ├─ No route: {}", dispatch.no_route);
        println!("   ├─ Failed: {}", dispatch.failed);
        println!("   └─ Latency (ms): {}", dispatch.latency_ms);

        if !dispatch.per_kind.is_empty() {
            let mut kinds: Vec<_> = dispatch.per_kind.iter().collect();
            kinds.sort();
            println!("\n🏷  Per kind");
            for (kind, count) in kinds {
                println!("   ├─ {}: {}", kind, count);
            }
        }

        println!();
    }
}
