//! EventLog - injected logging capability accepting formatted lines

use tracing::info;

/// Logging sink for formatted lines
pub trait EventLog: Send + Sync {
    /// Record one formatted line
    fn record(&self, line: &str);
}

/// `EventLog` that forwards every line to `tracing` at info level
#[derive(Debug, Clone, Default)]
pub struct TracingLog {
    target: String,
}

impl TracingLog {
    /// Create a log tagged with `target`
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl EventLog for TracingLog {
    fn record(&self, line: &str) {
        info!(log = %self.target, "{line}");
    }
}
