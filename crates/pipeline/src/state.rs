//! Pipeline lifecycle state

use std::fmt;

/// Lifecycle of a pipeline handle
///
/// `Created → Running → Closing → Drained → Stopped`. The derived ordering
/// follows the lifecycle, so `state >= Closing` means shutdown has begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineState {
    /// Constructed, units not yet spawned
    Created,
    /// Accepting submissions
    Running,
    /// Input closed (or cancelled); units are finishing
    Closing,
    /// Every result has been delivered to the sink
    Drained,
    /// All units have exited
    Stopped,
}

impl PipelineState {
    /// Whether `submit` is legal
    pub fn accepts_items(self) -> bool {
        self == Self::Running
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Closing => "closing",
            Self::Drained => "drained",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ordering_follows_lifecycle() {
        assert!(PipelineState::Created < PipelineState::Running);
        assert!(PipelineState::Running < PipelineState::Closing);
        assert!(PipelineState::Closing < PipelineState::Drained);
        assert!(PipelineState::Drained < PipelineState::Stopped);
    }

    #[test]
    fn test_only_running_accepts_items() {
        assert!(PipelineState::Running.accepts_items());
        assert!(!PipelineState::Created.accepts_items());
        assert!(!PipelineState::Closing.accepts_items());
        assert!(!PipelineState::Stopped.accepts_items());
    }
}
