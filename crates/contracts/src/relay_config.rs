//! RelayConfig - Config Loader output
//!
//! Describes a complete relay: pipeline sizing, shutdown/ordering policy and
//! the dispatch route table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::FormatTag;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RelayConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Pipeline sizing and policies
    #[serde(default)]
    #[validate(nested)]
    pub pipeline: PipelineConfig,

    /// Input settings
    #[serde(default)]
    pub input: InputConfig,

    /// Dispatch routes (kind -> sender)
    #[serde(default)]
    #[validate(nested)]
    pub routes: Vec<RouteConfig>,
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    /// Number of worker units sharing the input queue
    #[serde(default = "default_worker_count")]
    #[validate(range(min = 1))]
    pub worker_count: usize,

    /// Capacity of the input and output queues
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Result ordering guarantee
    #[serde(default)]
    pub ordering: OrderingMode,

    /// What happens to queued items when the pipeline is cancelled
    #[serde(default)]
    pub shutdown: ShutdownPolicy,
}

fn default_worker_count() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            ordering: OrderingMode::default(),
            shutdown: ShutdownPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Configuration with `worker_count` workers and default everything else
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }
}

/// Result ordering guarantee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingMode {
    /// Results reach the sink in completion order (workers race)
    #[default]
    Unordered,
    /// Results are re-sequenced into submission order before the sink
    Submission,
}

/// Cancellation policy, chosen at start time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Finish every item already queued, then stop
    #[default]
    Drain,
    /// Stop at the next suspension point, discarding queued items
    Abandon,
}

/// Input settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Default format tag of raw records
    #[serde(default = "default_format")]
    pub format: FormatTag,
}

fn default_format() -> FormatTag {
    FormatTag::Structured
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

/// One dispatch route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RouteConfig {
    /// Notification kind handled by this route
    #[validate(length(min = 1))]
    pub kind: String,

    /// Sender implementation
    pub sender: SenderType,

    /// Sender specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Built-in sender implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    /// Deliver by logging through tracing
    Log,
    /// Accept and drop (dry runs)
    Discard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.ordering, OrderingMode::Unordered);
        assert_eq!(config.shutdown, ShutdownPolicy::Drain);
    }

    #[test]
    fn test_relay_config_from_json_defaults() {
        let config: RelayConfig = serde_json::from_str(
            r#"{ "routes": [{ "kind": "email", "sender": "log" }] }"#,
        )
        .unwrap();
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.input.format, FormatTag::Structured);
        assert_eq!(config.routes[0].sender, SenderType::Log);
        assert!(config.routes[0].params.is_empty());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = RelayConfig {
            pipeline: PipelineConfig::with_workers(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_kind() {
        let config = RelayConfig {
            routes: vec![RouteConfig {
                kind: String::new(),
                sender: SenderType::Log,
                params: HashMap::new(),
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
