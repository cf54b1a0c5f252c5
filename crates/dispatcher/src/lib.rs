//! # Dispatcher
//!
//! 通知分发模块。
//!
//! 负责：
//! - 按 `kind` 查找已注册的 sender 并投递
//! - 未注册的 kind 返回 `NoRoute`，不产生副作用
//! - 按显式 format tag 选择 parser
//! - 作为 pipeline 的终端 sink (`DispatchSink`)

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod senders;
pub mod sink;

pub use contracts::{Notification, NotificationParser, NotificationSender};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::DispatchError;
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use parser::ParserRegistry;
pub use senders::{ChannelSender, DiscardSender, EventLogSender, LogSender};
pub use sink::DispatchSink;
