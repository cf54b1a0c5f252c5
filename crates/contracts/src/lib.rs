//! # Contracts
//!
//! Frozen interface contracts shared by every relay crate: the records that
//! travel through a pipeline, the notification record routed by the
//! dispatcher, the injected capabilities (transform, sink, sender, parser,
//! log) and the unified error type.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Ownership model
//! - `Item` / `Processed` are transient and never mutated after enqueue
//! - `Notification` is produced once by a parser and never mutated
//! - Capabilities are owned by callers and injected into the core

mod error;
mod item;
mod log;
mod notification;
mod relay_config;
mod sender;
mod sink;
mod transform;

pub use error::*;
pub use item::*;
pub use log::{EventLog, TracingLog};
pub use notification::*;
pub use relay_config::*;
pub use sender::{NotificationParser, NotificationSender};
pub use sink::*;
pub use transform::*;
