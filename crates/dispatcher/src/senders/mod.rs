//! Built-in sender implementations
//!
//! Contains LogSender, ChannelSender, EventLogSender and DiscardSender.

mod channel;
mod discard;
mod event_log;
mod log;

pub use self::channel::ChannelSender;
pub use self::discard::DiscardSender;
pub use self::event_log::EventLogSender;
pub use self::log::LogSender;
