//! Core traits for the trading system.

mod broker;
mod notifier;
mod signal_source;

pub use broker::Broker;
pub use notifier::{Notification, NotificationSink};
pub use signal_source::SignalSource;
