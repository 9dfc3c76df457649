//! Logging setup and operator notifications.

mod logging;
mod notify;

pub use logging::setup_logging;
pub use notify::{LogNotifier, MemoryNotifier, TelegramConfig, TelegramNotifier};
