//! Scheduled trading tasks.
//!
//! A [`TradingTask`] walks one position through
//! `Idle → Evaluating → OrderPending → Monitoring → Closing → Idle`.
//! The [`Scheduler`] drives it on a fixed interval, or the CLI runs single
//! steps with the state persisted in between.

mod closer;
mod scheduler;
mod signal;
mod state;
mod trader;

#[cfg(test)]
mod mock;

pub use closer::{close_positions, CloseReport};
pub use scheduler::Scheduler;
pub use signal::{JsonFileSignalSource, StaticSignalSource};
pub use state::{StateFile, TaskSnapshot, TaskState, TrackedPosition};
pub use trader::{MonitorOutcome, OpenOutcome, SkipReason, TradingTask};
