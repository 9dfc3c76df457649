//! Signal source trait.

use crate::error::TradingError;
use crate::types::Signal;
use async_trait::async_trait;

/// Supplies the latest trading signal to the open task.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// The most recent signal, or `None` when there is nothing to act on.
    async fn latest(&self) -> Result<Option<Signal>, TradingError>;
}
