//! Risk management for trading.
//!
//! Provides margin-based position sizing, exit rules for open positions and
//! the per-run risk configuration snapshot.

mod position_sizer;
mod stop_loss;
mod risk_manager;

pub use position_sizer::{size_order, PositionSizer, DEFAULT_MARGIN_RATE};
pub use stop_loss::{ExitPolicy, ExitReason};
pub use risk_manager::{hhmm, RiskConfig, RiskDecision, RiskManager};
