//! Exit rules for open positions.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Why a position is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// P&L at or below the stop-loss amount (emergency)
    StopLoss,
    /// P&L at or above the profit target
    ProfitTarget,
    /// Market-close cutoff reached (forced)
    Cutoff,
    /// Contract expiry reached (forced)
    Expiry,
    /// Operator-requested close
    Manual,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::ProfitTarget => "profit_target",
            ExitReason::Cutoff => "cutoff",
            ExitReason::Expiry => "expiry",
            ExitReason::Manual => "manual",
        }
    }

    /// Forced exits are driven by the clock rather than by P&L.
    pub fn is_forced(&self) -> bool {
        matches!(self, ExitReason::Cutoff | ExitReason::Expiry | ExitReason::Manual)
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold checks applied on every monitoring tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitPolicy {
    /// Loss limit, expressed as a negative P&L amount
    pub stop_loss_amount: Decimal,
    /// Profit target, expressed as a positive P&L amount
    pub profit_target_amount: Decimal,
    /// Exchange-local time after which positions are closed
    pub cutoff: NaiveTime,
}

impl ExitPolicy {
    pub fn new(stop_loss_amount: Decimal, profit_target_amount: Decimal, cutoff: NaiveTime) -> Self {
        Self {
            stop_loss_amount,
            profit_target_amount,
            cutoff,
        }
    }

    /// Check if the stop-loss is triggered.
    ///
    /// Inclusive: a P&L exactly equal to the stop-loss amount triggers.
    pub fn stop_loss_triggered(&self, pnl: Decimal) -> bool {
        pnl <= self.stop_loss_amount
    }

    /// Check if the profit target is reached. Inclusive.
    pub fn target_reached(&self, pnl: Decimal) -> bool {
        pnl >= self.profit_target_amount
    }

    /// Check if the cutoff time has passed.
    pub fn past_cutoff(&self, now: DateTime<FixedOffset>) -> bool {
        now.time() >= self.cutoff
    }

    /// Decide whether to close.
    ///
    /// Priority: stop-loss, profit target, expiry, cutoff.
    /// `now` must be exchange-local time.
    pub fn evaluate(
        &self,
        pnl: Decimal,
        now: DateTime<FixedOffset>,
        expiry: Option<NaiveDate>,
    ) -> Option<ExitReason> {
        if self.stop_loss_triggered(pnl) {
            return Some(ExitReason::StopLoss);
        }
        if self.target_reached(pnl) {
            return Some(ExitReason::ProfitTarget);
        }
        if let Some(date) = expiry {
            let today = now.date_naive();
            // On expiry day the contract is held until the cutoff.
            if today > date || (today == date && self.past_cutoff(now)) {
                return Some(ExitReason::Expiry);
            }
        }
        if self.past_cutoff(now) {
            return Some(ExitReason::Cutoff);
        }
        None
    }
}
