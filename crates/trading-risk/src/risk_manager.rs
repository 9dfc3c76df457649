//! Risk configuration and signal evaluation.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trading_core::types::{MarginSnapshot, OrderRequest, Signal};

use crate::{ExitPolicy, PositionSizer, DEFAULT_MARGIN_RATE};

/// Risk flags read at the start of every task run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Units per lot of the traded contract
    pub lot_size: u32,
    /// Upper bound on lots per order
    pub max_lots: u32,
    /// Close everything when P&L falls to this (negative) amount
    pub stop_loss_amount: Decimal,
    /// Close everything when P&L rises to this amount
    pub profit_target_amount: Decimal,
    /// Master switch for opening new positions
    pub trading_enabled: bool,
    /// Exchange-local time after which positions are force-closed
    #[serde(with = "hhmm")]
    pub market_close_cutoff: NaiveTime,
    /// Share of available margin that one entry may commit
    pub risk_fraction: Decimal,
    /// Margin blocked per unit of contract value
    pub required_margin_rate: Decimal,
    /// Minimum signal confidence to open a position
    pub signal_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            lot_size: 75,
            max_lots: 1,
            stop_loss_amount: dec!(-15000),
            profit_target_amount: dec!(10000),
            trading_enabled: false,
            market_close_cutoff: NaiveTime::from_hms_opt(15, 15, 0).unwrap_or(NaiveTime::MIN),
            risk_fraction: dec!(0.5),
            required_margin_rate: DEFAULT_MARGIN_RATE,
            signal_threshold: 0.6,
        }
    }
}

impl RiskConfig {
    /// Exit rules derived from this snapshot.
    pub fn exit_policy(&self) -> ExitPolicy {
        ExitPolicy::new(
            self.stop_loss_amount,
            self.profit_target_amount,
            self.market_close_cutoff,
        )
    }

    pub fn sizer(&self) -> PositionSizer {
        PositionSizer::new(self.required_margin_rate)
    }

    /// Check internal consistency. Returns a list of problems.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();
        if self.lot_size == 0 {
            problems.push("lot_size must be positive".to_string());
        }
        if self.stop_loss_amount >= Decimal::ZERO {
            problems.push("stop_loss_amount must be negative".to_string());
        }
        if self.profit_target_amount <= Decimal::ZERO {
            problems.push("profit_target_amount must be positive".to_string());
        }
        if self.risk_fraction <= Decimal::ZERO || self.risk_fraction > Decimal::ONE {
            problems.push("risk_fraction must be in (0, 1]".to_string());
        }
        if self.required_margin_rate <= Decimal::ZERO {
            problems.push("required_margin_rate must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.signal_threshold) {
            problems.push("signal_threshold must be in [0, 1]".to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

/// Decision from the risk manager.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskDecision {
    /// Order approved with calculated parameters
    Approved { order: OrderRequest, lots: u32 },
    /// Order rejected with reason
    Rejected { reason: String },
}

impl RiskDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, RiskDecision::Approved { .. })
    }

    pub fn order(&self) -> Option<&OrderRequest> {
        match self {
            RiskDecision::Approved { order, .. } => Some(order),
            RiskDecision::Rejected { .. } => None,
        }
    }
}

/// Turns a signal into a sized order under one risk snapshot.
pub struct RiskManager<'a> {
    config: &'a RiskConfig,
}

impl<'a> RiskManager<'a> {
    pub fn new(config: &'a RiskConfig) -> Self {
        Self { config }
    }

    /// Evaluate a signal and produce a risk decision.
    pub fn evaluate_signal(
        &self,
        signal: &Signal,
        margin: &MarginSnapshot,
        price: Decimal,
    ) -> RiskDecision {
        if !self.config.trading_enabled {
            return RiskDecision::Rejected {
                reason: "Trading is disabled".to_string(),
            };
        }

        if !signal.is_actionable(self.config.signal_threshold) {
            return RiskDecision::Rejected {
                reason: format!(
                    "Signal confidence {:.2} below threshold {:.2}",
                    signal.confidence, self.config.signal_threshold
                ),
            };
        }

        let lots = self.config.sizer().lots(
            margin.available_margin,
            price,
            self.config.lot_size,
            self.config.max_lots,
            self.config.risk_fraction,
        );
        debug!(
            symbol = %signal.symbol,
            available = %margin.available_margin,
            %price,
            lots,
            "Sized order"
        );

        if lots == 0 {
            return RiskDecision::Rejected {
                reason: format!(
                    "Sized quantity is zero (available margin {}, price {}, lot size {})",
                    margin.available_margin, price, self.config.lot_size
                ),
            };
        }

        let quantity = PositionSizer::quantity(lots, self.config.lot_size);
        let mut order = OrderRequest::market(&signal.symbol, signal.exchange, signal.side, quantity)
            .with_product(signal.product);
        if let Some(expiry) = signal.expiry {
            order = order.with_expiry(expiry);
        }

        RiskDecision::Approved { order, lots }
    }
}

/// Serde support for `HH:MM` (seconds optional) times.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
