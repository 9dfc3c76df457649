//! Position and margin types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Exchange, OptionRight, OrderRequest, ProductType, Side};

/// A position snapshot as reported by the broker.
///
/// The authoritative copy lives at the vendor; this is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Symbol
    pub symbol: String,
    /// Exchange segment
    pub exchange: Exchange,
    /// Product type
    pub product: ProductType,
    /// Net quantity (positive for long, negative for short)
    pub net_quantity: i64,
    /// Average entry price
    pub average_price: Decimal,
    /// Last traded price
    pub last_price: Decimal,
    /// Unrealized profit/loss
    pub unrealized_pnl: Decimal,
    /// Realized profit/loss from closed portions
    pub realized_pnl: Decimal,
    /// Contract expiry for derivatives
    #[serde(default)]
    pub expiry: Option<NaiveDate>,
    /// Strike price for options
    #[serde(default)]
    pub strike_price: Option<Decimal>,
    /// Call or put for options
    #[serde(default)]
    pub right: Option<OptionRight>,
}

impl Position {
    /// Create a new position marked at its entry price.
    pub fn new(symbol: impl Into<String>, net_quantity: i64, average_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: Exchange::default(),
            product: ProductType::default(),
            net_quantity,
            average_price,
            last_price: average_price,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            expiry: None,
            strike_price: None,
            right: None,
        }
    }

    /// Check if this is a long position.
    pub fn is_long(&self) -> bool {
        self.net_quantity > 0
    }

    /// Check if this is a short position.
    pub fn is_short(&self) -> bool {
        self.net_quantity < 0
    }

    /// Check if the position is flat.
    pub fn is_flat(&self) -> bool {
        self.net_quantity == 0
    }

    /// Get the absolute quantity.
    pub fn abs_quantity(&self) -> u32 {
        u32::try_from(self.net_quantity.unsigned_abs()).unwrap_or(u32::MAX)
    }

    /// Update the last price and recalculate unrealized P&L.
    pub fn update_price(&mut self, price: Decimal) {
        self.last_price = price;
        self.unrealized_pnl = Decimal::from(self.net_quantity) * (price - self.average_price);
    }

    /// Whether this position belongs to the given symbol (case-insensitive).
    pub fn matches(&self, symbol: &str) -> bool {
        self.symbol.eq_ignore_ascii_case(symbol)
    }

    /// Market order that flattens this position: opposite side, same quantity,
    /// same contract. `None` when the position is already flat.
    pub fn closing_order(&self) -> Option<OrderRequest> {
        if self.is_flat() {
            return None;
        }
        let mut order = OrderRequest::market(
            &self.symbol,
            self.exchange,
            Side::closing(self.net_quantity),
            self.abs_quantity(),
        )
        .with_product(self.product);
        order.expiry = self.expiry;
        order.strike_price = self.strike_price;
        order.right = self.right;
        Some(order)
    }
}

/// Funds snapshot fetched on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginSnapshot {
    /// Funds available for new positions
    pub available_margin: Decimal,
    /// Funds blocked by open positions and orders
    pub used_margin: Decimal,
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
}

impl MarginSnapshot {
    pub fn new(available_margin: Decimal, used_margin: Decimal) -> Self {
        Self {
            available_margin,
            used_margin,
            timestamp: Utc::now(),
        }
    }

    /// Total of available and used funds.
    pub fn total(&self) -> Decimal {
        self.available_margin + self.used_margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_position_long() {
        let mut position = Position::new("NIFTY", 50, dec!(24000));
        assert!(position.is_long());
        assert_eq!(position.abs_quantity(), 50);

        position.update_price(dec!(24100));
        assert_eq!(position.unrealized_pnl, dec!(5000));
    }

    #[test]
    fn test_position_short_pnl() {
        let mut position = Position::new("BANKNIFTY", -15, dec!(52000));
        assert!(position.is_short());

        position.update_price(dec!(52200));
        assert_eq!(position.unrealized_pnl, dec!(-3000));
    }

    #[test]
    fn test_position_matches_ignores_case() {
        let position = Position::new("Nifty", 50, dec!(1));
        assert!(position.matches("NIFTY"));
        assert!(!position.matches("BANKNIFTY"));
    }

    #[test]
    fn test_closing_order_flips_side() {
        let mut position = Position::new("NIFTY", -150, dec!(24000));
        position.expiry = NaiveDate::from_ymd_opt(2026, 1, 27);
        let order = position.closing_order().unwrap();
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.quantity, 150);
        assert_eq!(order.expiry, position.expiry);

        assert!(Position::new("NIFTY", 0, dec!(1)).closing_order().is_none());
    }

    #[test]
    fn test_margin_total() {
        let margin = MarginSnapshot::new(dec!(150000), dec!(50000));
        assert_eq!(margin.total(), dec!(200000));
    }
}
