//! Margin-based position sizing.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Fraction of contract value blocked as margin when a vendor does not say otherwise.
pub const DEFAULT_MARGIN_RATE: Decimal = dec!(0.10);

/// Number of lots to trade at the default 10% margin rate.
///
/// See [`PositionSizer::lots`].
pub fn size_order(
    available_margin: Decimal,
    instrument_price: Decimal,
    lot_size: u32,
    max_lots: u32,
    risk_fraction: Decimal,
) -> u32 {
    PositionSizer::default().lots(available_margin, instrument_price, lot_size, max_lots, risk_fraction)
}

/// Position sizer for a vendor-specific margin rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSizer {
    margin_rate: Decimal,
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self::new(DEFAULT_MARGIN_RATE)
    }
}

impl PositionSizer {
    /// Create a sizer with the given required margin rate (0.10 = 10%).
    pub fn new(margin_rate: Decimal) -> Self {
        Self { margin_rate }
    }

    pub fn margin_rate(&self) -> Decimal {
        self.margin_rate
    }

    /// Margin blocked by one lot at the given price, `None` on overflow.
    pub fn margin_per_lot(&self, instrument_price: Decimal, lot_size: u32) -> Option<Decimal> {
        instrument_price
            .checked_mul(Decimal::from(lot_size))?
            .checked_mul(self.margin_rate)
    }

    /// Calculate the number of lots.
    ///
    /// The result is the smallest of the lots the margin can pay for, the
    /// lots allowed by the risk fraction of that margin, and `max_lots`.
    /// Lots are rounded down. Any non-positive input yields 0.
    pub fn lots(
        &self,
        available_margin: Decimal,
        instrument_price: Decimal,
        lot_size: u32,
        max_lots: u32,
        risk_fraction: Decimal,
    ) -> u32 {
        if available_margin <= Decimal::ZERO
            || instrument_price <= Decimal::ZERO
            || lot_size == 0
            || max_lots == 0
            || risk_fraction <= Decimal::ZERO
        {
            return 0;
        }

        let margin_per_lot = match self.margin_per_lot(instrument_price, lot_size) {
            Some(m) if m > Decimal::ZERO => m,
            _ => return 0,
        };

        let affordable = whole_lots(available_margin, margin_per_lot);
        let risk_based = available_margin
            .checked_mul(risk_fraction)
            .map_or(u32::MAX, |budget| whole_lots(budget, margin_per_lot));

        affordable.min(risk_based).min(max_lots)
    }

    /// Order quantity in units for the given lots.
    pub fn quantity(lots: u32, lot_size: u32) -> u32 {
        lots.saturating_mul(lot_size)
    }
}

fn whole_lots(budget: Decimal, margin_per_lot: Decimal) -> u32 {
    match budget.checked_div(margin_per_lot) {
        Some(lots) => lots.floor().to_u32().unwrap_or(u32::MAX),
        None => u32::MAX,
    }
}
