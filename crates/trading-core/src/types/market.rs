//! Market data types: quotes, instruments and streaming ticks.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Exchange;

/// Indian exchanges run on UTC+05:30.
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Current wall-clock time in exchange-local time.
pub fn exchange_now() -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    Utc::now().with_timezone(&offset)
}

/// A point-in-time quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Symbol
    pub symbol: String,
    /// Exchange segment
    pub exchange: Exchange,
    /// Last traded price
    pub last_price: Decimal,
    /// Best bid price
    pub bid: Option<Decimal>,
    /// Best ask price
    pub ask: Option<Decimal>,
    /// When the quote was observed
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Mid price when both sides are present, otherwise the last price.
    pub fn mid(&self) -> Decimal {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) if bid > Decimal::ZERO && ask > Decimal::ZERO => {
                (bid + ask) / Decimal::TWO
            }
            _ => self.last_price,
        }
    }
}

/// A tradable instrument found by `search_instrument`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Vendor symbol / stock code
    pub symbol: String,
    /// Exchange segment
    pub exchange: Exchange,
    /// Vendor instrument token used for feeds
    pub token: String,
    /// Human-readable name
    pub name: String,
    /// Lot size (1 for cash equities)
    pub lot_size: u32,
    /// Contract expiry for derivatives
    pub expiry: Option<NaiveDate>,
}

/// A streaming feed update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedTick {
    /// Vendor instrument token
    pub token: String,
    /// Last traded price
    pub last_price: Decimal,
    /// Cumulative traded volume, when the vendor sends it
    pub volume: Option<u64>,
    /// When the tick was received
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_mid() {
        let mut quote = Quote {
            symbol: "NIFTY".into(),
            exchange: Exchange::Nfo,
            last_price: dec!(24010),
            bid: Some(dec!(24000)),
            ask: Some(dec!(24010)),
            timestamp: Utc::now(),
        };
        assert_eq!(quote.mid(), dec!(24005));

        quote.ask = None;
        assert_eq!(quote.mid(), dec!(24010));
    }

    #[test]
    fn test_exchange_now_offset() {
        assert_eq!(exchange_now().offset().local_minus_utc(), IST_OFFSET_SECS);
    }
}
