//! Order types and structures.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BrokerError;

/// Opaque order identifier returned by a broker.
pub type OrderId = String;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Side that closes a position with the given signed quantity.
    pub fn closing(net_quantity: i64) -> Self {
        if net_quantity > 0 {
            Side::Sell
        } else {
            Side::Buy
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Market order - execute immediately at best available price
    Market,
    /// Limit order - execute at specified price or better
    Limit,
    /// Stop-loss limit order (SL)
    StopLoss,
    /// Stop-loss market order (SL-M)
    StopLossMarket,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::StopLoss => write!(f, "SL"),
            OrderType::StopLossMarket => write!(f, "SL-M"),
        }
    }
}

/// Exchange segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    /// NSE cash
    Nse,
    /// BSE cash
    Bse,
    /// NSE futures & options
    #[default]
    Nfo,
    /// BSE futures & options
    Bfo,
}

impl Exchange {
    /// Whether instruments on this segment are derivatives.
    pub fn is_derivative(&self) -> bool {
        matches!(self, Exchange::Nfo | Exchange::Bfo)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Nse => "NSE",
            Exchange::Bse => "BSE",
            Exchange::Nfo => "NFO",
            Exchange::Bfo => "BFO",
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NSE" | "NSE_CM" => Ok(Exchange::Nse),
            "BSE" | "BSE_CM" => Ok(Exchange::Bse),
            "NFO" | "NSE_FO" => Ok(Exchange::Nfo),
            "BFO" | "BSE_FO" => Ok(Exchange::Bfo),
            other => Err(format!("unknown exchange: {}", other)),
        }
    }
}

/// Product type (margin treatment of the position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Squared off the same day (MIS)
    #[default]
    Intraday,
    /// Cash delivery (CNC)
    Delivery,
    /// Derivatives carried overnight (NRML)
    Carryforward,
}

/// Option right for derivative orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    Call,
    Put,
}

/// Order validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    /// Valid for the trading day only
    #[default]
    Day,
    /// Immediate or cancel
    Ioc,
}

/// Order request for submitting new orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Symbol to trade (vendor stock code or trading symbol)
    pub symbol: String,
    /// Buy or sell
    pub side: Side,
    /// Quantity in units (lots multiplied by lot size)
    pub quantity: u32,
    /// Type of order
    pub order_type: OrderType,
    /// Limit price (for limit and stop-loss orders)
    pub limit_price: Option<Decimal>,
    /// Trigger price (for stop-loss orders)
    pub trigger_price: Option<Decimal>,
    /// Exchange segment
    pub exchange: Exchange,
    /// Product type
    pub product_type: ProductType,
    /// Contract expiry for derivatives
    pub expiry: Option<NaiveDate>,
    /// Strike price for options
    pub strike_price: Option<Decimal>,
    /// Call or put for options
    pub right: Option<OptionRight>,
    /// Validity
    pub validity: Validity,
}

impl OrderRequest {
    /// Create a market order request.
    pub fn market(symbol: impl Into<String>, exchange: Exchange, side: Side, quantity: u32) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            order_type: OrderType::Market,
            limit_price: None,
            trigger_price: None,
            exchange,
            product_type: ProductType::default(),
            expiry: None,
            strike_price: None,
            right: None,
            validity: Validity::Day,
        }
    }

    /// Create a limit order request.
    pub fn limit(
        symbol: impl Into<String>,
        exchange: Exchange,
        side: Side,
        quantity: u32,
        limit_price: Decimal,
    ) -> Self {
        Self {
            order_type: OrderType::Limit,
            limit_price: Some(limit_price),
            ..Self::market(symbol, exchange, side, quantity)
        }
    }

    /// Set the product type.
    pub fn with_product(mut self, product: ProductType) -> Self {
        self.product_type = product;
        self
    }

    /// Set the contract expiry.
    pub fn with_expiry(mut self, expiry: NaiveDate) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Make this an option order.
    pub fn with_option(mut self, strike: Decimal, right: OptionRight) -> Self {
        self.strike_price = Some(strike);
        self.right = Some(right);
        self
    }

    /// Set the validity.
    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    /// Check the request before it is sent anywhere.
    pub fn validate(&self) -> Result<(), BrokerError> {
        if self.symbol.trim().is_empty() {
            return Err(BrokerError::InvalidOrder("symbol is empty".into()));
        }
        if self.quantity == 0 {
            return Err(BrokerError::InvalidOrder("quantity must be positive".into()));
        }
        match self.order_type {
            OrderType::Limit | OrderType::StopLoss => match self.limit_price {
                Some(p) if p > Decimal::ZERO => {}
                _ => {
                    return Err(BrokerError::InvalidOrder(format!(
                        "{} order needs a positive limit price",
                        self.order_type
                    )))
                }
            },
            OrderType::Market | OrderType::StopLossMarket => {}
        }
        if matches!(self.order_type, OrderType::StopLoss | OrderType::StopLossMarket)
            && self.trigger_price.map_or(true, |p| p <= Decimal::ZERO)
        {
            return Err(BrokerError::InvalidOrder("stop-loss order needs a trigger price".into()));
        }
        if self.right.is_some() && self.strike_price.is_none() {
            return Err(BrokerError::InvalidOrder("option order needs a strike price".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_request_market() {
        let request = OrderRequest::market("NIFTY", Exchange::Nfo, Side::Buy, 50);
        assert_eq!(request.symbol, "NIFTY");
        assert_eq!(request.side, Side::Buy);
        assert_eq!(request.order_type, OrderType::Market);
        assert_eq!(request.quantity, 50);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_order_request_limit() {
        let request = OrderRequest::limit("RELIANCE", Exchange::Nse, Side::Sell, 10, dec!(2850.50));
        assert_eq!(request.order_type, OrderType::Limit);
        assert_eq!(request.limit_price, Some(dec!(2850.50)));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_zero_quantity_is_invalid() {
        let request = OrderRequest::market("NIFTY", Exchange::Nfo, Side::Buy, 0);
        assert!(matches!(request.validate(), Err(BrokerError::InvalidOrder(_))));
    }

    #[test]
    fn test_limit_without_price_is_invalid() {
        let mut request = OrderRequest::limit("NIFTY", Exchange::Nfo, Side::Buy, 50, dec!(100));
        request.limit_price = None;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_option_needs_strike() {
        let mut request = OrderRequest::market("NIFTY", Exchange::Nfo, Side::Buy, 50)
            .with_option(dec!(24000), OptionRight::Call);
        assert!(request.validate().is_ok());
        request.strike_price = None;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
        assert_eq!(Side::closing(75), Side::Sell);
        assert_eq!(Side::closing(-75), Side::Buy);
    }

    #[test]
    fn test_exchange_parse() {
        assert_eq!("nfo".parse::<Exchange>(), Ok(Exchange::Nfo));
        assert_eq!("nse_cm".parse::<Exchange>(), Ok(Exchange::Nse));
        assert!("XYZ".parse::<Exchange>().is_err());
    }
}
