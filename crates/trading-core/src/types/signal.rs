//! Trading signal types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Exchange, ProductType, Side};

/// A directional trading signal produced by an external model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Symbol the signal applies to
    pub symbol: String,
    /// Exchange segment
    #[serde(default)]
    pub exchange: Exchange,
    /// Direction to open
    pub side: Side,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Product type for the resulting order
    #[serde(default)]
    pub product: ProductType,
    /// Contract expiry for derivatives
    #[serde(default)]
    pub expiry: Option<NaiveDate>,
    /// When the signal was generated
    pub generated_at: DateTime<Utc>,
}

impl Signal {
    /// Create a signal generated now.
    pub fn new(symbol: impl Into<String>, side: Side, confidence: f64) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: Exchange::default(),
            side,
            confidence,
            product: ProductType::default(),
            expiry: None,
            generated_at: Utc::now(),
        }
    }

    /// Whether the confidence clears the threshold. NaN never passes.
    pub fn is_actionable(&self, threshold: f64) -> bool {
        self.confidence.is_finite() && self.confidence >= threshold
    }
}
