//! Notification sink trait and message templates.

use crate::error::TradingError;
use crate::types::{OrderId, Side};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Events pushed to the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    OrderPlaced {
        broker: String,
        symbol: String,
        side: Side,
        quantity: u32,
        order_id: OrderId,
    },
    PositionsClosed {
        broker: String,
        symbol: String,
        reason: String,
        closed: usize,
        failed: usize,
        pnl: Option<Decimal>,
    },
    StopLossHit {
        broker: String,
        symbol: String,
        pnl: Decimal,
        threshold: Decimal,
    },
    TaskFailed {
        task: String,
        broker: String,
        error: String,
    },
}

impl Notification {
    /// Render the plain-text message body.
    pub fn render(&self) -> String {
        match self {
            Notification::OrderPlaced { broker, symbol, side, quantity, order_id } => format!(
                "✅ Order placed on {}\n{} {} x {}\nOrder ID: {}",
                broker, side, symbol, quantity, order_id
            ),
            Notification::PositionsClosed { broker, symbol, reason, closed, failed, pnl } => {
                let mut text = format!(
                    "📤 Positions closed on {} ({})\n{}: {} closed, {} failed",
                    broker, reason, symbol, closed, failed
                );
                if let Some(pnl) = pnl {
                    text.push_str(&format!("\nP&L: ₹{}", pnl.round_dp(2)));
                }
                text
            }
            Notification::StopLossHit { broker, symbol, pnl, threshold } => format!(
                "🛑 Stop-loss hit on {}\n{} P&L ₹{} (limit ₹{})",
                broker,
                symbol,
                pnl.round_dp(2),
                threshold.round_dp(2)
            ),
            Notification::TaskFailed { task, broker, error } => {
                format!("⚠️ Task '{}' failed on {}\n{}", task, broker, error)
            }
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Fire-and-forget message push.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<(), TradingError>;

    /// Deliver and swallow any failure. Notification problems never fail a task.
    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.send(&notification).await {
            tracing::warn!(error = %e, "Failed to deliver notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_render_order_placed() {
        let text = Notification::OrderPlaced {
            broker: "breeze".into(),
            symbol: "NIFTY".into(),
            side: Side::Buy,
            quantity: 75,
            order_id: "2026011500001".into(),
        }
        .render();
        assert!(text.contains("BUY NIFTY x 75"));
        assert!(text.contains("2026011500001"));
    }

    #[test]
    fn test_render_close_with_pnl() {
        let text = Notification::PositionsClosed {
            broker: "neo".into(),
            symbol: "NIFTY".into(),
            reason: "stop_loss".into(),
            closed: 1,
            failed: 1,
            pnl: Some(dec!(-16000.456)),
        }
        .render();
        assert!(text.contains("1 closed, 1 failed"));
        assert!(text.contains("₹-16000.46"));
    }
}
