//! Bulk position closing.

use serde::Serialize;
use tracing::{info, warn};
use trading_core::traits::Broker;
use trading_core::types::{OrderId, Position};

/// Outcome of closing a set of positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CloseReport {
    pub closed_count: usize,
    pub failed_count: usize,
    pub order_ids: Vec<OrderId>,
}

impl CloseReport {
    pub fn all_closed(&self) -> bool {
        self.failed_count == 0
    }
}

/// Submit a closing market order for every open position.
///
/// Each position is attempted independently; a failure is logged and
/// counted, and the remaining positions are still closed.
pub async fn close_positions(broker: &dyn Broker, positions: &[Position]) -> CloseReport {
    let mut report = CloseReport::default();

    for position in positions {
        let Some(order) = position.closing_order() else {
            continue;
        };
        let (side, quantity) = (order.side, order.quantity);

        match broker.submit_order(order).await {
            Ok(order_id) => {
                info!(
                    broker = broker.name(),
                    symbol = %position.symbol,
                    order_id = %order_id,
                    "Closing order placed: {} {}",
                    side,
                    quantity
                );
                report.closed_count += 1;
                report.order_ids.push(order_id);
            }
            Err(e) => {
                warn!(
                    broker = broker.name(),
                    symbol = %position.symbol,
                    kind = e.kind(),
                    error = %e,
                    "Failed to close position"
                );
                report.failed_count += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBroker;
    use rust_decimal_macros::dec;
    use trading_core::error::BrokerError;
    use trading_core::types::Side;

    #[tokio::test]
    async fn test_partial_failure_is_counted() {
        let broker = MockBroker::new();
        broker.reject_orders_for("BANKNIFTY");
        let positions = vec![
            Position::new("NIFTY", -75, dec!(24000)),
            Position::new("BANKNIFTY", 30, dec!(52000)),
        ];

        let report = close_positions(&broker, &positions).await;
        assert_eq!(report.closed_count, 1);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.order_ids.len(), 1);
        assert!(!report.all_closed());

        let submitted = broker.submitted();
        assert_eq!(submitted[0].side, Side::Buy);
        assert_eq!(submitted[0].quantity, 75);
    }

    #[tokio::test]
    async fn test_flat_positions_skipped() {
        let broker = MockBroker::new();
        let report = close_positions(&broker, &[Position::new("NIFTY", 0, dec!(1))]).await;
        assert_eq!(report, CloseReport::default());
        assert!(broker.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_does_not_stop_others() {
        let broker = MockBroker::new();
        broker.fail_next_order(BrokerError::RemoteUnavailable("timeout".into()));
        let positions = vec![
            Position::new("NIFTY", 75, dec!(24000)),
            Position::new("NIFTY", 75, dec!(24010)),
        ];
        let report = close_positions(&broker, &positions).await;
        assert_eq!((report.closed_count, report.failed_count), (1, 1));
    }
}
