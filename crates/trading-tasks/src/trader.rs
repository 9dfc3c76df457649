//! The open → monitor → close state machine.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use trading_core::error::TradingError;
use trading_core::traits::{Broker, Notification, NotificationSink, SignalSource};
use trading_core::types::{OrderId, Position};
use trading_risk::{ExitReason, RiskConfig, RiskDecision, RiskManager};

use crate::{close_positions, CloseReport, TaskSnapshot, TaskState, TrackedPosition};

/// Why `open` did not place an order.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The task already holds or is working on a position
    Busy(TaskState),
    TradingDisabled,
    /// The broker already reports open positions
    ExistingPositions(usize),
    NoSignal,
    /// Risk checks turned the signal down
    Rejected(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Busy(state) => write!(f, "task is {}", state),
            SkipReason::TradingDisabled => write!(f, "trading is disabled"),
            SkipReason::ExistingPositions(n) => write!(f, "broker reports {} open position(s)", n),
            SkipReason::NoSignal => write!(f, "no actionable signal"),
            SkipReason::Rejected(reason) => f.write_str(reason),
        }
    }
}

/// Result of an `open` invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    Opened {
        order_id: OrderId,
        lots: u32,
        quantity: u32,
    },
    Skipped(SkipReason),
}

/// Result of a `monitor` invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorOutcome {
    /// No position is being monitored
    Inactive,
    /// Position still open, no exit condition met
    Holding { pnl: Decimal },
    /// The tracked position no longer exists at the broker
    PositionGone,
    Closed { reason: ExitReason, report: CloseReport },
}

/// One trading task bound to one broker.
pub struct TradingTask {
    broker: Arc<dyn Broker>,
    signals: Arc<dyn SignalSource>,
    notifier: Arc<dyn NotificationSink>,
    state: TaskState,
    tracked: Option<TrackedPosition>,
}

impl TradingTask {
    pub fn new(
        broker: Arc<dyn Broker>,
        signals: Arc<dyn SignalSource>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            broker,
            signals,
            notifier,
            state: TaskState::Idle,
            tracked: None,
        }
    }

    /// Resume from a saved snapshot. Transitional states resume as idle.
    pub fn restore(mut self, snapshot: TaskSnapshot) -> Self {
        self.state = match (snapshot.state, &snapshot.tracked) {
            (TaskState::Monitoring, Some(_)) => TaskState::Monitoring,
            _ => TaskState::Idle,
        };
        self.tracked = if self.state == TaskState::Monitoring {
            snapshot.tracked
        } else {
            None
        };
        self
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            state: self.state,
            tracked: self.tracked.clone(),
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn tracked(&self) -> Option<&TrackedPosition> {
        self.tracked.as_ref()
    }

    pub fn broker_name(&self) -> &str {
        self.broker.name()
    }

    fn transition(&mut self, to: TaskState) {
        if self.state != to {
            debug!(broker = self.broker.name(), from = %self.state, to = %to, "Task state change");
            self.state = to;
        }
    }

    fn reset(&mut self) {
        self.tracked = None;
        self.transition(TaskState::Idle);
    }

    /// Evaluate the latest signal and open a position if risk allows.
    ///
    /// Any broker failure returns the task to idle. A margin that cannot be
    /// fetched aborts the run; it is never treated as zero.
    pub async fn open(&mut self, risk: &RiskConfig) -> Result<OpenOutcome, TradingError> {
        if self.state != TaskState::Idle {
            return Ok(OpenOutcome::Skipped(SkipReason::Busy(self.state)));
        }
        if !risk.trading_enabled {
            info!(broker = self.broker.name(), "Trading disabled; not opening");
            return Ok(OpenOutcome::Skipped(SkipReason::TradingDisabled));
        }

        self.transition(TaskState::Evaluating);
        let result = self.evaluate_and_submit(risk).await;
        if !matches!(result, Ok(OpenOutcome::Opened { .. })) {
            self.reset();
        }
        result
    }

    async fn evaluate_and_submit(&mut self, risk: &RiskConfig) -> Result<OpenOutcome, TradingError> {
        let existing = self.broker.open_positions().await?;
        if !existing.is_empty() {
            info!(
                broker = self.broker.name(),
                count = existing.len(),
                "Open positions present; not opening another"
            );
            return Ok(OpenOutcome::Skipped(SkipReason::ExistingPositions(existing.len())));
        }

        let Some(signal) = self.signals.latest().await? else {
            info!(broker = self.broker.name(), "No signal available");
            return Ok(OpenOutcome::Skipped(SkipReason::NoSignal));
        };

        let margin = self.broker.fetch_margin().await?;
        let quote = self.broker.fetch_quote(&signal.symbol, signal.exchange).await?;

        let (order, lots) = match RiskManager::new(risk).evaluate_signal(&signal, &margin, quote.last_price) {
            RiskDecision::Approved { order, lots } => (order, lots),
            RiskDecision::Rejected { reason } => {
                info!(
                    broker = self.broker.name(),
                    symbol = %signal.symbol,
                    confidence = signal.confidence,
                    "Signal not taken: {}",
                    reason
                );
                return Ok(OpenOutcome::Skipped(SkipReason::Rejected(reason)));
            }
        };

        self.transition(TaskState::OrderPending);
        let (side, quantity) = (order.side, order.quantity);
        let order_id = match self.broker.submit_order(order).await {
            Ok(id) => id,
            Err(e) => {
                error!(
                    broker = self.broker.name(),
                    symbol = %signal.symbol,
                    kind = e.kind(),
                    error = %e,
                    "Order submission failed"
                );
                return Err(e.into());
            }
        };

        info!(
            broker = self.broker.name(),
            symbol = %signal.symbol,
            order_id = %order_id,
            lots,
            "Opened {} {}",
            side,
            quantity
        );
        self.tracked = Some(TrackedPosition {
            symbol: signal.symbol.clone(),
            exchange: signal.exchange,
            side,
            quantity,
            lots,
            order_id: order_id.clone(),
            expiry: signal.expiry,
            opened_at: Utc::now(),
        });
        self.transition(TaskState::Monitoring);

        self.notifier
            .notify(Notification::OrderPlaced {
                broker: self.broker.name().to_string(),
                symbol: signal.symbol,
                side,
                quantity,
                order_id: order_id.clone(),
            })
            .await;

        Ok(OpenOutcome::Opened {
            order_id,
            lots,
            quantity,
        })
    }

    /// Check the tracked position against the exit rules.
    ///
    /// `now` is exchange-local time.
    pub async fn monitor(
        &mut self,
        risk: &RiskConfig,
        now: DateTime<FixedOffset>,
    ) -> Result<MonitorOutcome, TradingError> {
        if self.state != TaskState::Monitoring {
            return Ok(MonitorOutcome::Inactive);
        }
        let Some(tracked) = self.tracked.clone() else {
            self.reset();
            return Ok(MonitorOutcome::Inactive);
        };

        let positions: Vec<Position> = self
            .broker
            .open_positions()
            .await?
            .into_iter()
            .filter(|p| p.matches(&tracked.symbol))
            .collect();

        if positions.is_empty() {
            warn!(
                broker = self.broker.name(),
                symbol = %tracked.symbol,
                "Tracked position no longer open at broker"
            );
            self.reset();
            return Ok(MonitorOutcome::PositionGone);
        }

        let pnl: Decimal = positions.iter().map(|p| p.unrealized_pnl).sum();
        let policy = risk.exit_policy();
        debug!(broker = self.broker.name(), symbol = %tracked.symbol, %pnl, "Monitoring");

        let Some(reason) = policy.evaluate(pnl, now, tracked.expiry) else {
            return Ok(MonitorOutcome::Holding { pnl });
        };

        if reason == ExitReason::StopLoss {
            warn!(
                broker = self.broker.name(),
                symbol = %tracked.symbol,
                %pnl,
                threshold = %policy.stop_loss_amount,
                "Stop-loss triggered"
            );
            self.notifier
                .notify(Notification::StopLossHit {
                    broker: self.broker.name().to_string(),
                    symbol: tracked.symbol.clone(),
                    pnl,
                    threshold: policy.stop_loss_amount,
                })
                .await;
        } else {
            info!(broker = self.broker.name(), symbol = %tracked.symbol, %pnl, %reason, "Exit condition met");
        }

        self.transition(TaskState::Closing);
        let report = self.finish(&tracked.symbol, reason, &positions, Some(pnl)).await;
        Ok(MonitorOutcome::Closed { reason, report })
    }

    /// Close positions now.
    ///
    /// With a tracked position only its symbol is closed; otherwise every
    /// open position at the broker is.
    pub async fn close(&mut self, reason: ExitReason) -> Result<CloseReport, TradingError> {
        let previous = self.state;
        self.transition(TaskState::Closing);

        let open = match self.broker.open_positions().await {
            Ok(open) => open,
            Err(e) => {
                self.transition(previous);
                return Err(e.into());
            }
        };

        let (label, positions) = match &self.tracked {
            Some(tracked) => {
                let symbol = tracked.symbol.clone();
                let positions = open.into_iter().filter(|p| p.matches(&symbol)).collect();
                (symbol, positions)
            }
            None => ("all".to_string(), open),
        };

        let pnl = positions.iter().map(|p: &Position| p.unrealized_pnl).sum();
        Ok(self.finish(&label, reason, &positions, Some(pnl)).await)
    }

    async fn finish(
        &mut self,
        symbol: &str,
        reason: ExitReason,
        positions: &[Position],
        pnl: Option<Decimal>,
    ) -> CloseReport {
        let report = close_positions(self.broker.as_ref(), positions).await;
        if report.all_closed() {
            info!(
                broker = self.broker.name(),
                symbol,
                %reason,
                closed = report.closed_count,
                "Positions closed"
            );
        } else {
            error!(
                broker = self.broker.name(),
                symbol,
                %reason,
                closed = report.closed_count,
                failed = report.failed_count,
                "Some positions could not be closed"
            );
        }

        if !positions.is_empty() {
            self.notifier
                .notify(Notification::PositionsClosed {
                    broker: self.broker.name().to_string(),
                    symbol: symbol.to_string(),
                    reason: reason.to_string(),
                    closed: report.closed_count,
                    failed: report.failed_count,
                    pnl,
                })
                .await;
        }

        self.reset();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBroker;
    use crate::StaticSignalSource;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use trading_core::error::BrokerError;
    use trading_core::types::{Exchange, Side, Signal};
    use trading_monitor::MemoryNotifier;

    fn risk() -> RiskConfig {
        RiskConfig {
            trading_enabled: true,
            lot_size: 75,
            max_lots: 2,
            ..RiskConfig::default()
        }
    }

    fn ist(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(19800)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 15, h, m, 0)
            .unwrap()
    }

    fn task(
        broker: &Arc<MockBroker>,
        signal: Option<Signal>,
    ) -> (TradingTask, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::new());
        let task = TradingTask::new(
            broker.clone(),
            Arc::new(StaticSignalSource(signal)),
            notifier.clone(),
        );
        (task, notifier)
    }

    fn short_nifty(pnl: Decimal) -> Position {
        let mut position = Position::new("NIFTY", -75, dec!(24000));
        position.unrealized_pnl = pnl;
        position
    }

    fn monitoring(broker: &Arc<MockBroker>) -> (TradingTask, Arc<MemoryNotifier>) {
        let (task, notifier) = task(broker, None);
        let task = task.restore(TaskSnapshot {
            state: TaskState::Monitoring,
            tracked: Some(TrackedPosition {
                symbol: "NIFTY".into(),
                exchange: Exchange::Nfo,
                side: Side::Sell,
                quantity: 75,
                lots: 1,
                order_id: "ORD0001".into(),
                expiry: None,
                opened_at: Utc::now(),
            }),
        });
        (task, notifier)
    }

    #[tokio::test]
    async fn test_open_places_sized_order() {
        let broker = Arc::new(MockBroker::new());
        broker.set_margin(dec!(500000));
        broker.set_price(dec!(24000));
        let (mut task, notifier) = task(&broker, Some(Signal::new("NIFTY", Side::Sell, 0.8)));

        let outcome = task.open(&risk()).await.unwrap();
        assert_eq!(
            outcome,
            OpenOutcome::Opened {
                order_id: "ORD0001".into(),
                lots: 1,
                quantity: 75
            }
        );
        assert_eq!(task.state(), TaskState::Monitoring);
        assert_eq!(task.tracked().unwrap().symbol, "NIFTY");
        assert_eq!(broker.submitted()[0].side, Side::Sell);
        assert!(matches!(notifier.sent()[0], Notification::OrderPlaced { .. }));
    }

    #[tokio::test]
    async fn test_open_sized_to_zero_stays_idle() {
        let broker = Arc::new(MockBroker::new());
        broker.set_margin(dec!(200000));
        broker.set_price(dec!(24000));
        let (mut task, _) = task(&broker, Some(Signal::new("NIFTY", Side::Buy, 0.9)));

        let outcome = task.open(&risk()).await.unwrap();
        assert!(matches!(outcome, OpenOutcome::Skipped(SkipReason::Rejected(_))));
        assert_eq!(task.state(), TaskState::Idle);
        assert!(broker.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_open_submission_failure_returns_to_idle() {
        let broker = Arc::new(MockBroker::new());
        broker.set_margin(dec!(500000));
        broker.set_price(dec!(24000));
        broker.reject_orders_for("NIFTY");
        let (mut task, notifier) = task(&broker, Some(Signal::new("NIFTY", Side::Buy, 0.9)));

        let err = task.open(&risk()).await.unwrap_err();
        assert!(matches!(err, TradingError::Broker(BrokerError::OrderRejected { .. })));
        assert_eq!(task.state(), TaskState::Idle);
        assert!(task.tracked().is_none());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_open_margin_unknown_aborts() {
        let broker = Arc::new(MockBroker::new());
        broker.set_price(dec!(24000));
        let (mut task, _) = task(&broker, Some(Signal::new("NIFTY", Side::Buy, 0.9)));

        let err = task.open(&risk()).await.unwrap_err();
        assert!(matches!(err, TradingError::Broker(BrokerError::RemoteUnavailable(_))));
        assert_eq!(task.state(), TaskState::Idle);
        assert!(broker.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_open_skips_when_disabled_or_positions_exist() {
        let broker = Arc::new(MockBroker::new());
        broker.set_margin(dec!(500000));
        let (mut task, _) = task(&broker, Some(Signal::new("NIFTY", Side::Buy, 0.9)));

        let disabled = RiskConfig {
            trading_enabled: false,
            ..risk()
        };
        assert_eq!(
            task.open(&disabled).await.unwrap(),
            OpenOutcome::Skipped(SkipReason::TradingDisabled)
        );

        broker.set_positions(vec![short_nifty(dec!(0))]);
        assert_eq!(
            task.open(&risk()).await.unwrap(),
            OpenOutcome::Skipped(SkipReason::ExistingPositions(1))
        );
        assert_eq!(task.state(), TaskState::Idle);
    }

    #[tokio::test]
    async fn test_monitor_stop_loss_closes() {
        let broker = Arc::new(MockBroker::new());
        broker.set_positions(vec![short_nifty(dec!(-16000))]);
        let (mut task, notifier) = monitoring(&broker);

        let outcome = task.monitor(&risk(), ist(11, 0)).await.unwrap();
        match outcome {
            MonitorOutcome::Closed { reason, report } => {
                assert_eq!(reason, ExitReason::StopLoss);
                assert_eq!(report.closed_count, 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(task.state(), TaskState::Idle);

        let submitted = broker.submitted();
        assert_eq!(submitted[0].side, Side::Buy);
        assert_eq!(submitted[0].quantity, 75);

        let sent = notifier.sent();
        assert!(matches!(sent[0], Notification::StopLossHit { .. }));
        assert!(matches!(sent[1], Notification::PositionsClosed { .. }));
    }

    #[tokio::test]
    async fn test_open_succeeds_when_notification_fails() {
        let broker = Arc::new(MockBroker::new());
        broker.set_margin(dec!(500000));
        broker.set_price(dec!(24000));
        let notifier = Arc::new(MemoryNotifier::failing());
        let mut task = TradingTask::new(
            broker.clone(),
            Arc::new(StaticSignalSource(Some(Signal::new("NIFTY", Side::Sell, 0.8)))),
            notifier.clone(),
        );

        let outcome = task.open(&risk()).await.unwrap();
        assert!(matches!(outcome, OpenOutcome::Opened { lots: 1, .. }));
        assert_eq!(task.state(), TaskState::Monitoring);
        assert_eq!(broker.submitted().len(), 1);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_monitor_closes_when_notification_fails() {
        let broker = Arc::new(MockBroker::new());
        broker.set_positions(vec![short_nifty(dec!(-16000))]);
        let (monitoring, _) = monitoring(&broker);
        let notifier = Arc::new(MemoryNotifier::failing());
        let mut task = TradingTask::new(
            broker.clone(),
            Arc::new(StaticSignalSource(None)),
            notifier.clone(),
        )
        .restore(monitoring.snapshot());

        match task.monitor(&risk(), ist(11, 0)).await.unwrap() {
            MonitorOutcome::Closed { reason, report } => {
                assert_eq!(reason, ExitReason::StopLoss);
                assert_eq!(report.closed_count, 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(task.state(), TaskState::Idle);
        assert_eq!(broker.submitted()[0].side, Side::Buy);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_monitor_holds_above_stop_loss() {
        let broker = Arc::new(MockBroker::new());
        broker.set_positions(vec![short_nifty(dec!(-14999.99))]);
        let (mut task, _) = monitoring(&broker);

        let outcome = task.monitor(&risk(), ist(11, 0)).await.unwrap();
        assert_eq!(outcome, MonitorOutcome::Holding { pnl: dec!(-14999.99) });
        assert_eq!(task.state(), TaskState::Monitoring);
    }

    #[tokio::test]
    async fn test_monitor_partial_close_failure() {
        let broker = Arc::new(MockBroker::new());
        let mut other_leg = Position::new("NIFTY", 75, dec!(24050));
        other_leg.unrealized_pnl = dec!(-1000);
        broker.set_positions(vec![short_nifty(dec!(-15000)), other_leg]);
        broker.fail_next_order(BrokerError::OrderRejected {
            reason: "exchange closed".into(),
        });
        let (mut task, notifier) = monitoring(&broker);

        match task.monitor(&risk(), ist(11, 0)).await.unwrap() {
            MonitorOutcome::Closed { report, .. } => {
                assert_eq!(report.closed_count, 1);
                assert_eq!(report.failed_count, 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        match &notifier.sent()[1] {
            Notification::PositionsClosed { closed, failed, .. } => {
                assert_eq!((*closed, *failed), (1, 1));
            }
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_monitor_cutoff_forces_close() {
        let broker = Arc::new(MockBroker::new());
        broker.set_positions(vec![short_nifty(dec!(2000))]);
        let (mut task, _) = monitoring(&broker);

        match task.monitor(&risk(), ist(15, 15)).await.unwrap() {
            MonitorOutcome::Closed { reason, .. } => assert_eq!(reason, ExitReason::Cutoff),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_monitor_position_gone() {
        let broker = Arc::new(MockBroker::new());
        broker.set_positions(vec![Position::new("BANKNIFTY", 30, dec!(52000))]);
        let (mut task, _) = monitoring(&broker);

        assert_eq!(
            task.monitor(&risk(), ist(11, 0)).await.unwrap(),
            MonitorOutcome::PositionGone
        );
        assert_eq!(task.state(), TaskState::Idle);
    }

    #[tokio::test]
    async fn test_monitor_remote_failure_keeps_monitoring() {
        let broker = Arc::new(MockBroker::new());
        broker.fail_positions(true);
        let (mut task, _) = monitoring(&broker);

        assert!(task.monitor(&risk(), ist(11, 0)).await.is_err());
        assert_eq!(task.state(), TaskState::Monitoring);
    }

    #[tokio::test]
    async fn test_manual_close_without_tracking_closes_everything() {
        let broker = Arc::new(MockBroker::new());
        broker.set_positions(vec![
            short_nifty(dec!(0)),
            Position::new("BANKNIFTY", 30, dec!(52000)),
        ]);
        let (mut task, _) = task(&broker, None);

        let report = task.close(ExitReason::Manual).await.unwrap();
        assert_eq!(report.closed_count, 2);
        assert_eq!(task.state(), TaskState::Idle);
    }

    #[test]
    fn test_restore_drops_transitional_states() {
        let broker = Arc::new(MockBroker::new());
        let (task, _) = task(&broker, None);
        let task = task.restore(TaskSnapshot {
            state: TaskState::OrderPending,
            tracked: None,
        });
        assert_eq!(task.state(), TaskState::Idle);
    }
}
