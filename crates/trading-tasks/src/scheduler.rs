//! Periodic driver for a trading task.

use chrono::{DateTime, FixedOffset, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use trading_config::{RiskFlagSource, ScheduleConfig};
use trading_core::error::{BrokerError, TradingError};
use trading_core::traits::{Notification, NotificationSink};
use trading_core::types::exchange_now;

use crate::{MonitorOutcome, OpenOutcome, SkipReason, StateFile, TaskState, TradingTask};

/// Runs `open` once a day after the entry time and `monitor` on every tick.
///
/// Monitoring applies the exit rules, so the market-close cutoff forces the
/// close. Every tick reads a fresh risk snapshot. Errors are logged and
/// pushed to the notifier; none of them stops the loop. An authentication
/// failure parks the task until the next day.
pub struct Scheduler {
    task: TradingTask,
    flags: Arc<dyn RiskFlagSource>,
    notifier: Arc<dyn NotificationSink>,
    config: ScheduleConfig,
    state_file: Option<StateFile>,
    opened_on: Option<NaiveDate>,
    disabled_on: Option<NaiveDate>,
}

impl Scheduler {
    pub fn new(
        task: TradingTask,
        flags: Arc<dyn RiskFlagSource>,
        notifier: Arc<dyn NotificationSink>,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            task,
            flags,
            notifier,
            config,
            state_file: None,
            opened_on: None,
            disabled_on: None,
        }
    }

    /// Save the task state after every tick.
    pub fn with_state_file(mut self, file: StateFile) -> Self {
        self.state_file = Some(file);
        self
    }

    pub fn task(&self) -> &TradingTask {
        &self.task
    }

    /// Tick until Ctrl-C.
    pub async fn run(mut self) -> Result<(), TradingError> {
        info!(
            broker = self.task.broker_name(),
            entry = %self.config.entry_time.format("%H:%M"),
            interval_secs = self.config.interval_secs,
            "Scheduler starting"
        );

        let mut timer = interval(Duration::from_secs(self.config.interval_secs.max(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.tick(exchange_now()).await;
                }
                _ = &mut shutdown => {
                    info!(state = %self.task.state(), "Shutdown requested");
                    break;
                }
            }
        }

        self.persist().await;
        Ok(())
    }

    /// One scheduler step at exchange-local time `now`.
    pub async fn tick(&mut self, now: DateTime<FixedOffset>) {
        let today = now.date_naive();
        if self.disabled_on == Some(today) {
            debug!(broker = self.task.broker_name(), "Task parked until tomorrow");
            return;
        }

        let risk = match self.flags.snapshot() {
            Ok(risk) => risk,
            Err(e) => {
                self.fail("snapshot", e, today).await;
                return;
            }
        };

        match self.task.state() {
            TaskState::Monitoring => match self.task.monitor(&risk, now).await {
                Ok(MonitorOutcome::Closed { reason, report }) => {
                    info!(%reason, closed = report.closed_count, failed = report.failed_count, "Monitor closed positions");
                }
                Ok(outcome) => debug!(?outcome, "Monitor tick"),
                Err(e) => self.fail("monitor", e, today).await,
            },
            TaskState::Idle => {
                let time = now.time();
                let due = self.opened_on != Some(today)
                    && time >= self.config.entry_time
                    && time < risk.market_close_cutoff;
                if due {
                    match self.task.open(&risk).await {
                        Ok(OpenOutcome::Opened { .. }) => self.opened_on = Some(today),
                        Ok(OpenOutcome::Skipped(SkipReason::Rejected(reason))) => {
                            info!(%reason, "Entry declined for today");
                            self.opened_on = Some(today);
                        }
                        Ok(OpenOutcome::Skipped(reason)) => debug!(%reason, "Open skipped"),
                        Err(e) => {
                            // Transient failures retry on the next tick.
                            if !matches!(&e, TradingError::Broker(b) if b.is_transient()) {
                                self.opened_on = Some(today);
                            }
                            self.fail("open", e, today).await;
                        }
                    }
                }
            }
            state => debug!(%state, "Task busy"),
        }

        self.persist().await;
    }

    async fn fail(&mut self, task: &str, e: TradingError, today: NaiveDate) {
        let kind = match &e {
            TradingError::Broker(b) => b.kind(),
            TradingError::Config(_) => "config",
            TradingError::Credentials(_) => "credentials",
            TradingError::Signal(_) => "signal",
            TradingError::Notify(_) => "notify",
            TradingError::Validation(_) => "validation",
        };
        error!(task, broker = self.task.broker_name(), kind, error = %e, "Task failed");

        if matches!(e, TradingError::Broker(BrokerError::Authentication(_))) {
            warn!(broker = self.task.broker_name(), "Authentication failed; task disabled until tomorrow");
            self.disabled_on = Some(today);
        }

        self.notifier
            .notify(Notification::TaskFailed {
                task: task.to_string(),
                broker: self.task.broker_name().to_string(),
                error: e.to_string(),
            })
            .await;
    }

    async fn persist(&self) {
        if let Some(file) = &self.state_file {
            if let Err(e) = file.save(&self.task.snapshot()).await {
                warn!(error = %e, "Could not save task state");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBroker;
    use crate::StaticSignalSource;
    use chrono::{NaiveTime, TimeZone};
    use rust_decimal_macros::dec;
    use trading_config::StaticFlagSource;
    use trading_core::types::{Position, Side, Signal};
    use trading_monitor::MemoryNotifier;
    use trading_risk::RiskConfig;

    fn at(day: u32, h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(19800)
            .unwrap()
            .with_ymd_and_hms(2026, 1, day, h, m, 0)
            .unwrap()
    }

    fn scheduler(broker: &Arc<MockBroker>) -> (Scheduler, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::new());
        let task = TradingTask::new(
            broker.clone(),
            Arc::new(StaticSignalSource(Some(Signal::new("NIFTY", Side::Sell, 0.9)))),
            notifier.clone(),
        );
        let risk = RiskConfig {
            trading_enabled: true,
            ..RiskConfig::default()
        };
        let config = ScheduleConfig {
            entry_time: NaiveTime::from_hms_opt(9, 20, 0).unwrap(),
            ..ScheduleConfig::default()
        };
        let scheduler = Scheduler::new(
            task,
            Arc::new(StaticFlagSource(risk)),
            notifier.clone(),
            config,
        );
        (scheduler, notifier)
    }

    #[tokio::test]
    async fn test_waits_for_entry_time() {
        let broker = Arc::new(MockBroker::new());
        broker.set_margin(dec!(500000));
        broker.set_price(dec!(24000));
        let (mut scheduler, _) = scheduler(&broker);

        scheduler.tick(at(15, 9, 10)).await;
        assert!(broker.submitted().is_empty());

        scheduler.tick(at(15, 9, 20)).await;
        assert_eq!(broker.submitted().len(), 1);
        assert_eq!(scheduler.task().state(), TaskState::Monitoring);
    }

    #[tokio::test]
    async fn test_opens_once_per_day() {
        let broker = Arc::new(MockBroker::new());
        broker.set_margin(dec!(200000));
        broker.set_price(dec!(24000));
        let (mut scheduler, _) = scheduler(&broker);

        // Sized to zero: declined for the day, not retried every tick.
        scheduler.tick(at(15, 9, 30)).await;
        broker.set_margin(dec!(500000));
        scheduler.tick(at(15, 9, 31)).await;
        assert!(broker.submitted().is_empty());

        scheduler.tick(at(16, 9, 30)).await;
        assert_eq!(broker.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_monitor_then_cutoff_close() {
        let broker = Arc::new(MockBroker::new());
        broker.set_margin(dec!(500000));
        broker.set_price(dec!(24000));
        let (mut scheduler, _) = scheduler(&broker);

        scheduler.tick(at(15, 9, 30)).await;
        broker.set_positions(vec![Position::new("NIFTY", -75, dec!(24000))]);

        scheduler.tick(at(15, 12, 0)).await;
        assert_eq!(scheduler.task().state(), TaskState::Monitoring);

        scheduler.tick(at(15, 15, 15)).await;
        assert_eq!(scheduler.task().state(), TaskState::Idle);
        assert_eq!(broker.submitted().last().unwrap().side, Side::Buy);
    }

    #[tokio::test]
    async fn test_auth_failure_parks_until_next_day() {
        let broker = Arc::new(MockBroker::new());
        broker.fail_auth();
        let (mut scheduler, notifier) = scheduler(&broker);

        scheduler.tick(at(15, 9, 30)).await;
        scheduler.tick(at(15, 9, 31)).await;
        let failures = notifier
            .sent()
            .into_iter()
            .filter(|n| matches!(n, Notification::TaskFailed { .. }))
            .count();
        assert_eq!(failures, 1);
        assert_eq!(scheduler.disabled_on, NaiveDate::from_ymd_opt(2026, 1, 15));
    }

    #[tokio::test]
    async fn test_transient_failure_retries() {
        let broker = Arc::new(MockBroker::new());
        broker.set_price(dec!(24000));
        let (mut scheduler, _) = scheduler(&broker);

        // Margin unknown: the open aborts and is retried next tick.
        scheduler.tick(at(15, 9, 30)).await;
        assert_eq!(scheduler.opened_on, None);

        broker.set_margin(dec!(500000));
        scheduler.tick(at(15, 9, 31)).await;
        assert_eq!(broker.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_state_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let broker = Arc::new(MockBroker::new());
        broker.set_margin(dec!(500000));
        broker.set_price(dec!(24000));
        let (scheduler, _) = scheduler(&broker);
        let mut scheduler = scheduler.with_state_file(StateFile::new(&path));

        scheduler.tick(at(15, 9, 30)).await;
        let saved = StateFile::new(&path).load().await.unwrap();
        assert_eq!(saved.state, TaskState::Monitoring);
    }
}
