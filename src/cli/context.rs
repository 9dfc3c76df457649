//! Wiring shared by the commands.

use anyhow::{Context as _, Result};
use chrono::Duration;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use trading_broker::{BrokerFactory, BrokerSettings};
use trading_config::{AppConfig, FileFlagSource, RiskFlagSource};
use trading_core::traits::{Broker, NotificationSink, SignalSource};
use trading_credentials::{CredentialStore, JsonFileStore};
use trading_monitor::{LogNotifier, TelegramNotifier};
use trading_tasks::{JsonFileSignalSource, StateFile, TradingTask};

/// Loaded configuration plus the objects built from it.
pub struct Context {
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub store: Arc<dyn CredentialStore>,
}

impl Context {
    pub fn new(config: AppConfig, config_path: &Path) -> Self {
        let store = Arc::new(JsonFileStore::new(&config.credentials.path));
        Self {
            config,
            config_path: config_path.to_path_buf(),
            store,
        }
    }

    /// Broker factory over the configured vendors.
    pub fn factory(&self) -> BrokerFactory {
        self.factory_with(self.config.brokers.clone())
    }

    pub fn factory_with(&self, settings: BrokerSettings) -> BrokerFactory {
        BrokerFactory::with_defaults(settings, self.store.clone())
    }

    /// The named broker, or the scheduled one.
    pub fn broker(&self, name: Option<&str>) -> Result<Arc<dyn Broker>> {
        let name = name.unwrap_or(&self.config.schedule.broker);
        self.factory()
            .get_broker(name)
            .with_context(|| format!("cannot create broker '{}'", name))
    }

    /// Telegram when enabled, otherwise the log.
    pub fn notifier(&self) -> Arc<dyn NotificationSink> {
        let telegram = &self.config.telegram;
        if telegram.enabled {
            match TelegramNotifier::new(telegram.clone()) {
                Ok(notifier) => return Arc::new(notifier),
                Err(e) => warn!(error = %e, "Telegram disabled; logging notifications instead"),
            }
        }
        Arc::new(LogNotifier)
    }

    pub fn signals(&self) -> Arc<dyn SignalSource> {
        Arc::new(JsonFileSignalSource::new(
            &self.config.signal.path,
            Duration::minutes(self.config.signal.max_age_minutes),
        ))
    }

    /// Risk flags re-read from the config file on every snapshot.
    pub fn flags(&self) -> Arc<dyn RiskFlagSource> {
        Arc::new(FileFlagSource::new(&self.config_path))
    }

    pub fn state_file(&self) -> StateFile {
        StateFile::new(&self.config.schedule.state_file)
    }

    /// A task for the broker, resumed from the saved state.
    pub async fn task(&self, broker: Option<&str>) -> Result<TradingTask> {
        let broker = self.broker(broker)?;
        let snapshot = self.state_file().load().await?;
        info!(broker = broker.name(), state = %snapshot.state, "Loaded task");
        Ok(TradingTask::new(broker, self.signals(), self.notifier()).restore(snapshot))
    }
}
