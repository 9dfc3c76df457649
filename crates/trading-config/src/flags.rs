//! Risk flag sources.
//!
//! Operators flip `trading_enabled` or move the stop-loss while the process
//! runs, so tasks take a fresh [`RiskConfig`] snapshot at the start of every
//! invocation instead of holding one from startup.

use std::path::PathBuf;
use tracing::debug;
use trading_core::error::TradingError;
use trading_risk::RiskConfig;

use crate::load_config;

/// Supplies the risk configuration for one task invocation.
pub trait RiskFlagSource: Send + Sync {
    fn snapshot(&self) -> Result<RiskConfig, TradingError>;
}

/// Re-reads the config file (and environment overrides) on every snapshot.
pub struct FileFlagSource {
    path: PathBuf,
}

impl FileFlagSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RiskFlagSource for FileFlagSource {
    fn snapshot(&self) -> Result<RiskConfig, TradingError> {
        let config = load_config(&self.path).map_err(|e| {
            TradingError::Config(format!("{}: {}", self.path.display(), e))
        })?;
        config
            .risk
            .validate()
            .map_err(|problems| TradingError::Config(problems.join("; ")))?;
        debug!(
            trading_enabled = config.risk.trading_enabled,
            stop_loss = %config.risk.stop_loss_amount,
            "Loaded risk snapshot"
        );
        Ok(config.risk)
    }
}

/// Serves a fixed snapshot.
pub struct StaticFlagSource(pub RiskConfig);

impl RiskFlagSource for StaticFlagSource {
    fn snapshot(&self) -> Result<RiskConfig, TradingError> {
        Ok(self.0.clone())
    }
}
