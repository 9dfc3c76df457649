//! Configuration management.

mod flags;
mod settings;

pub use flags::{FileFlagSource, RiskFlagSource, StaticFlagSource};
pub use settings::{
    AppConfig, AppSettings, CredentialsConfig, DataProviderConfig, LoggingConfig, ScheduleConfig,
    SignalConfig,
};

pub use config::ConfigError;

use config::{Config, Environment, File};
use std::path::Path;

/// Load configuration from file and environment.
///
/// Environment variables override file values, e.g.
/// `TRADING__RISK__TRADING_ENABLED=true`.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("TRADING")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}
