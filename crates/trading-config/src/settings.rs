//! Configuration structures.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use trading_broker::BrokerSettings;
use trading_monitor::TelegramConfig;
use trading_risk::{hhmm, RiskConfig};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub brokers: BrokerSettings,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub data_provider: DataProviderConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub signal: SignalConfig,
}

impl AppConfig {
    /// Collect every problem in the loaded configuration.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = match self.risk.validate() {
            Ok(()) => Vec::new(),
            Err(problems) => problems.into_iter().map(|p| format!("risk: {}", p)).collect(),
        };
        if self.schedule.interval_secs == 0 {
            problems.push("schedule: interval_secs must be positive".to_string());
        }
        if self.schedule.entry_time >= self.risk.market_close_cutoff {
            problems.push("schedule: entry_time must be before risk.market_close_cutoff".to_string());
        }
        if self.telegram.enabled
            && (self.telegram.bot_token.is_empty() || self.telegram.chat_id.is_empty())
        {
            problems.push("telegram: enabled without bot_token and chat_id".to_string());
        }
        if self.brokers.breeze.session_ttl_hours <= 0 || self.brokers.neo.session_ttl_hours <= 0 {
            problems.push("brokers: session_ttl_hours must be positive".to_string());
        }
        problems
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "tradedesk".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    /// Directory for the daily-rolling log file
    pub directory: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

/// Credential store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub path: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/credentials.json"),
        }
    }
}

/// Market data provider used for reachability checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataProviderConfig {
    pub base_url: String,
    /// Name of the stored `data_provider` credential
    pub credential: String,
    /// Header carrying the API key
    pub key_header: String,
}

impl Default for DataProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.example-data.in/v1/status".to_string(),
            credential: "primary".to_string(),
            key_header: "X-API-Key".to_string(),
        }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Broker the scheduled tasks trade on
    pub broker: String,
    /// Exchange-local time after which the daily open task may run
    #[serde(with = "hhmm")]
    pub entry_time: NaiveTime,
    /// Seconds between scheduler ticks
    pub interval_secs: u64,
    /// Where task state is kept between single-run invocations
    pub state_file: PathBuf,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            broker: "breeze".to_string(),
            entry_time: NaiveTime::from_hms_opt(9, 20, 0).unwrap_or(NaiveTime::MIN),
            interval_secs: 60,
            state_file: PathBuf::from("data/task_state.json"),
        }
    }
}

/// Signal source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// JSON file the signal model writes
    pub path: PathBuf,
    /// Signals older than this are ignored
    pub max_age_minutes: i64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/signal.json"),
            max_age_minutes: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        let config = AppConfig::default();
        assert!(config.problems().is_empty());
        assert!(!config.risk.trading_enabled);
        assert_eq!(config.schedule.broker, "breeze");
    }

    #[test]
    fn test_problems_reported() {
        let mut config = AppConfig::default();
        config.schedule.interval_secs = 0;
        config.schedule.entry_time = NaiveTime::from_hms_opt(15, 30, 0).unwrap();
        config.telegram.enabled = true;
        assert_eq!(config.problems().len(), 3);
    }

    #[test]
    fn test_toml_round_trip_of_sections() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[risk]"));
        assert!(text.contains("entry_time = \"09:20\""));
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.schedule.entry_time, config.schedule.entry_time);
    }
}
