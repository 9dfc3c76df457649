//! Notification sinks.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};
use trading_core::error::TradingError;
use trading_core::traits::{Notification, NotificationSink};

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

/// Pushes notifications to a Telegram chat through the Bot API.
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, TradingError> {
        if config.bot_token.is_empty() || config.chat_id.is_empty() {
            return Err(TradingError::Config(
                "telegram needs both bot_token and chat_id".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| TradingError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), TradingError> {
        let body = json!({
            "chat_id": self.config.chat_id,
            "text": notification.render(),
        });
        let resp = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| TradingError::Notify(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TradingError::Notify(format!("telegram returned {}: {}", status, text)));
        }
        debug!("Telegram notification delivered");
        Ok(())
    }
}

/// Writes notifications to the log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), TradingError> {
        info!(notification = %serde_json::to_string(notification).unwrap_or_default(), "{}", notification);
        Ok(())
    }
}

/// Keeps notifications in memory, for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), TradingError> {
        if self.fail {
            return Err(TradingError::Notify("delivery disabled".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stop_loss() -> Notification {
        Notification::StopLossHit {
            broker: "breeze".into(),
            symbol: "NIFTY".into(),
            pnl: dec!(-16000),
            threshold: dec!(-15000),
        }
    }

    #[test]
    fn test_telegram_requires_token_and_chat() {
        assert!(TelegramNotifier::new(TelegramConfig::default()).is_err());

        let notifier = TelegramNotifier::new(TelegramConfig {
            enabled: true,
            bot_token: "123:abc".into(),
            chat_id: "42".into(),
            api_base: "https://api.telegram.org/".into(),
        })
        .unwrap();
        assert_eq!(notifier.endpoint(), "https://api.telegram.org/bot123:abc/sendMessage");
    }

    #[tokio::test]
    async fn test_memory_notifier_records() {
        let sink = MemoryNotifier::new();
        sink.notify(stop_loss()).await;
        assert_eq!(sink.sent(), vec![stop_loss()]);
    }

    #[tokio::test]
    async fn test_failing_sink_is_swallowed_by_notify() {
        let sink = MemoryNotifier::failing();
        assert!(sink.send(&stop_loss()).await.is_err());
        sink.notify(stop_loss()).await;
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.send(&stop_loss()).await.is_ok());
    }
}
