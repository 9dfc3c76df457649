//! Signal sources.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::path::PathBuf;
use tracing::{debug, warn};
use trading_core::error::TradingError;
use trading_core::traits::SignalSource;
use trading_core::types::Signal;

/// Reads the signal an external model writes to a JSON file.
///
/// The file holds one signal object. A missing or empty file means no
/// signal; signals older than `max_age` are ignored.
pub struct JsonFileSignalSource {
    path: PathBuf,
    max_age: Duration,
}

impl JsonFileSignalSource {
    pub fn new(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
        }
    }
}

#[async_trait]
impl SignalSource for JsonFileSignalSource {
    async fn latest(&self) -> Result<Option<Signal>, TradingError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No signal file");
                return Ok(None);
            }
            Err(e) => {
                return Err(TradingError::Signal(format!("{}: {}", self.path.display(), e)))
            }
        };
        if text.trim().is_empty() {
            return Ok(None);
        }

        let signal: Signal = serde_json::from_str(&text)
            .map_err(|e| TradingError::Signal(format!("{}: {}", self.path.display(), e)))?;

        let age = Utc::now() - signal.generated_at;
        if age > self.max_age {
            warn!(
                symbol = %signal.symbol,
                age_minutes = age.num_minutes(),
                "Ignoring stale signal"
            );
            return Ok(None);
        }
        Ok(Some(signal))
    }
}

/// Always returns the same signal.
pub struct StaticSignalSource(pub Option<Signal>);

#[async_trait]
impl SignalSource for StaticSignalSource {
    async fn latest(&self) -> Result<Option<Signal>, TradingError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::types::Side;

    #[tokio::test]
    async fn test_reads_fresh_signal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signal.json");
        let signal = Signal::new("NIFTY", Side::Sell, 0.8);
        tokio::fs::write(&path, serde_json::to_string(&signal).unwrap())
            .await
            .unwrap();

        let source = JsonFileSignalSource::new(&path, Duration::minutes(30));
        assert_eq!(source.latest().await.unwrap(), Some(signal));
    }

    #[tokio::test]
    async fn test_stale_signal_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signal.json");
        let mut signal = Signal::new("NIFTY", Side::Buy, 0.9);
        signal.generated_at = Utc::now() - Duration::hours(2);
        tokio::fs::write(&path, serde_json::to_string(&signal).unwrap())
            .await
            .unwrap();

        let source = JsonFileSignalSource::new(&path, Duration::minutes(30));
        assert_eq!(source.latest().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signal.json");
        let source = JsonFileSignalSource::new(&path, Duration::minutes(30));
        assert_eq!(source.latest().await.unwrap(), None);

        tokio::fs::write(&path, "{\"symbol\":").await.unwrap();
        assert!(matches!(source.latest().await, Err(TradingError::Signal(_))));
    }
}
