//! Task state and its persistence between invocations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;
use trading_core::error::TradingError;
use trading_core::types::{Exchange, OrderId, Side};

/// Where a task is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Idle,
    Evaluating,
    OrderPending,
    Monitoring,
    Closing,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskState::Idle => "idle",
            TaskState::Evaluating => "evaluating",
            TaskState::OrderPending => "order_pending",
            TaskState::Monitoring => "monitoring",
            TaskState::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// The position the task opened and is watching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPosition {
    pub symbol: String,
    pub exchange: Exchange,
    pub side: Side,
    /// Units (lots × lot size)
    pub quantity: u32,
    pub lots: u32,
    pub order_id: OrderId,
    #[serde(default)]
    pub expiry: Option<NaiveDate>,
    pub opened_at: DateTime<Utc>,
}

/// Persistent part of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub state: TaskState,
    #[serde(default)]
    pub tracked: Option<TrackedPosition>,
}

/// JSON file holding a [`TaskSnapshot`].
///
/// Only resting states are worth saving; a process that dies mid-transition
/// restarts from what the broker reports.
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the snapshot. A missing file is an idle task.
    pub async fn load(&self) -> Result<TaskSnapshot, TradingError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TaskSnapshot::default()),
            Err(e) => return Err(self.error(e)),
        };
        if text.trim().is_empty() {
            return Ok(TaskSnapshot::default());
        }
        serde_json::from_str(&text).map_err(|e| self.error(e))
    }

    pub async fn save(&self, snapshot: &TaskSnapshot) -> Result<(), TradingError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| self.error(e))?;
        }
        let text = serde_json::to_string_pretty(snapshot).map_err(|e| self.error(e))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text).await.map_err(|e| self.error(e))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| self.error(e))?;
        debug!(path = %self.path.display(), state = %snapshot.state, "Saved task state");
        Ok(())
    }

    fn error(&self, e: impl std::fmt::Display) -> TradingError {
        TradingError::Config(format!("task state {}: {}", self.path.display(), e))
    }
}
