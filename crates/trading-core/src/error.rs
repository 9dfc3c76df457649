//! Error types for the trading system.

use thiserror::Error;

use crate::types::ServiceKind;

/// Top-level trading system error.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Signal error: {0}")]
    Signal(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Broker-specific errors.
///
/// The variants separate failures callers must treat differently: an
/// authentication failure stops work for one vendor, a remote fault is
/// transient and deferred to the next run, and a rejection is final.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Order rejected: {reason}")]
    OrderRejected { reason: String },

    #[error("Unknown broker: {0}")]
    UnknownBroker(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Not supported by this broker: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Credential store error: {0}")]
    Credentials(#[from] CredentialError),
}

impl BrokerError {
    /// Whether the failure is transient and the work may be retried on a later run.
    pub fn is_transient(&self) -> bool {
        matches!(self, BrokerError::RemoteUnavailable(_))
    }

    /// Short machine-friendly name of the error class, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            BrokerError::Authentication(_) => "auth_error",
            BrokerError::RemoteUnavailable(_) => "remote_unavailable",
            BrokerError::OrderRejected { .. } => "order_rejected",
            BrokerError::UnknownBroker(_) => "unknown_broker",
            BrokerError::InvalidOrder(_) => "invalid_order",
            BrokerError::Unsupported(_) => "unsupported",
            BrokerError::Configuration(_) => "configuration",
            BrokerError::Credentials(_) => "credentials",
        }
    }
}

/// Credential store errors.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("No credential '{name}' for service {service}")]
    NotFound { service: ServiceKind, name: String },

    #[error("Invalid credential field: {0}")]
    InvalidField(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for trading operations.
pub type TradingResult<T> = Result<T, TradingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BrokerError::RemoteUnavailable("timeout".into()).is_transient());
        assert!(!BrokerError::Authentication("expired".into()).is_transient());
        assert!(!BrokerError::OrderRejected { reason: "RMS".into() }.is_transient());
    }

    #[test]
    fn test_rejection_carries_reason() {
        let err = BrokerError::OrderRejected {
            reason: "Insufficient margin".to_string(),
        };
        assert_eq!(err.to_string(), "Order rejected: Insufficient margin");
        assert_eq!(err.kind(), "order_rejected");
    }
}
