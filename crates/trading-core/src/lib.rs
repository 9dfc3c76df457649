//! Core types and traits for the trading system.
//!
//! This crate provides the foundational building blocks including:
//! - Order, position, margin and quote types
//! - Credentials and trading signals
//! - The broker capability set, notification sink and signal source traits
//! - The error taxonomy shared by every crate

pub mod types;
pub mod traits;
pub mod error;

pub use error::{BrokerError, CredentialError, TradingError, TradingResult};
pub use types::*;
pub use traits::*;
