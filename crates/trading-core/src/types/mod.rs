//! Core data types for the trading system.

mod credential;
mod market;
mod order;
mod position;
mod signal;

pub use credential::{Credential, ServiceKind};
pub use market::{FeedTick, Instrument, Quote, IST_OFFSET_SECS, exchange_now};
pub use order::{Exchange, OptionRight, OrderId, OrderRequest, OrderType, ProductType, Side, Validity};
pub use position::{MarginSnapshot, Position};
pub use signal::Signal;
