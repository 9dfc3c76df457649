//! Scripted broker for task tests.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard, PoisonError};
use trading_core::error::BrokerError;
use trading_core::traits::Broker;
use trading_core::types::{
    Exchange, Instrument, MarginSnapshot, OrderId, OrderRequest, Position, Quote,
};

#[derive(Default)]
struct Script {
    positions: Vec<Position>,
    available_margin: Option<Decimal>,
    price: Decimal,
    submitted: Vec<OrderRequest>,
    rejected_symbols: Vec<String>,
    fail_next: Option<BrokerError>,
    auth_failure: bool,
    positions_unavailable: bool,
    sequence: u32,
}

/// Broker whose answers are set by the test.
#[derive(Default)]
pub struct MockBroker {
    script: Mutex<Script>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_positions(&self, positions: Vec<Position>) {
        self.script().positions = positions;
    }

    pub fn set_margin(&self, available: Decimal) {
        self.script().available_margin = Some(available);
    }

    pub fn set_price(&self, price: Decimal) {
        self.script().price = price;
    }

    pub fn reject_orders_for(&self, symbol: &str) {
        self.script().rejected_symbols.push(symbol.to_string());
    }

    pub fn fail_next_order(&self, error: BrokerError) {
        self.script().fail_next = Some(error);
    }

    pub fn fail_auth(&self) {
        self.script().auth_failure = true;
    }

    pub fn fail_positions(&self, fail: bool) {
        self.script().positions_unavailable = fail;
    }

    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.script().submitted.clone()
    }

    fn check_auth(&self) -> Result<(), BrokerError> {
        if self.script().auth_failure {
            return Err(BrokerError::Authentication("session expired".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for MockBroker {
    async fn authenticate(&self) -> Result<(), BrokerError> {
        self.check_auth()
    }

    async fn deauthenticate(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn fetch_margin(&self) -> Result<MarginSnapshot, BrokerError> {
        self.check_auth()?;
        self.script()
            .available_margin
            .map(|available| MarginSnapshot::new(available, Decimal::ZERO))
            .ok_or_else(|| BrokerError::RemoteUnavailable("funds endpoint down".into()))
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, BrokerError> {
        self.check_auth()?;
        let script = self.script();
        if script.positions_unavailable {
            return Err(BrokerError::RemoteUnavailable("positions endpoint down".into()));
        }
        Ok(script.positions.clone())
    }

    async fn fetch_quote(&self, symbol: &str, exchange: Exchange) -> Result<Quote, BrokerError> {
        self.check_auth()?;
        Ok(Quote {
            symbol: symbol.to_string(),
            exchange,
            last_price: self.script().price,
            bid: None,
            ask: None,
            timestamp: Utc::now(),
        })
    }

    async fn submit_order(&self, request: OrderRequest) -> Result<OrderId, BrokerError> {
        self.check_auth()?;
        let mut script = self.script();
        script.submitted.push(request.clone());
        if let Some(error) = script.fail_next.take() {
            return Err(error);
        }
        if script.rejected_symbols.iter().any(|s| s == &request.symbol) {
            return Err(BrokerError::OrderRejected {
                reason: "RMS: margin exceeds".into(),
            });
        }
        script.sequence += 1;
        Ok(format!("ORD{:04}", script.sequence))
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn search_instrument(
        &self,
        _query: &str,
        _exchange: Exchange,
    ) -> Result<Vec<Instrument>, BrokerError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
