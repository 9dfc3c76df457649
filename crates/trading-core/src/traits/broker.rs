//! Broker trait definition.

use crate::error::BrokerError;
use crate::types::{
    Exchange, FeedTick, Instrument, MarginSnapshot, OrderId, OrderRequest, Position, Quote,
};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// The broker capability set.
///
/// One implementation per vendor; callers only ever hold `Arc<dyn Broker>`
/// handed out by the broker factory. Every call is a single round trip to
/// the vendor: no retries, no caching.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Establish a vendor session from the stored credential.
    ///
    /// Fails with [`BrokerError::Authentication`] when the credential is
    /// absent, expired or rejected. On success the session artifact is
    /// written back to the credential store.
    async fn authenticate(&self) -> Result<(), BrokerError>;

    /// End the vendor session and clear the stored session token.
    async fn deauthenticate(&self) -> Result<(), BrokerError>;

    /// Get available and used funds.
    ///
    /// A failure here means the margin is unknown. It must never be read as zero.
    async fn fetch_margin(&self) -> Result<MarginSnapshot, BrokerError>;

    /// Get all positions. An empty vector means no open positions.
    async fn fetch_positions(&self) -> Result<Vec<Position>, BrokerError>;

    /// Get a quote for one instrument.
    async fn fetch_quote(&self, symbol: &str, exchange: Exchange) -> Result<Quote, BrokerError>;

    /// Submit a new order.
    ///
    /// # Returns
    /// The vendor order identifier. A vendor refusal is reported as
    /// [`BrokerError::OrderRejected`] carrying the vendor's reason text.
    async fn submit_order(&self, request: OrderRequest) -> Result<OrderId, BrokerError>;

    /// Cancel an existing order.
    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError>;

    /// Look up instruments by name or symbol fragment.
    async fn search_instrument(
        &self,
        query: &str,
        exchange: Exchange,
    ) -> Result<Vec<Instrument>, BrokerError>;

    /// Subscribe to streaming ticks for the given vendor instrument tokens.
    ///
    /// Vendors without a streaming feed return [`BrokerError::Unsupported`].
    async fn subscribe_feed(
        &self,
        tokens: &[String],
    ) -> Result<mpsc::Receiver<FeedTick>, BrokerError> {
        let _ = tokens;
        Err(BrokerError::Unsupported(format!("{} has no streaming feed", self.name())))
    }

    /// Open positions only.
    async fn open_positions(&self) -> Result<Vec<Position>, BrokerError> {
        let positions = self.fetch_positions().await?;
        Ok(positions.into_iter().filter(|p| !p.is_flat()).collect())
    }

    /// Get the broker name.
    fn name(&self) -> &str;
}
