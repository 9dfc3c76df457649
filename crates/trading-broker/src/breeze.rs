//! ICICI Direct Breeze integration.
//!
//! Breeze is a plain REST API. The daily API session key obtained from the
//! ICICI login page is exchanged once for a session token; every later call
//! is signed with `sha256(timestamp + body + secret)`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use trading_core::error::BrokerError;
use trading_core::traits::Broker;
use trading_core::types::{
    Exchange, Instrument, MarginSnapshot, OptionRight, OrderId, OrderRequest, OrderType, Position,
    ProductType, Quote, ServiceKind, Side, Validity,
};
use trading_credentials::{CredentialStore, SessionUpdate};

use crate::http::{date, decimal, decimal_or_zero, integer, read_json, text, transport, truncate};
use crate::load_credential;

/// Breeze API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreezeConfig {
    /// REST base URL
    pub base_url: String,
    /// Name of the stored credential to log in with
    pub credential: String,
    /// How long an exchanged session token stays valid
    pub session_ttl_hours: i64,
    /// Exchange code sent with cancellations
    pub cancel_exchange: Exchange,
}

impl Default for BreezeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.icicidirect.com/breezeapi/api/v1".to_string(),
            credential: "primary".to_string(),
            session_ttl_hours: 20,
            cancel_exchange: Exchange::Nfo,
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    app_key: String,
    secret: String,
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Breeze broker client.
pub struct BreezeBroker {
    config: BreezeConfig,
    store: Arc<dyn CredentialStore>,
    client: Client,
    session: RwLock<Option<Session>>,
}

impl BreezeBroker {
    /// Create a new Breeze client reading credentials from the given store.
    pub fn new(config: BreezeConfig, store: Arc<dyn CredentialStore>) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| BrokerError::Configuration(e.to_string()))?;

        Ok(Self {
            config,
            store,
            client,
            session: RwLock::new(None),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    /// The cached session unless it has expired. An expired one is dropped.
    async fn cached_session(&self, now: DateTime<Utc>) -> Option<Session> {
        let mut cached = self.session.write().await;
        match cached.as_ref() {
            Some(session) if session.is_live(now) => Some(session.clone()),
            Some(_) => {
                debug!(credential = %self.config.credential, "Breeze session expired");
                *cached = None;
                None
            }
            None => None,
        }
    }

    async fn session(&self) -> Result<Session, BrokerError> {
        if let Some(session) = self.cached_session(Utc::now()).await {
            return Ok(session);
        }
        self.authenticate().await?;
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| BrokerError::Authentication("Breeze session not established".into()))
    }

    /// Send a signed request and return the `Success` payload.
    async fn call(&self, method: Method, endpoint: &str, body: Value) -> Result<Value, BrokerError> {
        let envelope = self.signed(method, endpoint, body).await?;
        self.forget_rejected(success(&envelope).map_err(fault)).await
    }

    /// Send a signed request and return the raw response envelope.
    async fn signed(&self, method: Method, endpoint: &str, body: Value) -> Result<Value, BrokerError> {
        let session = self.session().await?;
        let payload = body.to_string();
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S.000Z").to_string();

        debug!(endpoint, %method, "Breeze request");

        let resp = self
            .client
            .request(method, self.url(endpoint))
            .header(CONTENT_TYPE, "application/json")
            .header(
                "X-Checksum",
                format!("token {}", checksum(&timestamp, &payload, &session.secret)),
            )
            .header("X-Timestamp", &timestamp)
            .header("X-AppKey", &session.app_key)
            .header("X-SessionToken", &session.token)
            .body(payload)
            .send()
            .await
            .map_err(transport)?;

        self.forget_rejected(read_json(resp).await).await
    }

    /// Drop a session the vendor no longer accepts so the next call logs in again.
    async fn forget_rejected<T>(&self, result: Result<T, BrokerError>) -> Result<T, BrokerError> {
        if let Err(BrokerError::Authentication(msg)) = &result {
            let name = &self.config.credential;
            warn!(credential = %name, error = %msg, "Breeze rejected the session; clearing it");
            *self.session.write().await = None;
            if let Err(e) = self.store.clear_session(ServiceKind::Breeze, name).await {
                warn!(credential = %name, error = %e, "Could not clear stored Breeze session");
            }
        }
        result
    }
}

#[async_trait]
impl Broker for BreezeBroker {
    async fn authenticate(&self) -> Result<(), BrokerError> {
        let name = &self.config.credential;
        let credential = load_credential(self.store.as_ref(), ServiceKind::Breeze, name).await?;
        if credential.api_key.is_empty() || credential.api_secret.is_empty() {
            return Err(BrokerError::Authentication(format!(
                "Breeze credential '{}' has no API key or secret",
                name
            )));
        }

        let now = Utc::now();
        if let Some(token) = credential.active_session(now) {
            *self.session.write().await = Some(Session {
                app_key: credential.api_key.clone(),
                secret: credential.api_secret.clone(),
                token: token.to_string(),
                expires_at: credential.session_expires_at,
            });
            debug!(credential = %name, "Reusing stored Breeze session");
            return Ok(());
        }
        if credential.session_expired(now) {
            self.store.clear_session(ServiceKind::Breeze, name).await?;
        }

        let api_session = credential
            .session_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                BrokerError::Authentication(format!(
                    "no API session key stored for Breeze credential '{}'",
                    name
                ))
            })?;

        let body = json!({ "SessionToken": api_session, "AppKey": credential.api_key });
        let resp = self
            .client
            .get(self.url("customerdetails"))
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(transport)?;

        let envelope = read_json(resp).await?;
        let details = success(&envelope).map_err(BrokerError::Authentication)?;
        let token = text(&details, "session_token").ok_or_else(|| {
            BrokerError::Authentication("customer details carried no session token".into())
        })?;
        let expires_at = now + Duration::hours(self.config.session_ttl_hours);

        self.store
            .update_session(
                ServiceKind::Breeze,
                name,
                SessionUpdate::new(&token).expiring_at(expires_at),
            )
            .await?;

        *self.session.write().await = Some(Session {
            app_key: credential.api_key,
            secret: credential.api_secret,
            token,
            expires_at: Some(expires_at),
        });
        info!(credential = %name, user = ?text(&details, "idirect_userid"), "Breeze session established");
        Ok(())
    }

    async fn deauthenticate(&self) -> Result<(), BrokerError> {
        // Breeze has no logout endpoint; the session simply lapses.
        *self.session.write().await = None;
        self.store
            .clear_session(ServiceKind::Breeze, &self.config.credential)
            .await?;
        info!(credential = %self.config.credential, "Breeze session cleared");
        Ok(())
    }

    async fn fetch_margin(&self) -> Result<MarginSnapshot, BrokerError> {
        let funds = self.call(Method::GET, "funds", json!({})).await?;
        parse_funds(&funds)
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, BrokerError> {
        let rows = self.call(Method::GET, "portfoliopositions", json!({})).await?;
        Ok(rows
            .as_array()
            .map(|rows| rows.iter().filter_map(parse_position).collect())
            .unwrap_or_default())
    }

    async fn fetch_quote(&self, symbol: &str, exchange: Exchange) -> Result<Quote, BrokerError> {
        let rows = self.call(Method::GET, "quotes", quote_body(symbol, exchange)).await?;
        let row = rows
            .as_array()
            .and_then(|rows| rows.first())
            .ok_or_else(|| BrokerError::RemoteUnavailable(format!("no quote for {}", symbol)))?;

        let last_price = decimal(row, "ltp")
            .ok_or_else(|| BrokerError::RemoteUnavailable(format!("quote for {} has no ltp", symbol)))?;
        Ok(Quote {
            symbol: symbol.to_string(),
            exchange,
            last_price,
            bid: decimal(row, "best_bid_price"),
            ask: decimal(row, "best_offer_price"),
            timestamp: Utc::now(),
        })
    }

    async fn submit_order(&self, request: OrderRequest) -> Result<OrderId, BrokerError> {
        request.validate()?;
        let body = order_body(&request);
        debug!("Submitting Breeze order: {}", body);

        let envelope = self.signed(Method::POST, "order", body).await?;
        let order_id = self.forget_rejected(placed_order(&envelope)).await?;
        info!(
            order_id = %order_id,
            "Breeze order placed: {} {} {}",
            request.side,
            request.quantity,
            request.symbol
        );
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let body = json!({
            "order_id": order_id,
            "exchange_code": self.config.cancel_exchange.as_str(),
        });
        self.call(Method::DELETE, "order", body).await?;
        info!(order_id, "Breeze order canceled");
        Ok(())
    }

    async fn search_instrument(
        &self,
        query: &str,
        exchange: Exchange,
    ) -> Result<Vec<Instrument>, BrokerError> {
        // Breeze has no search endpoint; a quote lookup by stock code lists
        // the matching contracts.
        let stock_code = query.trim().to_uppercase();
        let rows = match self.call(Method::GET, "quotes", quote_body(&stock_code, exchange)).await {
            Ok(rows) => rows,
            Err(BrokerError::RemoteUnavailable(msg)) if msg.to_lowercase().contains("no data") => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(e),
        };

        Ok(rows
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        let symbol = text(row, "stock_code").unwrap_or_else(|| stock_code.clone());
                        Instrument {
                            token: symbol.clone(),
                            name: text(row, "stock_name").unwrap_or_else(|| symbol.clone()),
                            symbol,
                            exchange,
                            lot_size: integer(row, "lot_size")
                                .and_then(|l| u32::try_from(l).ok())
                                .unwrap_or(1),
                            expiry: date(row, "expiry_date"),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "breeze"
    }
}

/// `hex(sha256(timestamp + body + secret))`, the value of the `X-Checksum` header.
pub(crate) fn checksum(timestamp: &str, body: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(body.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Unwrap the `{Success, Status, Error}` envelope.
fn success(envelope: &Value) -> Result<Value, String> {
    if let Some(error) = envelope.get("Error").filter(|e| !e.is_null()) {
        let msg = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        return Err(msg);
    }
    match envelope.get("Status").and_then(Value::as_i64) {
        Some(200) | None => Ok(envelope.get("Success").cloned().unwrap_or(Value::Null)),
        Some(status) => Err(format!("Breeze status {}", status)),
    }
}

/// Classify a vendor error message.
fn fault(msg: String) -> BrokerError {
    let lower = msg.to_lowercase();
    if lower.contains("session") || lower.contains("unauthori") || lower.contains("invalid user") {
        BrokerError::Authentication(msg)
    } else {
        BrokerError::RemoteUnavailable(msg)
    }
}

/// Order id from an order placement envelope.
///
/// A vendor refusal is final and becomes `OrderRejected` with the vendor's
/// text; a session fault stays an authentication failure.
fn placed_order(envelope: &Value) -> Result<OrderId, BrokerError> {
    let result = success(envelope).map_err(|reason| match fault(reason) {
        BrokerError::RemoteUnavailable(reason) => BrokerError::OrderRejected { reason },
        other => other,
    })?;
    text(&result, "order_id").ok_or_else(|| BrokerError::OrderRejected {
        reason: text(&result, "message").unwrap_or_else(|| "no order id returned".into()),
    })
}

fn exchange_code(exchange: Exchange) -> &'static str {
    exchange.as_str()
}

fn product(request: &OrderRequest) -> &'static str {
    if request.right.is_some() {
        "options"
    } else if request.exchange.is_derivative() {
        "futures"
    } else {
        match request.product_type {
            ProductType::Intraday => "margin",
            ProductType::Delivery | ProductType::Carryforward => "cash",
        }
    }
}

fn right(right: Option<OptionRight>) -> &'static str {
    match right {
        Some(OptionRight::Call) => "call",
        Some(OptionRight::Put) => "put",
        None => "others",
    }
}

fn expiry_stamp(request: &OrderRequest) -> String {
    request
        .expiry
        .map(|d| format!("{}T06:00:00.000Z", d.format("%Y-%m-%d")))
        .unwrap_or_default()
}

fn order_body(request: &OrderRequest) -> Value {
    let order_type = match request.order_type {
        OrderType::Market => "market",
        OrderType::Limit => "limit",
        OrderType::StopLoss | OrderType::StopLossMarket => "stoploss",
    };
    let price = |p: Option<Decimal>| p.map(|p| p.to_string()).unwrap_or_default();

    json!({
        "stock_code": request.symbol,
        "exchange_code": exchange_code(request.exchange),
        "product": product(request),
        "action": match request.side { Side::Buy => "buy", Side::Sell => "sell" },
        "order_type": order_type,
        "quantity": request.quantity.to_string(),
        "price": price(request.limit_price),
        "stoploss": price(request.trigger_price),
        "validity": match request.validity { Validity::Day => "day", Validity::Ioc => "ioc" },
        "disclosed_quantity": "0",
        "expiry_date": expiry_stamp(request),
        "right": right(request.right),
        "strike_price": request.strike_price.map(|s| s.to_string()).unwrap_or_else(|| "0".into()),
        "user_remark": "tradedesk",
    })
}

fn quote_body(symbol: &str, exchange: Exchange) -> Value {
    if exchange.is_derivative() {
        json!({
            "stock_code": symbol,
            "exchange_code": exchange_code(exchange),
            "product_type": "futures",
            "right": "others",
            "strike_price": "0",
        })
    } else {
        json!({
            "stock_code": symbol,
            "exchange_code": exchange_code(exchange),
            "product_type": "cash",
        })
    }
}

/// F&O funds: what is allocated to the segment minus what trades have blocked.
///
/// Without an allocation the margin is unknown, which is an error rather
/// than zero. A missing blocked amount means nothing is blocked.
fn parse_funds(funds: &Value) -> Result<MarginSnapshot, BrokerError> {
    let allocated = decimal(funds, "allocated_fno").ok_or_else(|| {
        BrokerError::RemoteUnavailable(format!(
            "funds response has no F&O allocation: {}",
            truncate(&funds.to_string(), 200)
        ))
    })?;
    let blocked = decimal_or_zero(funds, "block_by_trade_fno");
    Ok(MarginSnapshot::new(allocated - blocked, blocked))
}

fn parse_position(row: &Value) -> Option<Position> {
    let symbol = text(row, "stock_code")?;
    let quantity = integer(row, "quantity")?;
    let signed = match text(row, "action").map(|a| a.to_lowercase()).as_deref() {
        Some("sell") => -quantity.abs(),
        _ => quantity,
    };
    let average_price = decimal_or_zero(row, "average_price");
    let last_price = decimal(row, "ltp").unwrap_or(average_price);

    let mut position = Position::new(symbol, signed, average_price);
    position.exchange = text(row, "exchange_code")
        .and_then(|e| e.parse().ok())
        .unwrap_or_default();
    position.product = match text(row, "product_type").map(|p| p.to_lowercase()).as_deref() {
        Some("margin") => ProductType::Intraday,
        Some("cash") => ProductType::Delivery,
        _ => ProductType::Carryforward,
    };
    position.expiry = date(row, "expiry_date");
    position.right = match text(row, "right").map(|r| r.to_lowercase()).as_deref() {
        Some("call") => Some(OptionRight::Call),
        Some("put") => Some(OptionRight::Put),
        _ => None,
    };
    position.strike_price = position.right.and(decimal(row, "strike_price"));
    position.update_price(last_price);
    if let Some(pnl) = decimal(row, "pnl") {
        position.unrealized_pnl = pnl;
    }
    Some(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use trading_core::types::Credential;
    use trading_credentials::MemoryStore;

    fn broker(store: MemoryStore) -> BreezeBroker {
        BreezeBroker::new(BreezeConfig::default(), Arc::new(store)).unwrap()
    }

    #[test]
    fn test_checksum_vector() {
        assert_eq!(
            checksum("2026-01-15T09:20:00.000Z", "{}", "secret"),
            "8210855380605240589af4601e65b81ca1599d0f340a3841e7b4efaafbb51f44"
        );
    }

    #[test]
    fn test_envelope() {
        let ok = json!({"Success": {"order_id": "X1"}, "Status": 200, "Error": null});
        assert_eq!(success(&ok).unwrap()["order_id"], "X1");

        let err = json!({"Success": null, "Status": 500, "Error": "Insufficient balance"});
        assert_eq!(success(&err).unwrap_err(), "Insufficient balance");

        let status_only = json!({"Success": null, "Status": 401});
        assert!(success(&status_only).is_err());
    }

    #[test]
    fn test_fault_classification() {
        assert!(matches!(fault("Session key is expired".into()), BrokerError::Authentication(_)));
        assert!(matches!(fault("Service busy".into()), BrokerError::RemoteUnavailable(_)));
    }

    #[test]
    fn test_order_body_future() {
        let request = OrderRequest::market("NIFTY", Exchange::Nfo, Side::Sell, 75)
            .with_expiry(NaiveDate::from_ymd_opt(2026, 1, 27).unwrap());
        let body = order_body(&request);
        assert_eq!(body["product"], "futures");
        assert_eq!(body["action"], "sell");
        assert_eq!(body["quantity"], "75");
        assert_eq!(body["expiry_date"], "2026-01-27T06:00:00.000Z");
        assert_eq!(body["right"], "others");
    }

    #[test]
    fn test_order_body_option_limit() {
        let request = OrderRequest::limit("NIFTY", Exchange::Nfo, Side::Buy, 75, dec!(120.5))
            .with_option(dec!(24000), OptionRight::Put);
        let body = order_body(&request);
        assert_eq!(body["product"], "options");
        assert_eq!(body["order_type"], "limit");
        assert_eq!(body["price"], "120.5");
        assert_eq!(body["right"], "put");
        assert_eq!(body["strike_price"], "24000");
    }

    #[test]
    fn test_parse_funds() {
        let funds = json!({"allocated_fno": "500000.00", "block_by_trade_fno": 120000});
        let margin = parse_funds(&funds).unwrap();
        assert_eq!(margin.available_margin, dec!(380000));
        assert_eq!(margin.used_margin, dec!(120000));
    }

    #[test]
    fn test_parse_funds_without_allocation_is_unknown() {
        for funds in [Value::Null, json!({}), json!({"allocated_fno": null, "block_by_trade_fno": "0"})] {
            assert!(matches!(parse_funds(&funds), Err(BrokerError::RemoteUnavailable(_))));
        }
    }

    #[test]
    fn test_placed_order() {
        let ok = json!({"Success": {"order_id": "20260115N100001"}, "Status": 200, "Error": null});
        assert_eq!(placed_order(&ok).unwrap(), "20260115N100001");

        let refused = json!({"Success": null, "Status": 500, "Error": "Insufficient margin"});
        match placed_order(&refused).unwrap_err() {
            BrokerError::OrderRejected { reason } => assert_eq!(reason, "Insufficient margin"),
            other => panic!("unexpected error: {:?}", other),
        }

        let expired = json!({"Success": null, "Status": 401, "Error": "Session key is expired"});
        assert!(matches!(placed_order(&expired), Err(BrokerError::Authentication(_))));

        let no_id = json!({"Success": {"message": "Order queued"}, "Status": 200, "Error": null});
        match placed_order(&no_id).unwrap_err() {
            BrokerError::OrderRejected { reason } => assert_eq!(reason, "Order queued"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_short_position() {
        let row = json!({
            "stock_code": "NIFTY",
            "exchange_code": "NFO",
            "product_type": "futures",
            "action": "Sell",
            "quantity": "75",
            "average_price": "24000",
            "ltp": "24100",
            "expiry_date": "27-Jan-2026",
            "right": "Others",
        });
        let position = parse_position(&row).unwrap();
        assert_eq!(position.net_quantity, -75);
        assert_eq!(position.unrealized_pnl, dec!(-7500));
        assert_eq!(position.product, ProductType::Carryforward);
        assert_eq!(position.expiry, NaiveDate::from_ymd_opt(2026, 1, 27));
        assert!(position.right.is_none());
    }

    #[tokio::test]
    async fn test_authenticate_without_credential() {
        let err = broker(MemoryStore::new()).authenticate().await.unwrap_err();
        assert!(matches!(err, BrokerError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_authenticate_without_session_key() {
        let store = MemoryStore::with_credentials([
            Credential::new(ServiceKind::Breeze, "primary").with_api_key("app", "secret"),
        ]);
        let err = broker(store).authenticate().await.unwrap_err();
        match err {
            BrokerError::Authentication(msg) => assert!(msg.contains("no API session key")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_authenticate_reuses_stored_session() {
        let mut credential =
            Credential::new(ServiceKind::Breeze, "primary").with_api_key("app", "secret");
        credential.session_token = Some("stored-token".into());
        credential.session_expires_at = Some(Utc::now() + Duration::hours(1));

        let broker = broker(MemoryStore::with_credentials([credential]));
        broker.authenticate().await.unwrap();
        assert_eq!(broker.session().await.unwrap().token, "stored-token");
    }

    #[tokio::test]
    async fn test_cached_session_expires() {
        let now = Utc::now();
        let mut credential =
            Credential::new(ServiceKind::Breeze, "primary").with_api_key("app", "secret");
        credential.session_token = Some("day1-token".into());
        credential.session_expires_at = Some(now + Duration::hours(1));

        let broker = broker(MemoryStore::with_credentials([credential]));
        broker.authenticate().await.unwrap();
        assert_eq!(broker.cached_session(now).await.unwrap().token, "day1-token");

        // The next day the cached token is gone rather than reused.
        assert!(broker.cached_session(now + Duration::hours(20)).await.is_none());
        assert!(broker.cached_session(now).await.is_none());
    }

    #[tokio::test]
    async fn test_rejected_session_is_forgotten() {
        let mut credential =
            Credential::new(ServiceKind::Breeze, "primary").with_api_key("app", "secret");
        credential.session_token = Some("day1-token".into());
        credential.session_expires_at = Some(Utc::now() + Duration::hours(1));
        let store = Arc::new(MemoryStore::with_credentials([credential]));

        let broker = BreezeBroker::new(BreezeConfig::default(), store.clone()).unwrap();
        broker.authenticate().await.unwrap();

        // Other failures keep the session.
        let busy: Result<(), _> = Err(BrokerError::RemoteUnavailable("Service busy".into()));
        assert!(broker.forget_rejected(busy).await.is_err());
        assert!(broker.cached_session(Utc::now()).await.is_some());

        let rejected: Result<(), _> = Err(BrokerError::Authentication("Session key is expired".into()));
        assert!(broker.forget_rejected(rejected).await.is_err());
        assert!(broker.cached_session(Utc::now()).await.is_none());
        let stored = store.get(ServiceKind::Breeze, "primary").await.unwrap();
        assert!(stored.session_token.is_none());
    }

    #[tokio::test]
    async fn test_deauthenticate_clears_store() {
        let mut credential =
            Credential::new(ServiceKind::Breeze, "primary").with_api_key("app", "secret");
        credential.session_token = Some("stored-token".into());
        let store = Arc::new(MemoryStore::with_credentials([credential]));

        let broker = BreezeBroker::new(BreezeConfig::default(), store.clone()).unwrap();
        broker.authenticate().await.unwrap();
        broker.deauthenticate().await.unwrap();

        let stored = store.get(ServiceKind::Breeze, "primary").await.unwrap();
        assert!(stored.session_token.is_none());
    }
}
