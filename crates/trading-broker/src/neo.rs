//! Kotak Securities Neo integration.
//!
//! Login is three steps: an OAuth client-credentials grant for the API
//! gateway, a mobile/password login that yields a view token and sid, and
//! an MPIN validation that upgrades it to a trade token. Order and portfolio
//! calls post a `jData` form field carrying the JSON payload.

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::{SinkExt, StreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use trading_core::error::BrokerError;
use trading_core::traits::Broker;
use trading_core::types::{
    Exchange, FeedTick, Instrument, MarginSnapshot, OptionRight, OrderId, OrderRequest, OrderType,
    Position, ProductType, Quote, ServiceKind, Side, Validity,
};
use trading_credentials::{CredentialStore, SessionUpdate};

use crate::http::{date, decimal, decimal_or_zero, integer, read_json, text, transport, truncate};
use crate::load_credential;

const FIN_KEY: &str = "neotradeapi";

/// Neo API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeoConfig {
    /// OAuth token endpoint of the API gateway
    pub oauth_url: String,
    /// Login and MPIN validation endpoint
    pub login_url: String,
    /// Logout endpoint
    pub logout_url: String,
    /// Base of the order and portfolio API
    pub api_base: String,
    /// Quote lookup endpoint
    pub quotes_url: String,
    /// Scrip search endpoint
    pub search_url: String,
    /// Streaming feed endpoint
    pub feed_url: String,
    /// Name of the stored credential to log in with
    pub credential: String,
    /// How long a trade token stays valid
    pub session_ttl_hours: i64,
}

impl Default for NeoConfig {
    fn default() -> Self {
        Self {
            oauth_url: "https://napi.kotaksecurities.com/oauth2/token".to_string(),
            login_url: "https://gw-napi.kotaksecurities.com/login/1.0/login/v2/validate"
                .to_string(),
            logout_url: "https://gw-napi.kotaksecurities.com/login/1.0/logout".to_string(),
            api_base: "https://gw-napi.kotaksecurities.com/Orders/2.0/quick".to_string(),
            quotes_url: "https://gw-napi.kotaksecurities.com/apim/quotes/1.0/quotes/neosymbol"
                .to_string(),
            search_url: "https://gw-napi.kotaksecurities.com/Files/1.0/masterscrip/search"
                .to_string(),
            feed_url: "wss://mlhsm.kotaksecurities.com".to_string(),
            credential: "primary".to_string(),
            session_ttl_hours: 20,
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    access_token: String,
    token: String,
    sid: String,
    server_id: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Neo broker client.
pub struct NeoBroker {
    config: NeoConfig,
    store: Arc<dyn CredentialStore>,
    client: Client,
    session: RwLock<Option<Session>>,
}

impl NeoBroker {
    /// Create a new Neo client reading credentials from the given store.
    pub fn new(config: NeoConfig, store: Arc<dyn CredentialStore>) -> Result<Self, BrokerError> {
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

    /// The cached session unless it has expired. An expired one is dropped.
    async fn cached_session(&self, now: DateTime<Utc>) -> Option<Session> {
        let mut cached = self.session.write().await;
        match cached.as_ref() {
            Some(session) if session.is_live(now) => Some(session.clone()),
            Some(_) => {
                debug!(credential = %self.config.credential, "Neo session expired");
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
            .ok_or_else(|| BrokerError::Authentication("Neo session not established".into()))
    }

    async fn access_token(&self, key: &str, secret: &str) -> Result<String, BrokerError> {
        let resp = self
            .client
            .post(&self.config.oauth_url)
            .header(AUTHORIZATION, basic_auth(key, secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(transport)?;

        let body = read_json(resp).await?;
        text(&body, "access_token").ok_or_else(|| {
            BrokerError::Authentication(format!(
                "OAuth grant returned no access token: {}",
                truncate(&body.to_string(), 200)
            ))
        })
    }

    async fn validate(
        &self,
        access_token: &str,
        extra: &[(&str, &str)],
        body: Value,
    ) -> Result<Value, BrokerError> {
        let mut request = self
            .client
            .post(&self.config.login_url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .header(CONTENT_TYPE, "application/json")
            .json(&body);
        for (name, value) in extra {
            request = request.header(*name, *value);
        }

        let resp = request.send().await.map_err(transport)?;
        let body = read_json(resp).await?;
        if let Some(msg) = vendor_error(&body) {
            return Err(BrokerError::Authentication(msg));
        }
        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    fn trade_request(&self, session: &Session, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header(AUTHORIZATION, format!("Bearer {}", session.access_token))
            .header("Sid", &session.sid)
            .header("Auth", &session.token)
            .header("neo-fin-key", FIN_KEY)
            .header("accept", "application/json");
        match &session.server_id {
            Some(id) => request.query(&[("sId", id)]),
            None => request,
        }
    }

    /// Post a `jData` form to the order API.
    async fn post(&self, endpoint: &str, data: Value) -> Result<Value, BrokerError> {
        let session = self.session().await?;
        debug!(endpoint, "Neo request");
        let request = self
            .client
            .post(format!("{}{}", self.config.api_base, endpoint))
            .form(&[("jData", data.to_string())]);
        let resp = self
            .trade_request(&session, request)
            .send()
            .await
            .map_err(transport)?;
        self.checked(read_json(resp).await).await
    }

    async fn get(&self, url: String) -> Result<Value, BrokerError> {
        let session = self.session().await?;
        debug!(%url, "Neo request");
        let resp = self
            .trade_request(&session, self.client.get(url))
            .send()
            .await
            .map_err(transport)?;
        self.checked(read_json(resp).await).await
    }

    /// Turn a body reporting a session fault into an authentication error
    /// and forget the session. Other vendor errors are left to the caller.
    async fn checked(&self, result: Result<Value, BrokerError>) -> Result<Value, BrokerError> {
        let result = match result {
            Ok(body) => match vendor_error(&body).map(fault) {
                Some(err @ BrokerError::Authentication(_)) => Err(err),
                _ => Ok(body),
            },
            Err(e) => Err(e),
        };
        self.forget_rejected(result).await
    }

    /// Drop a session the vendor no longer accepts so the next call logs in again.
    async fn forget_rejected<T>(&self, result: Result<T, BrokerError>) -> Result<T, BrokerError> {
        if let Err(BrokerError::Authentication(msg)) = &result {
            let name = &self.config.credential;
            warn!(credential = %name, error = %msg, "Neo rejected the session; clearing it");
            *self.session.write().await = None;
            if let Err(e) = self.store.clear_session(ServiceKind::Neo, name).await {
                warn!(credential = %name, error = %e, "Could not clear stored Neo session");
            }
        }
        result
    }
}

#[async_trait]
impl Broker for NeoBroker {
    async fn authenticate(&self) -> Result<(), BrokerError> {
        let name = &self.config.credential;
        let credential = load_credential(self.store.as_ref(), ServiceKind::Neo, name).await?;
        if credential.api_key.is_empty() || credential.api_secret.is_empty() {
            return Err(BrokerError::Authentication(format!(
                "Neo credential '{}' has no consumer key or secret",
                name
            )));
        }

        let now = Utc::now();
        if credential.session_expired(now) {
            self.store.clear_session(ServiceKind::Neo, name).await?;
        }

        let reusable = credential
            .active_session(now)
            .map(str::to_string)
            .zip(credential.session_id.clone());

        let (mobile, password, mpin) = match (
            credential.username.as_deref(),
            credential.password.as_deref(),
            credential.secondary_pin.as_deref(),
        ) {
            (Some(m), Some(p), Some(pin)) => (m, p, pin),
            _ if reusable.is_some() => ("", "", ""),
            _ => {
                return Err(BrokerError::Authentication(format!(
                    "Neo credential '{}' needs mobile number, password and MPIN",
                    name
                )))
            }
        };

        let access_token = self
            .access_token(&credential.api_key, &credential.api_secret)
            .await?;

        if let Some((token, sid)) = reusable {
            *self.session.write().await = Some(Session {
                access_token,
                token,
                sid,
                server_id: None,
                expires_at: credential.session_expires_at,
            });
            debug!(credential = %name, "Reusing stored Neo session");
            return Ok(());
        }

        let view = self
            .validate(
                &access_token,
                &[],
                json!({ "mobileNumber": mobile, "password": password }),
            )
            .await?;
        let view_token = text(&view, "token")
            .ok_or_else(|| BrokerError::Authentication("login returned no view token".into()))?;
        let view_sid = text(&view, "sid")
            .ok_or_else(|| BrokerError::Authentication("login returned no sid".into()))?;
        let user_id = jwt_subject(&view_token)
            .ok_or_else(|| BrokerError::Authentication("view token carries no user id".into()))?;

        let trade = self
            .validate(
                &access_token,
                &[("sid", view_sid.as_str()), ("Auth", view_token.as_str())],
                json!({ "userId": user_id, "mpin": mpin }),
            )
            .await?;
        let token = text(&trade, "token")
            .ok_or_else(|| BrokerError::Authentication("MPIN validation returned no token".into()))?;
        let sid = text(&trade, "sid").unwrap_or(view_sid);
        let server_id = text(&trade, "hsServerId");
        let expires_at = now + Duration::hours(self.config.session_ttl_hours);

        self.store
            .update_session(
                ServiceKind::Neo,
                name,
                SessionUpdate::new(&token)
                    .with_session_id(&sid)
                    .expiring_at(expires_at),
            )
            .await?;

        *self.session.write().await = Some(Session {
            access_token,
            token,
            sid,
            server_id,
            expires_at: Some(expires_at),
        });
        info!(credential = %name, user = %user_id, "Neo session established");
        Ok(())
    }

    async fn deauthenticate(&self) -> Result<(), BrokerError> {
        let session = self.session.write().await.take();
        if let Some(session) = session {
            let request = self.client.post(&self.config.logout_url);
            match self.trade_request(&session, request).send().await {
                Ok(resp) if resp.status().is_success() => debug!("Neo logout acknowledged"),
                Ok(resp) => warn!(status = %resp.status(), "Neo logout not acknowledged"),
                Err(e) => warn!(error = %e, "Neo logout request failed"),
            }
        }
        self.store
            .clear_session(ServiceKind::Neo, &self.config.credential)
            .await?;
        info!(credential = %self.config.credential, "Neo session cleared");
        Ok(())
    }

    async fn fetch_margin(&self) -> Result<MarginSnapshot, BrokerError> {
        let body = self
            .post("/user/limits", json!({ "seg": "ALL", "exch": "ALL", "prod": "ALL" }))
            .await?;
        if let Some(msg) = vendor_error(&body) {
            return Err(fault(msg));
        }
        parse_limits(&body)
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, BrokerError> {
        let body = self.get(format!("{}/user/positions", self.config.api_base)).await?;
        if let Some(msg) = vendor_error(&body) {
            // An account with no positions reports "No Data".
            if msg.to_lowercase().contains("no data") {
                return Ok(Vec::new());
            }
            return Err(fault(msg));
        }
        Ok(body
            .get("data")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().filter_map(parse_position).collect())
            .unwrap_or_default())
    }

    async fn fetch_quote(&self, symbol: &str, exchange: Exchange) -> Result<Quote, BrokerError> {
        let url = format!("{}/{}|{}/all", self.config.quotes_url, segment(exchange), symbol);
        let body = self.get(url).await?;
        if let Some(msg) = vendor_error(&body) {
            return Err(fault(msg));
        }
        let row = body
            .as_array()
            .and_then(|rows| rows.first())
            .or_else(|| body.get("message").and_then(Value::as_array).and_then(|r| r.first()))
            .ok_or_else(|| BrokerError::RemoteUnavailable(format!("no quote for {}", symbol)))?;
        parse_quote(row, symbol, exchange)
            .ok_or_else(|| BrokerError::RemoteUnavailable(format!("quote for {} has no ltp", symbol)))
    }

    async fn submit_order(&self, request: OrderRequest) -> Result<OrderId, BrokerError> {
        request.validate()?;
        let data = order_data(&request);
        debug!("Submitting Neo order: {}", data);

        let body = self.post("/order/rule/ms/place", data).await?;
        let order_id = placed_order(&body)?;
        info!(
            order_id = %order_id,
            "Neo order placed: {} {} {}",
            request.side,
            request.quantity,
            request.symbol
        );
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let body = self
            .post("/order/cancel", json!({ "on": order_id, "am": "NO" }))
            .await?;
        if let Some(msg) = vendor_error(&body) {
            return Err(match fault(msg) {
                BrokerError::RemoteUnavailable(reason) => BrokerError::OrderRejected { reason },
                other => other,
            });
        }
        info!(order_id, "Neo order canceled");
        Ok(())
    }

    async fn search_instrument(
        &self,
        query: &str,
        exchange: Exchange,
    ) -> Result<Vec<Instrument>, BrokerError> {
        let url = format!(
            "{}?exchange_segment={}&symbol={}",
            self.config.search_url,
            segment(exchange),
            query.trim().to_uppercase()
        );
        let body = self.get(url).await?;
        if let Some(msg) = vendor_error(&body) {
            if msg.to_lowercase().contains("no data") {
                return Ok(Vec::new());
            }
            return Err(fault(msg));
        }
        let rows = body.get("data").unwrap_or(&body);
        Ok(rows
            .as_array()
            .map(|rows| rows.iter().filter_map(|r| parse_instrument(r, exchange)).collect())
            .unwrap_or_default())
    }

    async fn subscribe_feed(
        &self,
        tokens: &[String],
    ) -> Result<mpsc::Receiver<FeedTick>, BrokerError> {
        if tokens.is_empty() {
            return Err(BrokerError::InvalidOrder("no instrument tokens to subscribe".into()));
        }
        let session = self.session().await?;

        let (ws, _) = connect_async(self.config.feed_url.as_str())
            .await
            .map_err(|e| BrokerError::RemoteUnavailable(format!("feed connect failed: {}", e)))?;
        let (mut write, mut read) = ws.split();

        let connect = json!({ "type": "cn", "Authorization": session.token, "Sid": session.sid });
        let subscribe = json!({ "type": "mws", "scrips": tokens.join("&"), "channelnum": 1 });
        for frame in [connect, subscribe] {
            write
                .send(Message::Text(frame.to_string()))
                .await
                .map_err(|e| BrokerError::RemoteUnavailable(format!("feed send failed: {}", e)))?;
        }
        info!(count = tokens.len(), "Subscribed to Neo feed");

        let (tx, rx) = mpsc::channel(1024);
        tokio::spawn(async move {
            // Keep the sink alive for as long as the reader runs.
            let _write = write;
            while let Some(msg) = read.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "Neo feed read failed");
                        break;
                    }
                };
                for tick in parse_ticks(&text) {
                    if tx.send(tick).await.is_err() {
                        debug!("Feed receiver dropped; closing Neo feed");
                        return;
                    }
                }
            }
            info!("Neo feed closed");
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        "neo"
    }
}

fn basic_auth(key: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", key, secret)))
}

/// The `sub` claim of a JWT, without verifying the signature.
fn jwt_subject(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    text(&claims, "sub")
}

/// Error text when the body reports a failure.
fn vendor_error(body: &Value) -> Option<String> {
    let failed = matches!(text(body, "stat").as_deref(), Some(s) if s.eq_ignore_ascii_case("not_ok"))
        || body.get("error").is_some_and(|e| !e.is_null());
    if !failed {
        return None;
    }
    let msg = text(body, "errMsg")
        .or_else(|| text(body, "emsg"))
        .or_else(|| {
            body.get("error")
                .and_then(Value::as_array)
                .and_then(|errs| errs.first())
                .and_then(|e| text(e, "message"))
        })
        .unwrap_or_else(|| truncate(&body.to_string(), 200).to_string());
    Some(msg)
}

fn fault(msg: String) -> BrokerError {
    let lower = msg.to_lowercase();
    if lower.contains("session") || lower.contains("token") || lower.contains("unauthori") {
        BrokerError::Authentication(msg)
    } else {
        BrokerError::RemoteUnavailable(msg)
    }
}

/// Order number from an order placement response.
///
/// A vendor refusal is final and becomes `OrderRejected` with the vendor's
/// text; a session fault stays an authentication failure.
fn placed_order(body: &Value) -> Result<OrderId, BrokerError> {
    if let Some(reason) = vendor_error(body) {
        return Err(match fault(reason) {
            BrokerError::RemoteUnavailable(reason) => BrokerError::OrderRejected { reason },
            other => other,
        });
    }
    text(body, "nOrdNo").ok_or_else(|| BrokerError::OrderRejected {
        reason: "no order number returned".into(),
    })
}

fn segment(exchange: Exchange) -> &'static str {
    match exchange {
        Exchange::Nse => "nse_cm",
        Exchange::Bse => "bse_cm",
        Exchange::Nfo => "nse_fo",
        Exchange::Bfo => "bse_fo",
    }
}

fn product_code(product: ProductType) -> &'static str {
    match product {
        ProductType::Intraday => "MIS",
        ProductType::Delivery => "CNC",
        ProductType::Carryforward => "NRML",
    }
}

fn order_data(request: &OrderRequest) -> Value {
    let price = |p: Option<Decimal>| p.map(|p| p.to_string()).unwrap_or_else(|| "0".into());
    json!({
        "am": "NO",
        "dq": "0",
        "es": segment(request.exchange),
        "mp": "0",
        "pc": product_code(request.product_type),
        "pf": "N",
        "pr": price(request.limit_price),
        "pt": match request.order_type {
            OrderType::Market => "MKT",
            OrderType::Limit => "L",
            OrderType::StopLoss => "SL",
            OrderType::StopLossMarket => "SL-M",
        },
        "qt": request.quantity.to_string(),
        "rt": match request.validity { Validity::Day => "DAY", Validity::Ioc => "IOC" },
        "tp": price(request.trigger_price),
        "ts": request.symbol,
        "tt": match request.side { Side::Buy => "B", Side::Sell => "S" },
    })
}

/// Available margin is `Net`. Without it the margin is unknown, which is an
/// error rather than zero.
fn parse_limits(body: &Value) -> Result<MarginSnapshot, BrokerError> {
    let net = decimal(body, "Net").ok_or_else(|| {
        BrokerError::RemoteUnavailable(format!(
            "limits response has no Net margin: {}",
            truncate(&body.to_string(), 200)
        ))
    })?;
    Ok(MarginSnapshot::new(net, decimal_or_zero(body, "MarginUsed")))
}

fn parse_position(row: &Value) -> Option<Position> {
    let symbol = text(row, "trdSym")?;
    let qty = |key| integer(row, key).unwrap_or(0);
    let bought = qty("flBuyQty") + qty("cfBuyQty");
    let sold = qty("flSellQty") + qty("cfSellQty");
    let buy_amount = decimal_or_zero(row, "buyAmt") + decimal_or_zero(row, "cfBuyAmt");
    let sell_amount = decimal_or_zero(row, "sellAmt") + decimal_or_zero(row, "cfSellAmt");
    let net = bought - sold;

    let average_price = if net > 0 && bought > 0 {
        buy_amount / Decimal::from(bought)
    } else if net < 0 && sold > 0 {
        sell_amount / Decimal::from(sold)
    } else {
        Decimal::ZERO
    };
    let last_price = decimal(row, "ltp").unwrap_or(average_price);

    let mut position = Position::new(symbol, net, average_price.round_dp(4));
    position.exchange = text(row, "exSeg").and_then(|s| s.parse().ok()).unwrap_or_default();
    position.product = match text(row, "prod").as_deref() {
        Some("MIS") => ProductType::Intraday,
        Some("CNC") => ProductType::Delivery,
        _ => ProductType::Carryforward,
    };
    position.right = match text(row, "optTp").as_deref() {
        Some("CE") => Some(OptionRight::Call),
        Some("PE") => Some(OptionRight::Put),
        _ => None,
    };
    position.strike_price = position.right.and(decimal(row, "stkPrc"));
    position.expiry = date(row, "expDt").or_else(|| expiry_text(row));
    position.update_price(last_price);

    // Total P&L is cash flow plus the open quantity marked to market.
    let total = sell_amount - buy_amount + Decimal::from(net) * last_price;
    position.realized_pnl = (total - position.unrealized_pnl).round_dp(2);
    Some(position)
}

/// Neo also reports expiries as `27 Jan, 2026`.
fn expiry_text(row: &Value) -> Option<NaiveDate> {
    let raw = text(row, "expDt")?;
    NaiveDate::parse_from_str(&raw, "%d %b, %Y").ok()
}

fn parse_quote(row: &Value, symbol: &str, exchange: Exchange) -> Option<Quote> {
    let last_price = decimal(row, "ltp").or_else(|| decimal(row, "last_traded_price"))?;
    let best = |side: &str| {
        row.get("depth")
            .and_then(|d| d.get(side))
            .and_then(Value::as_array)
            .and_then(|levels| levels.first())
            .and_then(|level| decimal(level, "price"))
    };
    Some(Quote {
        symbol: symbol.to_string(),
        exchange,
        last_price,
        bid: best("buy"),
        ask: best("sell"),
        timestamp: Utc::now(),
    })
}

fn parse_instrument(row: &Value, exchange: Exchange) -> Option<Instrument> {
    let token = text(row, "pSymbol")?;
    let symbol = text(row, "pTrdSymbol").unwrap_or_else(|| token.clone());
    Some(Instrument {
        name: text(row, "pSymbolName").unwrap_or_else(|| symbol.clone()),
        symbol,
        exchange,
        token,
        lot_size: integer(row, "lLotSize")
            .and_then(|l| u32::try_from(l).ok())
            .filter(|l| *l > 0)
            .unwrap_or(1),
        expiry: date(row, "pExpiryDate").or_else(|| expiry_text(row)),
    })
}

/// Parse a feed frame. Frames are either one tick object or an array of them.
fn parse_ticks(frame: &str) -> Vec<FeedTick> {
    let value: Value = match serde_json::from_str(frame) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let rows = match value {
        Value::Array(rows) => rows,
        other => vec![other],
    };
    rows.iter()
        .filter_map(|row| {
            Some(FeedTick {
                token: text(row, "tk")?,
                last_price: decimal(row, "ltp")?,
                volume: integer(row, "v").and_then(|v| u64::try_from(v).ok()),
                timestamp: Utc::now(),
            })
        })
        .collect()
}
