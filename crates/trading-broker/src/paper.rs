//! Paper trading broker for dry runs and tests.
//!
//! Prices come from `[brokers.paper.prices]` and from [`PaperBroker::set_price`].
//! With `book_file` set, positions and resting orders are written after every
//! change and reloaded on the next start, so single-shot commands (`open`,
//! `monitor`, `close`) see each other's fills. Without it the book lives only
//! as long as the process, which suits `run`.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use trading_core::error::BrokerError;
use trading_core::traits::Broker;
use trading_core::types::{
    Exchange, Instrument, MarginSnapshot, OrderId, OrderRequest, OrderType, Position, Quote, Side,
};
use uuid::Uuid;

/// Paper broker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    /// Starting funds
    pub initial_capital: Decimal,
    /// Margin blocked per unit of position value
    pub margin_rate: Decimal,
    /// Slippage applied to market fills, in percent
    pub slippage_pct: Decimal,
    /// Lot size reported for every instrument
    pub lot_size: u32,
    /// Last prices by symbol, applied on every start
    pub prices: BTreeMap<String, Decimal>,
    /// Where the book is kept between runs
    pub book_file: Option<PathBuf>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(1000000),
            margin_rate: dec!(0.10),
            slippage_pct: Decimal::ZERO,
            lot_size: 75,
            prices: BTreeMap::new(),
            book_file: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Book {
    prices: HashMap<String, Decimal>,
    positions: HashMap<String, Position>,
    resting: HashMap<OrderId, OrderRequest>,
    filled: Vec<OrderId>,
    realized: Decimal,
}

/// Paper trading broker. Market orders fill immediately at the last set price.
pub struct PaperBroker {
    config: PaperConfig,
    book: Mutex<Book>,
}

impl PaperBroker {
    /// Empty book with the configured prices. `book_file` is not read.
    pub fn new(config: PaperConfig) -> Self {
        let mut book = Book::default();
        book.mark(&config.prices);
        Self {
            config,
            book: Mutex::new(book),
        }
    }

    /// Broker with the book saved in `book_file`, if any, marked to the
    /// configured prices.
    pub fn open(config: PaperConfig) -> Result<Self, BrokerError> {
        let mut book = match &config.book_file {
            Some(path) => load_book(path)?,
            None => Book::default(),
        };
        book.mark(&config.prices);
        Ok(Self {
            config,
            book: Mutex::new(book),
        })
    }

    /// Set the last price of a symbol and mark open positions to it.
    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        let mut book = self.book.lock().await;
        book.mark_one(symbol, price);
        self.persist(&book).await;
    }

    /// Write the book to `book_file`. The in-memory book stays authoritative
    /// for this process, so a failed write is logged, not returned.
    async fn persist(&self, book: &Book) {
        let Some(path) = &self.config.book_file else {
            return;
        };
        if let Err(e) = save_book(path, book).await {
            warn!(path = %path.display(), error = %e, "Could not save paper book");
        }
    }

    fn fill_price(&self, side: Side, price: Decimal) -> Decimal {
        let slip = self.config.slippage_pct / dec!(100);
        match side {
            Side::Buy => price * (Decimal::ONE + slip),
            Side::Sell => price * (Decimal::ONE - slip),
        }
    }

    fn blocked(&self, book: &Book) -> Decimal {
        book.positions
            .values()
            .map(|p| Decimal::from(p.abs_quantity()) * p.average_price * self.config.margin_rate)
            .sum()
    }
}

impl Book {
    fn mark(&mut self, prices: &BTreeMap<String, Decimal>) {
        for (symbol, price) in prices {
            self.mark_one(symbol, *price);
        }
    }

    fn mark_one(&mut self, symbol: &str, price: Decimal) {
        let key = symbol.to_uppercase();
        if let Some(position) = self.positions.get_mut(&key) {
            position.update_price(price);
        }
        self.prices.insert(key, price);
    }
}

fn load_book(path: &Path) -> Result<Book, BrokerError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Book::default()),
        Err(e) => {
            return Err(BrokerError::Configuration(format!(
                "paper book {}: {}",
                path.display(),
                e
            )))
        }
    };
    if text.trim().is_empty() {
        return Ok(Book::default());
    }
    let book: Book = serde_json::from_str(&text).map_err(|e| {
        BrokerError::Configuration(format!("paper book {}: {}", path.display(), e))
    })?;
    debug!(
        path = %path.display(),
        positions = book.positions.len(),
        resting = book.resting.len(),
        "Loaded paper book"
    );
    Ok(book)
}

async fn save_book(path: &Path, book: &Book) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let text = serde_json::to_string_pretty(book).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, text).await?;
    tokio::fs::rename(&tmp, path).await
}

/// Apply a fill to a position, returning the P&L realized by any reduction.
fn apply_fill(position: &mut Position, side: Side, quantity: u32, price: Decimal) -> Decimal {
    let signed = match side {
        Side::Buy => i64::from(quantity),
        Side::Sell => -i64::from(quantity),
    };
    let current = position.net_quantity;
    let mut realized = Decimal::ZERO;

    if current == 0 || current.signum() == signed.signum() {
        let total = current + signed;
        let cost = position.average_price * Decimal::from(current.abs())
            + price * Decimal::from(signed.abs());
        position.average_price = cost / Decimal::from(total.abs());
        position.net_quantity = total;
    } else {
        let closed = current.abs().min(signed.abs());
        realized = Decimal::from(closed) * (price - position.average_price) * Decimal::from(current.signum());
        let total = current + signed;
        if total != 0 && total.signum() != current.signum() {
            // Flipped through flat; the remainder opens at the fill price.
            position.average_price = price;
        }
        position.net_quantity = total;
    }

    position.realized_pnl += realized;
    position.update_price(price);
    realized
}

#[async_trait]
impl Broker for PaperBroker {
    async fn authenticate(&self) -> Result<(), BrokerError> {
        debug!("Paper broker needs no session");
        Ok(())
    }

    async fn deauthenticate(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn fetch_margin(&self) -> Result<MarginSnapshot, BrokerError> {
        let book = self.book.lock().await;
        let used = self.blocked(&book);
        let unrealized: Decimal = book.positions.values().map(|p| p.unrealized_pnl).sum();
        let available = self.config.initial_capital + book.realized + unrealized - used;
        Ok(MarginSnapshot::new(available, used))
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, BrokerError> {
        let book = self.book.lock().await;
        let mut positions: Vec<Position> = book.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(positions)
    }

    async fn fetch_quote(&self, symbol: &str, exchange: Exchange) -> Result<Quote, BrokerError> {
        let book = self.book.lock().await;
        let last_price = book
            .prices
            .get(&symbol.to_uppercase())
            .copied()
            .ok_or_else(|| BrokerError::RemoteUnavailable(format!("no price set for {}", symbol)))?;
        Ok(Quote {
            symbol: symbol.to_string(),
            exchange,
            last_price,
            bid: None,
            ask: None,
            timestamp: Utc::now(),
        })
    }

    async fn submit_order(&self, request: OrderRequest) -> Result<OrderId, BrokerError> {
        request.validate()?;
        let mut book = self.book.lock().await;
        let key = request.symbol.to_uppercase();

        let market = book.prices.get(&key).copied().ok_or_else(|| BrokerError::OrderRejected {
            reason: format!("no price available for {}", request.symbol),
        })?;

        let order_id = Uuid::new_v4().to_string();
        let price = match (request.order_type, request.limit_price) {
            (OrderType::Market, _) => self.fill_price(request.side, market),
            (OrderType::Limit, Some(limit))
                if (request.side == Side::Buy && market <= limit)
                    || (request.side == Side::Sell && market >= limit) =>
            {
                market
            }
            _ => {
                debug!(order_id = %order_id, symbol = %request.symbol, "Paper order resting");
                book.resting.insert(order_id.clone(), request);
                self.persist(&book).await;
                return Ok(order_id);
            }
        };

        let reduces = book
            .positions
            .get(&key)
            .is_some_and(|p| !p.is_flat() && Side::closing(p.net_quantity) == request.side);
        if !reduces {
            let required = Decimal::from(request.quantity) * price * self.config.margin_rate;
            let used = self.blocked(&book);
            let available = self.config.initial_capital + book.realized - used;
            if required > available {
                return Err(BrokerError::OrderRejected {
                    reason: format!(
                        "insufficient margin: required {}, available {}",
                        required.round_dp(2),
                        available.round_dp(2)
                    ),
                });
            }
        }

        let position = book.positions.entry(key.clone()).or_insert_with(|| {
            let mut p = Position::new(&request.symbol, 0, Decimal::ZERO);
            p.exchange = request.exchange;
            p.product = request.product_type;
            p.expiry = request.expiry;
            p.strike_price = request.strike_price;
            p.right = request.right;
            p
        });
        let realized = apply_fill(position, request.side, request.quantity, price);
        if position.is_flat() {
            book.positions.remove(&key);
        }
        book.realized += realized;
        book.filled.push(order_id.clone());
        self.persist(&book).await;

        info!(
            order_id = %order_id,
            "Paper fill: {} {} {} @ {}",
            request.side,
            request.quantity,
            request.symbol,
            price
        );
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let mut book = self.book.lock().await;
        if book.resting.remove(order_id).is_some() {
            info!(order_id, "Paper order canceled");
            self.persist(&book).await;
            return Ok(());
        }
        let reason = if book.filled.iter().any(|id| id == order_id) {
            format!("order {} is already filled", order_id)
        } else {
            format!("unknown order {}", order_id)
        };
        Err(BrokerError::OrderRejected { reason })
    }

    async fn search_instrument(
        &self,
        query: &str,
        exchange: Exchange,
    ) -> Result<Vec<Instrument>, BrokerError> {
        let book = self.book.lock().await;
        let needle = query.trim().to_uppercase();
        let mut found: Vec<Instrument> = book
            .prices
            .keys()
            .filter(|symbol| symbol.contains(&needle))
            .map(|symbol| Instrument {
                symbol: symbol.clone(),
                exchange,
                token: symbol.clone(),
                name: symbol.clone(),
                lot_size: self.config.lot_size,
                expiry: None,
            })
            .collect();
        found.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(found)
    }

    fn name(&self) -> &str {
        "paper"
    }
}
