//! Instrument search and the live tick feed.

use anyhow::{Context as _, Result};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::info;

use crate::cli::context::Context;
use crate::cli::{FeedArgs, SearchArgs};

pub async fn search(args: SearchArgs, ctx: &Context) -> Result<()> {
    let broker = ctx.broker(args.broker.as_deref())?;
    broker.authenticate().await.context("login failed")?;

    let instruments = broker.search_instrument(&args.query, args.exchange).await?;
    if instruments.is_empty() {
        println!("No instruments match '{}' on {}", args.query, args.exchange);
        return Ok(());
    }

    println!("{:<28} {:<6} {:<16} {:>6} {:<12} Name", "Symbol", "Exch", "Token", "Lot", "Expiry");
    println!("{}", "─".repeat(90));
    for i in instruments {
        let expiry = i.expiry.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<28} {:<6} {:<16} {:>6} {:<12} {}",
            i.symbol, i.exchange, i.token, i.lot_size, expiry, i.name
        );
    }
    Ok(())
}

pub async fn feed(args: FeedArgs, ctx: &Context) -> Result<()> {
    let broker = ctx.broker(Some(&args.broker))?;
    broker.authenticate().await.context("login failed")?;

    let rx = broker.subscribe_feed(&args.tokens).await?;
    info!(broker = broker.name(), tokens = ?args.tokens, "Feed subscribed");

    let mut ticks = ReceiverStream::new(rx);
    if let Some(limit) = args.limit {
        let mut ticks = ticks.take(limit);
        while let Some(tick) = ticks.next().await {
            print_tick(&tick);
        }
        return Ok(());
    }

    loop {
        tokio::select! {
            tick = ticks.next() => match tick {
                Some(tick) => print_tick(&tick),
                None => {
                    println!("Feed closed.");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn print_tick(tick: &trading_core::types::FeedTick) {
    let volume = tick.volume.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    println!(
        "{}  {:<16} {:>12} {:>12}",
        tick.timestamp.format("%H:%M:%S"),
        tick.token,
        tick.last_price,
        volume
    );
}
