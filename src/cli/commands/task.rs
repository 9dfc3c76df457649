//! Single-shot task commands and the scheduler.

use anyhow::Result;
use tracing::info;
use trading_core::types::exchange_now;
use trading_risk::ExitReason;
use trading_tasks::{CloseReport, MonitorOutcome, OpenOutcome, Scheduler, TaskSnapshot, TradingTask};

use crate::cli::context::Context;
use crate::cli::{CloseArgs, TaskArgs};

pub async fn open(args: TaskArgs, ctx: &Context) -> Result<()> {
    let risk = ctx.flags().snapshot()?;
    let mut task = ctx.task(args.broker.as_deref()).await?;

    let outcome = task.open(&risk).await;
    save(ctx, &task).await?;

    match outcome? {
        OpenOutcome::Opened {
            order_id,
            lots,
            quantity,
        } => {
            println!("Opened position on {}", task.broker_name());
            println!("  Order:    {}", order_id);
            println!("  Lots:     {}", lots);
            println!("  Quantity: {}", quantity);
        }
        OpenOutcome::Skipped(reason) => println!("No order placed: {}", reason),
    }
    Ok(())
}

pub async fn monitor(args: TaskArgs, ctx: &Context) -> Result<()> {
    let risk = ctx.flags().snapshot()?;
    let mut task = ctx.task(args.broker.as_deref()).await?;

    let outcome = task.monitor(&risk, exchange_now()).await;
    save(ctx, &task).await?;

    match outcome? {
        MonitorOutcome::Inactive => println!("No tracked position."),
        MonitorOutcome::Holding { pnl } => {
            if let Some(tracked) = task.tracked() {
                println!("Holding {} {} x{}", tracked.side, tracked.symbol, tracked.quantity);
            }
            println!("  Unrealized P&L: ₹{}", pnl.round_dp(2));
            println!("  Stop-loss:      ₹{}", risk.stop_loss_amount);
            println!("  Profit target:  ₹{}", risk.profit_target_amount);
        }
        MonitorOutcome::PositionGone => {
            println!("Tracked position is no longer open at the broker; task reset.")
        }
        MonitorOutcome::Closed { reason, report } => {
            println!("Exit condition met: {}", reason);
            print_report(&report);
        }
    }
    Ok(())
}

pub async fn close(args: CloseArgs, ctx: &Context) -> Result<()> {
    let mut task = if args.all {
        // An untracked task closes every open position.
        TradingTask::new(ctx.broker(args.task.broker.as_deref())?, ctx.signals(), ctx.notifier())
    } else {
        ctx.task(args.task.broker.as_deref()).await?
    };

    let report = task.close(ExitReason::Manual).await;
    save(ctx, &task).await?;

    let report = report?;
    if report.closed_count == 0 && report.failed_count == 0 {
        println!("Nothing to close.");
    } else {
        print_report(&report);
    }
    Ok(())
}

pub async fn run(args: TaskArgs, ctx: &Context) -> Result<()> {
    let task = ctx.task(args.broker.as_deref()).await?;
    info!(broker = task.broker_name(), "Starting scheduled trading");

    Scheduler::new(task, ctx.flags(), ctx.notifier(), ctx.config.schedule.clone())
        .with_state_file(ctx.state_file())
        .run()
        .await?;
    Ok(())
}

async fn save(ctx: &Context, task: &TradingTask) -> Result<()> {
    let snapshot: TaskSnapshot = task.snapshot();
    ctx.state_file().save(&snapshot).await?;
    Ok(())
}

fn print_report(report: &CloseReport) {
    println!("  Closed: {}", report.closed_count);
    println!("  Failed: {}", report.failed_count);
    for id in &report.order_ids {
        println!("  Order:  {}", id);
    }
}
