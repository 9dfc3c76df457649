//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use trading_config::{AppConfig, ConfigError};

pub async fn run(config_path: &Path, loaded: Result<AppConfig, ConfigError>) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    let problems = config.problems();
    if !problems.is_empty() {
        println!("Configuration has {} problem(s):", problems.len());
        for problem in &problems {
            println!("  - {}", problem);
        }
        anyhow::bail!("invalid configuration");
    }

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Credential store: {}", config.credentials.path.display());
    println!("Scheduled broker: {}", config.schedule.broker);
    println!(
        "Entry / cutoff: {} / {}",
        config.schedule.entry_time.format("%H:%M"),
        config.risk.market_close_cutoff.format("%H:%M")
    );
    println!("Trading enabled: {}", config.risk.trading_enabled);
    println!(
        "Lot size x max lots: {} x {}",
        config.risk.lot_size, config.risk.max_lots
    );
    println!("Stop-loss: ₹{}", config.risk.stop_loss_amount);
    println!("Profit target: ₹{}", config.risk.profit_target_amount);
    println!("Telegram: {}", if config.telegram.enabled { "on" } else { "off" });

    Ok(())
}
