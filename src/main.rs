//! tradedesk CLI application.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::context::Context;
use cli::{Cli, Commands};
use trading_config::{load_config, AppConfig};
use trading_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // validate-config reports load errors itself
    let loaded = load_config(&cli.config);
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();

    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or_else(|| logging.level.clone());
    let _guard = setup_logging(
        &level,
        cli.json_logs || logging.json(),
        logging.directory.as_deref(),
    );

    if let Commands::ValidateConfig = cli.command {
        return cli::commands::validate::run(&cli.config, loaded).await;
    }

    let config: AppConfig = loaded?;
    let ctx = Context::new(config, &cli.config);

    match cli.command {
        Commands::Credentials(command) => cli::commands::credentials::run(command, &ctx).await,
        Commands::Open(args) => cli::commands::task::open(args, &ctx).await,
        Commands::Monitor(args) => cli::commands::task::monitor(args, &ctx).await,
        Commands::Close(args) => cli::commands::task::close(args, &ctx).await,
        Commands::Run(args) => cli::commands::task::run(args, &ctx).await,
        Commands::Size(args) => cli::commands::size::run(args, &ctx.config.risk),
        Commands::Search(args) => cli::commands::market::search(args, &ctx).await,
        Commands::Feed(args) => cli::commands::market::feed(args, &ctx).await,
        Commands::ValidateConfig => Ok(()),
    }
}
