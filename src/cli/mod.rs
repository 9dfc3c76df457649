//! CLI definitions.

pub mod commands;
pub mod context;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use trading_core::types::{Exchange, ServiceKind};

#[derive(Parser)]
#[command(name = "tradedesk")]
#[command(author, version, about = "Broker integration and risk-controlled trading tasks")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", env = "TRADEDESK_CONFIG")]
    pub config: PathBuf,

    /// Log level (defaults to the configured level)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage stored broker and data-provider credentials
    #[command(subcommand)]
    Credentials(CredentialsCommand),
    /// Evaluate the latest signal and open a position
    Open(TaskArgs),
    /// Check the tracked position against the exit rules
    Monitor(TaskArgs),
    /// Close open positions now
    Close(CloseArgs),
    /// Run the scheduler until Ctrl-C
    Run(TaskArgs),
    /// Show how many lots a margin buys
    Size(SizeArgs),
    /// Look up instruments
    Search(SearchArgs),
    /// Stream ticks from a broker feed
    Feed(FeedArgs),
    /// Validate configuration
    ValidateConfig,
}

#[derive(Subcommand)]
pub enum CredentialsCommand {
    /// Create or replace a credential
    Set(SetArgs),
    /// List stored credentials (secrets masked)
    List {
        /// Only this service
        #[arg(short, long)]
        service: Option<ServiceKind>,
    },
    /// Show one credential (secrets masked)
    Show(CredentialRef),
    /// Log in and fetch margin to check the credential works
    Test(CredentialRef),
    /// Delete a credential
    Delete(CredentialRef),
    /// Store the daily API session key (Breeze) or session id
    SetSession {
        #[command(flatten)]
        target: CredentialRef,
        /// Session key from the vendor login page
        session: String,
    },
    /// End the vendor session and clear the stored token
    Logout(CredentialRef),
}

#[derive(clap::Args)]
pub struct CredentialRef {
    /// Service: breeze, neo or data_provider
    pub service: ServiceKind,
    /// Credential name
    #[arg(default_value = "primary")]
    pub name: String,
}

#[derive(clap::Args)]
pub struct SetArgs {
    #[command(flatten)]
    pub target: CredentialRef,

    /// API / consumer key
    #[arg(long, env = "TRADEDESK_API_KEY")]
    pub api_key: String,

    /// API / consumer secret (kept when omitted)
    #[arg(long, env = "TRADEDESK_API_SECRET")]
    pub api_secret: Option<String>,

    /// Login user id or mobile number
    #[arg(long)]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "TRADEDESK_PASSWORD")]
    pub password: Option<String>,

    /// MPIN / trading PIN
    #[arg(long, env = "TRADEDESK_PIN")]
    pub pin: Option<String>,
}

#[derive(clap::Args)]
pub struct TaskArgs {
    /// Broker name (defaults to schedule.broker)
    #[arg(short, long)]
    pub broker: Option<String>,
}

#[derive(clap::Args)]
pub struct CloseArgs {
    #[command(flatten)]
    pub task: TaskArgs,

    /// Close every open position, not only the tracked one
    #[arg(long)]
    pub all: bool,
}

#[derive(clap::Args)]
pub struct SizeArgs {
    /// Available margin
    #[arg(long)]
    pub margin: rust_decimal::Decimal,

    /// Instrument price
    #[arg(long)]
    pub price: rust_decimal::Decimal,

    /// Lot size (defaults to risk.lot_size)
    #[arg(long)]
    pub lot_size: Option<u32>,

    /// Maximum lots (defaults to risk.max_lots)
    #[arg(long)]
    pub max_lots: Option<u32>,

    /// Risk fraction (defaults to risk.risk_fraction)
    #[arg(long)]
    pub risk_fraction: Option<rust_decimal::Decimal>,
}

#[derive(clap::Args)]
pub struct FeedArgs {
    /// Broker name
    #[arg(short, long, default_value = "neo")]
    pub broker: String,

    /// Vendor instrument tokens, e.g. nse_fo|35001 (comma-separated)
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub tokens: Vec<String>,

    /// Stop after this many ticks
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(clap::Args)]
pub struct SearchArgs {
    /// Broker name (defaults to schedule.broker)
    #[arg(short, long)]
    pub broker: Option<String>,

    /// Symbol or name fragment
    pub query: String,

    /// Exchange segment
    #[arg(short, long, default_value = "NFO")]
    pub exchange: Exchange,
}
