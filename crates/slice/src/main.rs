//! Slice - Creator revenue split runner
//!
//! # Usage
//!
//! ```bash
//! # Preview today's split without writing anything
//! slice daily --pool-cents 250000 --dry-run
//!
//! # Commit a daily split for a specific date
//! slice daily --date 2026-07-14 --pool-cents 250000
//!
//! # Monthly split with a CSV preview
//! slice monthly --year 2026 --month 7 --pool-cents 7500000 --dry-run
//!
//! # Finalize a revenue window from gross revenue figures
//! slice finalize-window --start 2026-07-01T00:00:00Z --end 2026-08-01T00:00:00Z \
//!     --gross-cents 100000000 --taxes-cents 8000000
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Slice - Creator revenue split runner
#[derive(Parser, Debug)]
#[command(name = "slice")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file
    #[arg(short, long, default_value = "configs/slice.toml", global = true)]
    config: std::path::PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the daily revenue split
    Daily(cmd::daily::DailyArgs),

    /// Run the monthly revenue split
    Monthly(cmd::monthly::MonthlyArgs),

    /// Finalize a revenue window from gross revenue figures
    FinalizeWindow(cmd::window::WindowArgs),

    /// Recompute a creator's cached balance from the ledger
    RecomputeBalance(cmd::balance::BalanceArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Command::Daily(args) => cmd::daily::run(&cli.config, args).await,
        Command::Monthly(args) => cmd::monthly::run(&cli.config, args).await,
        Command::FinalizeWindow(args) => cmd::window::run(&cli.config, args).await,
        Command::RecomputeBalance(args) => cmd::balance::run(&cli.config, args).await,
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
