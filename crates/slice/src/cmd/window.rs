//! Revenue window finalization command

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use slice_engine::{finalize_window, WindowRevenue};
use tracing::info;

/// Arguments for finalizing a revenue window
#[derive(Args, Debug)]
pub struct WindowArgs {
    /// Window start (RFC 3339, e.g. 2026-07-01T00:00:00Z)
    #[arg(long)]
    pub start: DateTime<Utc>,

    /// Window end (RFC 3339, exclusive)
    #[arg(long)]
    pub end: DateTime<Utc>,

    /// Gross revenue for the window, in cents
    #[arg(long)]
    pub gross_cents: i64,

    /// Taxes collected, in cents
    #[arg(long, default_value_t = 0)]
    pub taxes_cents: i64,

    /// App store fees, in cents
    #[arg(long, default_value_t = 0)]
    pub app_store_fees_cents: i64,

    /// Refunds issued, in cents
    #[arg(long, default_value_t = 0)]
    pub refunds_cents: i64,
}

/// Finalize the window
pub async fn run(config_path: &Path, args: WindowArgs) -> Result<()> {
    let (config, store) = super::open(config_path).await?;

    let revenue = WindowRevenue {
        gross_cents: args.gross_cents,
        taxes_cents: args.taxes_cents,
        app_store_fees_cents: args.app_store_fees_cents,
        refunds_cents: args.refunds_cents,
    };

    info!(
        start = %args.start,
        end = %args.end,
        gross_cents = revenue.gross_cents,
        net_cents = revenue.net_cents(),
        "Finalizing revenue window"
    );
    let report = finalize_window(&store, &config, args.start, args.end, revenue).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
