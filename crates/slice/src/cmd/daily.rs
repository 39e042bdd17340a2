//! Daily revenue split command

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Args;
use slice_config::RunOverrides;
use slice_engine::run_daily;
use tracing::info;

/// Arguments for the daily split
#[derive(Args, Debug)]
pub struct DailyArgs {
    /// Date to process (YYYY-MM-DD), defaults to yesterday (UTC)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Pool to allocate, in cents (or POOL_CENTS env)
    #[arg(long)]
    pub pool_cents: Option<i64>,

    /// Compute and print without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the daily split
pub async fn run(config_path: &Path, args: DailyArgs) -> Result<()> {
    let (config, store) = super::open(config_path).await?;
    let overrides = RunOverrides::from_env().context("reading environment overrides")?;

    let date = args.date.unwrap_or_else(|| {
        Utc::now().date_naive().pred_opt().unwrap_or_else(|| Utc::now().date_naive())
    });
    let pool_cents = args
        .pool_cents
        .or(overrides.pool_cents)
        .context("no pool given: pass --pool-cents or set POOL_CENTS")?;
    let dry_run = args.dry_run || overrides.dry_run.unwrap_or(false);

    info!(date = %date, pool_cents, dry_run, "Starting daily split");
    let report = run_daily(&store, &config, date, pool_cents, dry_run).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
