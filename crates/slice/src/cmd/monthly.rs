//! Monthly revenue split command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use clap::Args;
use slice_config::RunOverrides;
use slice_engine::run_monthly;
use tracing::info;

/// Arguments for the monthly split
#[derive(Args, Debug)]
pub struct MonthlyArgs {
    /// Year to process (or YEAR env), defaults to the current year
    #[arg(long)]
    pub year: Option<i32>,

    /// Month to process, 1-12 (or MONTH env), defaults to last month
    #[arg(long)]
    pub month: Option<u32>,

    /// Pool to allocate, in cents (or POOL_CENTS env)
    #[arg(long)]
    pub pool_cents: Option<i64>,

    /// Compute and write a CSV preview instead of committing
    #[arg(long)]
    pub dry_run: bool,

    /// Directory for dry-run preview files
    #[arg(long, default_value = "previews")]
    pub preview_dir: PathBuf,
}

/// Run the monthly split
pub async fn run(config_path: &Path, args: MonthlyArgs) -> Result<()> {
    let (config, store) = super::open(config_path).await?;
    let overrides = RunOverrides::from_env().context("reading environment overrides")?;

    let today = Utc::now().date_naive();
    let (default_year, default_month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };

    let year = args.year.or(overrides.year).unwrap_or(default_year);
    let month = args.month.or(overrides.month).unwrap_or(default_month);
    let pool_cents = args
        .pool_cents
        .or(overrides.pool_cents)
        .context("no pool given: pass --pool-cents or set POOL_CENTS")?;
    let dry_run = args.dry_run || overrides.dry_run.unwrap_or(false);

    info!(year, month, pool_cents, dry_run, "Starting monthly split");
    let report = run_monthly(
        &store,
        &config,
        year,
        month,
        pool_cents,
        dry_run,
        &args.preview_dir,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
