//! Daily revenue split
//!
//! One run per calendar day (UTC): fold the day's events into units,
//! allocate the pool under KYC caps, and commit the payouts. The run is
//! at-most-once per day; re-runs are rejected before any write happens.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use slice_config::Config;
use slice_store::Store;
use tracing::{error, info, warn};

use crate::allocation::{allocate, Allocation};
use crate::error::{EngineError, Result};
use crate::payout::{PayoutBatch, PayoutWriter};
use crate::units::UnitEngine;

pub const DAILY_PAYMENT_TYPE: &str = "revenue_split_daily";

/// Outcome of a daily run
#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub period_key: String,
    pub pool_cents: i64,
    pub event_count: usize,
    pub creator_count: usize,
    pub total_units: f64,
    pub allocation: Option<Allocation>,
    pub batch: Option<PayoutBatch>,
    pub dry_run: bool,
}

/// UTC day bounds [midnight, next midnight) for a date
pub fn day_bounds(date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = date
        .and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .ok_or_else(|| EngineError::invalid_window(format!("bad date {date}")))?;
    let end = date
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .ok_or_else(|| EngineError::invalid_window(format!("no day after {date}")))?;
    Ok((start, end))
}

/// Run the daily revenue split for one date
///
/// Dry runs compute everything but write nothing and do not claim the
/// period. Committed runs claim `(revenue_split_daily, YYYY-MM-DD)`
/// first; a run that then fails releases the claim before returning, so
/// the day can be retried.
pub async fn run_daily(
    store: &Store,
    config: &Config,
    date: NaiveDate,
    pool_cents: i64,
    dry_run: bool,
) -> Result<DailyReport> {
    if pool_cents < 0 {
        return Err(EngineError::invalid_pool(format!(
            "pool must be non-negative, got {pool_cents}"
        )));
    }

    let period_key = date.format("%Y-%m-%d").to_string();

    if dry_run {
        if store.transactions().run_exists(DAILY_PAYMENT_TYPE, &period_key).await? {
            warn!(period_key, "Previewing a period that was already committed");
        }
    } else if !store.transactions().claim_run(DAILY_PAYMENT_TYPE, &period_key).await? {
        return Err(EngineError::already_processed(DAILY_PAYMENT_TYPE, &period_key));
    }

    let result = split_day(store, config, date, pool_cents, dry_run, &period_key).await;
    if !dry_run && result.is_err() {
        if let Err(release_err) = store
            .transactions()
            .release_run(DAILY_PAYMENT_TYPE, &period_key)
            .await
        {
            error!(period_key, error = %release_err, "Failed to release day claim");
        }
    }
    result
}

/// The claimed portion of a daily run
async fn split_day(
    store: &Store,
    config: &Config,
    date: NaiveDate,
    pool_cents: i64,
    dry_run: bool,
    period_key: &str,
) -> Result<DailyReport> {
    let (start, end) = day_bounds(date)?;

    // Empty days are committed as claimed-but-zero so re-runs stay rejected.
    let event_count = store.events().count_in(start, end).await?;
    if event_count == 0 {
        info!(period_key, "No events for day, nothing to allocate");
        return Ok(DailyReport {
            period_key: period_key.to_string(),
            pool_cents,
            event_count: 0,
            creator_count: 0,
            total_units: 0.0,
            allocation: None,
            batch: None,
            dry_run,
        });
    }

    let day = UnitEngine::new(store).compute_day(start, end).await?;
    let units = day.unit_totals();
    let kyc_levels = kyc_levels_for(store, &units).await?;
    let allocation = allocate(pool_cents, &units, &kyc_levels, &config.payout);

    info!(
        period_key,
        event_count = day.event_count,
        creators = allocation.allocations.len(),
        allocated_cents = allocation.allocated_cents(),
        unallocated_cents = allocation.unallocated_cents,
        dry_run,
        "Computed daily allocation"
    );

    let batch = if dry_run {
        None
    } else {
        let writer = PayoutWriter::new(store, &config.policy);
        Some(
            writer
                .commit_batch(
                    allocation.allocations.iter().map(|(id, amt)| (*id, *amt)),
                    DAILY_PAYMENT_TYPE,
                    period_key,
                )
                .await?,
        )
    };

    Ok(DailyReport {
        period_key: period_key.to_string(),
        pool_cents,
        event_count: day.event_count,
        creator_count: allocation.allocations.len(),
        total_units: day.total_units(),
        allocation: Some(allocation),
        batch,
        dry_run,
    })
}

/// KYC levels for every creator holding units
pub(crate) async fn kyc_levels_for(
    store: &Store,
    units: &BTreeMap<i64, f64>,
) -> Result<BTreeMap<i64, i64>> {
    let ids: Vec<i64> = units.keys().copied().collect();
    let users = store.users().get_many(&ids).await?;
    Ok(users.into_iter().map(|u| (u.id, u.kyc_level)).collect())
}
