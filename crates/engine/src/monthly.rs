//! Monthly revenue split
//!
//! Walks every day of a calendar month, accumulates trust-weighted units
//! per creator, then allocates the month's pool in one pass. Dry runs
//! write a CSV preview instead of touching the ledger.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use slice_config::Config;
use slice_store::Store;
use tracing::{error, info};

use crate::allocation::{allocate, Allocation};
use crate::daily::{day_bounds, kyc_levels_for};
use crate::error::{EngineError, Result};
use crate::payout::{PayoutBatch, PayoutWriter};
use crate::units::UnitEngine;

pub const MONTHLY_PAYMENT_TYPE: &str = "revenue_split_monthly";

/// Outcome of a monthly run
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub period_key: String,
    pub pool_cents: i64,
    pub days_processed: u32,
    pub days_skipped_empty: u32,
    pub days_failed: u32,
    pub total_units: f64,
    pub allocation: Allocation,
    pub batch: Option<PayoutBatch>,
    /// Preview CSV path, when this was a dry run
    pub preview_path: Option<PathBuf>,
    pub dry_run: bool,
}

/// Run the monthly revenue split
///
/// A failed day is logged and skipped so one bad day of data cannot sink
/// the whole month; the report carries the failure count for operators
/// to chase. A run that errors after claiming the period releases the
/// claim before returning, so the month can be retried. Dry runs write
/// `preview_YYYY_MM.csv` under `preview_dir` and leave the store
/// untouched.
pub async fn run_monthly(
    store: &Store,
    config: &Config,
    year: i32,
    month: u32,
    pool_cents: i64,
    dry_run: bool,
    preview_dir: &Path,
) -> Result<MonthlyReport> {
    if pool_cents < 0 {
        return Err(EngineError::invalid_pool(format!(
            "pool must be non-negative, got {pool_cents}"
        )));
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::invalid_window(format!("bad month {year}-{month:02}")))?;

    let period_key = format!("{year}-{month:02}");
    if !dry_run && !store.transactions().claim_run(MONTHLY_PAYMENT_TYPE, &period_key).await? {
        return Err(EngineError::already_processed(MONTHLY_PAYMENT_TYPE, &period_key));
    }

    let result =
        split_month(store, config, year, month, first, pool_cents, dry_run, preview_dir, &period_key)
            .await;
    if !dry_run && result.is_err() {
        if let Err(release_err) = store
            .transactions()
            .release_run(MONTHLY_PAYMENT_TYPE, &period_key)
            .await
        {
            error!(period_key, error = %release_err, "Failed to release month claim");
        }
    }
    result
}

#[allow(clippy::too_many_arguments)]
async fn split_month(
    store: &Store,
    config: &Config,
    year: i32,
    month: u32,
    first: NaiveDate,
    pool_cents: i64,
    dry_run: bool,
    preview_dir: &Path,
    period_key: &str,
) -> Result<MonthlyReport> {
    let engine = UnitEngine::new(store);
    let mut month_units: BTreeMap<i64, f64> = BTreeMap::new();
    let mut days_processed = 0;
    let mut days_skipped_empty = 0;
    let mut days_failed = 0;

    let mut date = first;
    while date.month() == month {
        let (start, end) = day_bounds(date)?;

        if store.events().count_in(start, end).await? == 0 {
            days_skipped_empty += 1;
        } else {
            match engine.compute_day(start, end).await {
                Ok(day) => {
                    for (creator, units) in day.unit_totals() {
                        *month_units.entry(creator).or_insert(0.0) += units;
                    }
                    days_processed += 1;
                }
                Err(e) => {
                    error!(date = %date, error = %e, "Day failed, skipping");
                    days_failed += 1;
                }
            }
        }

        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    let total_units: f64 = month_units.values().sum();
    let kyc_levels = kyc_levels_for(store, &month_units).await?;
    let allocation = allocate(pool_cents, &month_units, &kyc_levels, &config.payout);

    info!(
        period_key,
        days_processed,
        days_skipped_empty,
        days_failed,
        creators = allocation.allocations.len(),
        allocated_cents = allocation.allocated_cents(),
        unallocated_cents = allocation.unallocated_cents,
        dry_run,
        "Computed monthly allocation"
    );

    let mut preview_path = None;
    let mut batch = None;
    if dry_run {
        preview_path = Some(write_preview(preview_dir, year, month, &allocation)?);
    } else {
        let writer = PayoutWriter::new(store, &config.policy);
        batch = Some(
            writer
                .commit_batch(
                    allocation.allocations.iter().map(|(id, amt)| (*id, *amt)),
                    MONTHLY_PAYMENT_TYPE,
                    period_key,
                )
                .await?,
        );
    }

    Ok(MonthlyReport {
        period_key: period_key.to_string(),
        pool_cents,
        days_processed,
        days_skipped_empty,
        days_failed,
        total_units,
        allocation,
        batch,
        preview_path,
        dry_run,
    })
}

/// Write the dry-run preview CSV, returning its path
fn write_preview(dir: &Path, year: i32, month: u32, allocation: &Allocation) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("preview_{year}_{month:02}.csv"));

    // Largest payouts first, creator id breaking ties.
    let mut rows: Vec<(i64, i64)> = allocation.allocations.iter().map(|(c, a)| (*c, *a)).collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut file = std::fs::File::create(&path)?;
    writeln!(file, "creator_id,amount_cents,amount_usd")?;
    for (creator, amount) in &rows {
        writeln!(file, "{creator},{amount},{:.2}", *amount as f64 / 100.0)?;
        info!(creator_id = *creator, amount_cents = *amount, "Preview allocation");
    }

    info!(path = %path.display(), rows = rows.len(), "Wrote payout preview");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use slice_store::{EventKind, User, Video, ViewerEvent};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, d, 12, 0, 0).single().unwrap()
    }

    async fn seeded_store() -> Store {
        let store = Store::new_memory().await.unwrap();
        store.users().insert(&User::new(1, 3)).await.unwrap();
        store.users().insert(&User::new(2, 1)).await.unwrap();
        for (creator, video) in [(1i64, 10i64), (2, 20)] {
            let v = Video::new(video, creator, day(1) - Duration::days(10));
            store.videos().insert(&v).await.unwrap();
        }
        // Activity spread over three days of the month.
        for d in [3u32, 10, 24] {
            for viewer in 0..20i64 {
                let ev = ViewerEvent::new(10, 500 + viewer, EventKind::View, day(d));
                store.events().insert(&ev).await.unwrap();
            }
            for viewer in 0..10i64 {
                let ev = ViewerEvent::new(20, 800 + viewer, EventKind::View, day(d));
                store.events().insert(&ev).await.unwrap();
            }
        }
        store
    }

    #[tokio::test]
    async fn test_monthly_run_accumulates_days() {
        let store = seeded_store().await;
        let config = Config::default();
        let dir = std::env::temp_dir().join("slice-monthly-commit");

        let report = run_monthly(&store, &config, 2026, 7, 100_000, false, &dir)
            .await
            .unwrap();

        assert_eq!(report.days_processed, 3);
        assert_eq!(report.days_skipped_empty, 28);
        assert_eq!(report.days_failed, 0);
        assert_eq!(report.allocation.allocations.len(), 2);
        assert!(report.allocation.allocations[&1] > report.allocation.allocations[&2]);
        assert!(report.batch.is_some());

        let user = store.users().get_required(1).await.unwrap();
        assert!(user.current_balance_cents > 0);
    }

    #[tokio::test]
    async fn test_monthly_caps_apply_across_the_month() {
        let store = seeded_store().await;
        let config = Config::default();
        let dir = std::env::temp_dir().join("slice-monthly-caps");

        // Creator 2 is KYC level 1: whatever their share, 5000 is the roof.
        let report = run_monthly(&store, &config, 2026, 7, 10_000_000, false, &dir)
            .await
            .unwrap();
        assert_eq!(report.allocation.allocations[&2], 5_000);
    }

    #[tokio::test]
    async fn test_monthly_dry_run_writes_preview_only() {
        let store = seeded_store().await;
        let config = Config::default();
        let dir = std::env::temp_dir().join("slice-monthly-preview");

        let report = run_monthly(&store, &config, 2026, 7, 100_000, true, &dir)
            .await
            .unwrap();

        let path = report.preview_path.unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("creator_id,amount_cents,amount_usd"));

        // Creator 1 out-earns creator 2, so they lead the file.
        let amounts: Vec<(i64, i64)> = lines
            .map(|line| {
                let mut cols = line.split(',');
                (
                    cols.next().unwrap().parse().unwrap(),
                    cols.next().unwrap().parse().unwrap(),
                )
            })
            .collect();
        assert_eq!(amounts.len(), 2);
        assert_eq!(amounts[0].0, 1);
        assert!(amounts[0].1 > amounts[1].1);

        // Ledger untouched, period unclaimed.
        let user = store.users().get_required(1).await.unwrap();
        assert_eq!(user.current_balance_cents, 0);
        assert!(!store
            .transactions()
            .run_exists(MONTHLY_PAYMENT_TYPE, "2026-07")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_monthly_rerun_is_rejected() {
        let store = seeded_store().await;
        let config = Config::default();
        let dir = std::env::temp_dir().join("slice-monthly-rerun");

        run_monthly(&store, &config, 2026, 7, 100_000, false, &dir).await.unwrap();
        let err = run_monthly(&store, &config, 2026, 7, 100_000, false, &dir)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyProcessed { .. }));
    }

    #[tokio::test]
    async fn test_invalid_month_is_rejected() {
        let store = Store::new_memory().await.unwrap();
        let config = Config::default();
        let dir = std::env::temp_dir().join("slice-monthly-bad");

        let err = run_monthly(&store, &config, 2026, 13, 100_000, false, &dir)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidWindow { .. }));
    }

    #[tokio::test]
    async fn test_failed_month_releases_its_claim() {
        let store = Store::new_memory().await.unwrap();
        let config = Config::default();
        let dir = std::env::temp_dir().join("slice-monthly-release");

        // The calendar's last month cannot bound its final day, so the
        // run fails after it has already claimed the period.
        let last = NaiveDate::MAX;
        let err = run_monthly(&store, &config, last.year(), last.month(), 100_000, false, &dir)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidWindow { .. }));

        let period_key = format!("{}-{:02}", last.year(), last.month());
        assert!(!store
            .transactions()
            .run_exists(MONTHLY_PAYMENT_TYPE, &period_key)
            .await
            .unwrap());

        // With the claim released the month is claimable again.
        assert!(store
            .transactions()
            .claim_run(MONTHLY_PAYMENT_TYPE, &period_key)
            .await
            .unwrap());
    }
}
