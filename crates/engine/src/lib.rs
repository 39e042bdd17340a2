//! Revenue allocation engine
//!
//! Turns viewer engagement into money movements in three stages:
//!
//! 1. [`units`] folds a day of events into trust-weighted engagement
//!    units per creator.
//! 2. [`allocation`] splits a pool of cents proportionally to units,
//!    enforcing per-KYC-level caps with redistribution.
//! 3. [`payout`] writes the resulting ledger rows and balance bumps.
//!
//! Three entry points drive those stages: [`daily::run_daily`] and
//! [`monthly::run_monthly`] allocate an externally sized pool, while
//! [`window::finalize_window`] derives the pool from gross revenue and
//! persists an immutable window record. All three are at-most-once per
//! period.

pub mod allocation;
pub mod daily;
pub mod error;
pub mod monthly;
pub mod payout;
pub mod units;
pub mod window;

#[cfg(test)]
mod allocation_test;

pub use allocation::{allocate, Allocation};
pub use daily::{run_daily, DailyReport, DAILY_PAYMENT_TYPE};
pub use error::{EngineError, Result};
pub use monthly::{run_monthly, MonthlyReport, MONTHLY_PAYMENT_TYPE};
pub use payout::{split_payout, PayoutBatch, PayoutSplit, PayoutWriter};
pub use units::{DayUnits, UnitEngine};
pub use window::{finalize_window, WindowReport, WindowRevenue, WINDOW_PAYMENT_TYPE};
