//! Revenue window models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A finalized revenue window
///
/// Created once per window; immutable after creation apart from the `meta`
/// audit field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueWindow {
    pub id: i64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub gross_revenue_cents: i64,
    pub taxes_cents: i64,
    pub app_store_fees_cents: i64,
    pub refunds_cents: i64,
    pub pool_pct: f64,
    pub margin_target: f64,
    pub risk_reserve_pct: f64,
    pub platform_fee_pct: f64,
    pub costs_est_cents: i64,
    /// Final creator pool after margin guardrails and quality adjustment
    pub creator_pool_cents: i64,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A video's share of a revenue window (append-only child row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRevShare {
    pub id: i64,
    pub revenue_window_id: i64,
    pub video_id: i64,
    /// Raw engagement volume proxy
    pub eng_units: f64,
    /// Average EIS over the window
    pub eis_avg: f64,
    /// Quality-weighted video units
    pub vu: f64,
    /// Fraction of the pool's total vu
    pub share_pct: f64,
    pub allocated_cents: i64,
    pub meta: serde_json::Value,
}
