//! Database connection and schema management
//!
//! Uses Turso (async SQLite-compatible) for the platform database. One
//! database holds both the raw interaction data (`users`, `videos`, `event`)
//! and everything the allocation pipeline writes (`video_aggregates`,
//! `revenue_windows`, `video_rev_shares`, `transactions`, `payout_runs`).

use tracing::{debug, info};
use turso::{Builder, Database};

use crate::error::{Result, StoreError};

/// Platform database manager
///
/// Owns the database handle; repositories borrow it per operation.
/// Constructed explicitly and passed into every component (no process-wide
/// singleton).
pub struct Store {
    db: Database,
}

impl Store {
    /// Open (or create) a file-based store
    ///
    /// # Arguments
    /// * `data_dir` - Directory for the database file (e.g., "data/")
    ///
    /// Creates `{data_dir}/slice.db` and initializes the schema.
    pub async fn new(data_dir: impl Into<String>) -> Result<Self> {
        let data_dir = data_dir.into();

        std::fs::create_dir_all(&data_dir).map_err(|e| {
            StoreError::invalid("data_dir", format!("failed to create directory: {}", e))
        })?;

        let path = format!("{}/slice.db", data_dir);
        info!(path = %path, "Opening platform database");

        let db = Builder::new_local(&path).build().await?;

        let store = Self { db };
        store.init_schema().await?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;

        let store = Self { db };
        store.init_schema().await?;

        Ok(store)
    }

    /// Get the underlying database handle
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Initialize the schema
    async fn init_schema(&self) -> Result<()> {
        let conn = self.db.connect()?;

        // === Raw interaction data ===

        conn.execute(SCHEMA_USERS, ()).await?;
        conn.execute(SCHEMA_VIDEOS, ()).await?;
        conn.execute(SCHEMA_EVENT, ()).await?;

        // === Pipeline outputs ===

        conn.execute(SCHEMA_VIDEO_AGGREGATES, ()).await?;
        conn.execute(SCHEMA_REVENUE_WINDOWS, ()).await?;
        conn.execute(SCHEMA_VIDEO_REV_SHARES, ()).await?;
        conn.execute(SCHEMA_TRANSACTIONS, ()).await?;
        conn.execute(SCHEMA_PAYOUT_RUNS, ()).await?;

        // Indexes
        conn.execute(INDEX_VIDEOS_CREATOR, ()).await?;
        conn.execute(INDEX_EVENT_VIDEO, ()).await?;
        conn.execute(INDEX_EVENT_TS, ()).await?;
        conn.execute(INDEX_AGGREGATES_VIDEO, ()).await?;
        conn.execute(INDEX_SHARES_WINDOW, ()).await?;
        conn.execute(INDEX_TX_RECIPIENT, ()).await?;
        conn.execute(INDEX_TX_TYPE_PERIOD, ()).await?;

        debug!("Platform database schema initialized");
        Ok(())
    }
}

// =============================================================================
// Raw Interaction Data
// =============================================================================

const SCHEMA_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    kyc_level INTEGER NOT NULL DEFAULT 0,
    creator_trust_score REAL,
    viewer_trust_score REAL,
    likely_bot INTEGER NOT NULL DEFAULT 0,
    account_created_at TEXT,
    current_balance_cents INTEGER NOT NULL DEFAULT 0
)
"#;

const SCHEMA_VIDEOS: &str = r#"
CREATE TABLE IF NOT EXISTS videos (
    id INTEGER PRIMARY KEY,
    creator_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    duration_seconds REAL,
    eis_current REAL,
    eis_updated_at TEXT,
    FOREIGN KEY (creator_id) REFERENCES users(id)
)
"#;

const SCHEMA_EVENT: &str = r#"
CREATE TABLE IF NOT EXISTS event (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    event_type TEXT NOT NULL,
    ts TEXT NOT NULL,
    device_id TEXT,
    ip_hash TEXT,
    FOREIGN KEY (video_id) REFERENCES videos(id)
)
"#;

const INDEX_VIDEOS_CREATOR: &str =
    "CREATE INDEX IF NOT EXISTS idx_videos_creator ON videos(creator_id)";

const INDEX_EVENT_VIDEO: &str = "CREATE INDEX IF NOT EXISTS idx_event_video ON event(video_id, ts)";

const INDEX_EVENT_TS: &str = "CREATE INDEX IF NOT EXISTS idx_event_ts ON event(ts)";

// =============================================================================
// Pipeline Outputs
// =============================================================================

const SCHEMA_VIDEO_AGGREGATES: &str = r#"
CREATE TABLE IF NOT EXISTS video_aggregates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id INTEGER NOT NULL,
    window_start TEXT NOT NULL,
    window_end TEXT NOT NULL,
    eis REAL NOT NULL,
    authentic_engagement REAL NOT NULL,
    comment_quality REAL NOT NULL,
    like_integrity REAL NOT NULL,
    report_credibility REAL NOT NULL,
    breakdown TEXT DEFAULT '{}',
    created_at TEXT NOT NULL,
    FOREIGN KEY (video_id) REFERENCES videos(id)
)
"#;

const SCHEMA_REVENUE_WINDOWS: &str = r#"
CREATE TABLE IF NOT EXISTS revenue_windows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    window_start TEXT NOT NULL,
    window_end TEXT NOT NULL,
    gross_revenue_cents INTEGER NOT NULL,
    taxes_cents INTEGER NOT NULL,
    app_store_fees_cents INTEGER NOT NULL,
    refunds_cents INTEGER NOT NULL,
    pool_pct REAL NOT NULL,
    margin_target REAL NOT NULL,
    risk_reserve_pct REAL NOT NULL,
    platform_fee_pct REAL NOT NULL,
    costs_est_cents INTEGER NOT NULL,
    creator_pool_cents INTEGER NOT NULL,
    meta TEXT DEFAULT '{}',
    created_at TEXT NOT NULL
)
"#;

const SCHEMA_VIDEO_REV_SHARES: &str = r#"
CREATE TABLE IF NOT EXISTS video_rev_shares (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    revenue_window_id INTEGER NOT NULL,
    video_id INTEGER NOT NULL,
    eng_units REAL NOT NULL,
    eis_avg REAL NOT NULL,
    vu REAL NOT NULL,
    share_pct REAL NOT NULL,
    allocated_cents INTEGER NOT NULL,
    meta TEXT DEFAULT '{}',
    FOREIGN KEY (revenue_window_id) REFERENCES revenue_windows(id)
)
"#;

const SCHEMA_TRANSACTIONS: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient INTEGER NOT NULL,
    amount_cents INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    payment_type TEXT NOT NULL,
    direction TEXT NOT NULL DEFAULT 'inflow',
    period_key TEXT,
    hold_until TEXT,
    created_at TEXT NOT NULL
)
"#;

// One row per committed payout run. The primary key makes the
// check-then-insert race a single atomic conditional insert.
const SCHEMA_PAYOUT_RUNS: &str = r#"
CREATE TABLE IF NOT EXISTS payout_runs (
    payment_type TEXT NOT NULL,
    period_key TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (payment_type, period_key)
)
"#;

const INDEX_AGGREGATES_VIDEO: &str =
    "CREATE INDEX IF NOT EXISTS idx_aggregates_video ON video_aggregates(video_id, window_start)";

const INDEX_SHARES_WINDOW: &str =
    "CREATE INDEX IF NOT EXISTS idx_shares_window ON video_rev_shares(revenue_window_id)";

const INDEX_TX_RECIPIENT: &str =
    "CREATE INDEX IF NOT EXISTS idx_tx_recipient ON transactions(recipient)";

const INDEX_TX_TYPE_PERIOD: &str =
    "CREATE INDEX IF NOT EXISTS idx_tx_type_period ON transactions(payment_type, period_key)";
