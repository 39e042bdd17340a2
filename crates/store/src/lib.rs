//! Slice Store
//!
//! Turso-backed persistence for the creator revenue allocation platform.
//!
//! # Tables
//!
//! | Table | Written by | Notes |
//! |-------|------------|-------|
//! | `users`, `videos`, `event` | ingestion (external) | read-only here, except EIS snapshot and balance cache |
//! | `video_aggregates` | scoring analyzer | append-only audit log |
//! | `revenue_windows`, `video_rev_shares` | window finalizer | one window row, one share row per video |
//! | `transactions` | payout writer | append-only ledger of record |
//! | `payout_runs` | orchestrators | atomic per-period idempotency guard |
//!
//! # Usage
//!
//! ```ignore
//! use slice_store::Store;
//!
//! // File-based (production)
//! let store = Store::new("data").await?;
//!
//! // In-memory (testing)
//! let store = Store::new_memory().await?;
//!
//! let user = store.users().get_required(42).await?;
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod repos;

// Re-exports
pub use db::Store;
pub use error::{Result, StoreError};
pub use models::{
    EventKind, RevenueWindow, Transaction, TxDirection, TxStatus, User, Video, VideoAggregate,
    VideoRevShare, ViewerEvent,
};
pub use repos::{AggregateRepo, EventRepo, TransactionRepo, UserRepo, VideoRepo, WindowRepo};

impl Store {
    /// Get the user repository
    pub fn users(&self) -> UserRepo<'_> {
        UserRepo::new(self.db())
    }

    /// Get the video repository
    pub fn videos(&self) -> VideoRepo<'_> {
        VideoRepo::new(self.db())
    }

    /// Get the event repository
    pub fn events(&self) -> EventRepo<'_> {
        EventRepo::new(self.db())
    }

    /// Get the aggregate repository
    pub fn aggregates(&self) -> AggregateRepo<'_> {
        AggregateRepo::new(self.db())
    }

    /// Get the revenue window repository
    pub fn windows(&self) -> WindowRepo<'_> {
        WindowRepo::new(self.db())
    }

    /// Get the transaction repository
    pub fn transactions(&self) -> TransactionRepo<'_> {
        TransactionRepo::new(self.db())
    }
}
