//! Video model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored video record
///
/// `eis_current` / `eis_updated_at` are a last-write-wins snapshot
/// maintained by the scoring analyzer; the append-only history lives in
/// `video_aggregates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: i64,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: Option<f64>,
    /// Latest Engagement Integrity Score snapshot
    pub eis_current: Option<f64>,
    pub eis_updated_at: Option<DateTime<Utc>>,
}

impl Video {
    /// Create a video record
    pub fn new(id: i64, creator_id: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            creator_id,
            created_at,
            duration_seconds: None,
            eis_current: None,
            eis_updated_at: None,
        }
    }

    /// Set the duration in seconds
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }
}
