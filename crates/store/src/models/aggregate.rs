//! Video aggregate model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scored (video, window) row
///
/// Append-only audit log of Engagement Integrity Score computations; rows
/// are never updated in place. The latest snapshot also lands on
/// `videos.eis_current`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAggregate {
    pub id: i64,
    pub video_id: i64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Blended Engagement Integrity Score, 0-100
    pub eis: f64,
    pub authentic_engagement: f64,
    pub comment_quality: f64,
    pub like_integrity: f64,
    pub report_credibility: f64,
    /// Full component breakdown for audits
    pub breakdown: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl VideoAggregate {
    /// Create an aggregate row (id 0 until inserted)
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        video_id: i64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        eis: f64,
        authentic_engagement: f64,
        comment_quality: f64,
        like_integrity: f64,
        report_credibility: f64,
    ) -> Self {
        Self {
            id: 0,
            video_id,
            window_start,
            window_end,
            eis,
            authentic_engagement,
            comment_quality,
            like_integrity,
            report_credibility,
            breakdown: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    /// Attach the component breakdown
    pub fn with_breakdown(mut self, breakdown: serde_json::Value) -> Self {
        self.breakdown = breakdown;
        self
    }
}
