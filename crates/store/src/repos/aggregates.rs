//! Video aggregate repository
//!
//! Append-only audit log of EIS computations.

use chrono::{DateTime, Utc};
use turso::Database;

use crate::error::Result;
use crate::models::VideoAggregate;
use crate::repos::users::parse_rfc3339;

/// Video aggregate repository
pub struct AggregateRepo<'a> {
    db: &'a Database,
}

impl<'a> AggregateRepo<'a> {
    /// Create a new aggregate repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append an aggregate row
    pub async fn insert(&self, agg: &VideoAggregate) -> Result<()> {
        let conn = self.db.connect()?;

        let video = agg.video_id.to_string();
        let start = agg.window_start.to_rfc3339();
        let end = agg.window_end.to_rfc3339();
        let eis = agg.eis.to_string();
        let ae = agg.authentic_engagement.to_string();
        let cq = agg.comment_quality.to_string();
        let li = agg.like_integrity.to_string();
        let rc = agg.report_credibility.to_string();
        let breakdown = serde_json::to_string(&agg.breakdown)?;
        let created = agg.created_at.to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO video_aggregates
                (video_id, window_start, window_end, eis, authentic_engagement,
                 comment_quality, like_integrity, report_credibility, breakdown, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            [
                video.as_str(),
                start.as_str(),
                end.as_str(),
                eis.as_str(),
                ae.as_str(),
                cq.as_str(),
                li.as_str(),
                rc.as_str(),
                breakdown.as_str(),
                created.as_str(),
            ],
        )
        .await?;

        Ok(())
    }

    /// Aggregates for a video whose windows fall inside [start, end)
    pub async fn for_video_in(
        &self,
        video_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VideoAggregate>> {
        let conn = self.db.connect()?;

        let video = video_id.to_string();
        let start_s = start.to_rfc3339();
        let end_s = end.to_rfc3339();
        let mut rows = conn
            .query(
                r#"
                SELECT * FROM video_aggregates
                WHERE video_id = ?1 AND window_start >= ?2 AND window_end <= ?3
                ORDER BY window_start
                "#,
                [video.as_str(), start_s.as_str(), end_s.as_str()],
            )
            .await?;

        let mut aggs = Vec::new();
        while let Some(row) = rows.next().await? {
            aggs.push(Self::row_to_aggregate(&row)?);
        }

        Ok(aggs)
    }

    fn row_to_aggregate(row: &turso::Row) -> Result<VideoAggregate> {
        let id = *row.get_value(0)?.as_integer().unwrap_or(&0);
        let video_id = *row.get_value(1)?.as_integer().unwrap_or(&0);
        let window_start = row
            .get_value(2)?
            .as_text()
            .and_then(|s| parse_rfc3339(s))
            .unwrap_or_else(Utc::now);
        let window_end = row
            .get_value(3)?
            .as_text()
            .and_then(|s| parse_rfc3339(s))
            .unwrap_or_else(Utc::now);
        let eis = *row.get_value(4)?.as_real().unwrap_or(&0.0);
        let authentic_engagement = *row.get_value(5)?.as_real().unwrap_or(&0.0);
        let comment_quality = *row.get_value(6)?.as_real().unwrap_or(&0.0);
        let like_integrity = *row.get_value(7)?.as_real().unwrap_or(&0.0);
        let report_credibility = *row.get_value(8)?.as_real().unwrap_or(&0.0);
        let breakdown = row
            .get_value(9)?
            .as_text()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        let created_at = row
            .get_value(10)?
            .as_text()
            .and_then(|s| parse_rfc3339(s))
            .unwrap_or_else(Utc::now);

        Ok(VideoAggregate {
            id,
            video_id,
            window_start,
            window_end,
            eis,
            authentic_engagement,
            comment_quality,
            like_integrity,
            report_credibility,
            breakdown,
            created_at,
        })
    }
}
