//! Video repository

use chrono::{DateTime, Utc};
use tracing::debug;
use turso::Database;

use crate::error::{Result, StoreError};
use crate::models::Video;
use crate::repos::users::parse_rfc3339;

/// Video repository
pub struct VideoRepo<'a> {
    db: &'a Database,
}

impl<'a> VideoRepo<'a> {
    /// Create a new video repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a video row (seeding and tests; upload owns this in prod)
    pub async fn insert(&self, video: &Video) -> Result<()> {
        let conn = self.db.connect()?;

        let id = video.id.to_string();
        let creator = video.creator_id.to_string();
        let created = video.created_at.to_rfc3339();
        let duration = video
            .duration_seconds
            .map(|v| v.to_string())
            .unwrap_or_default();

        conn.execute(
            r#"
            INSERT INTO videos (id, creator_id, created_at, duration_seconds)
            VALUES (?1, ?2, ?3, NULLIF(?4, ''))
            "#,
            [id.as_str(), creator.as_str(), created.as_str(), duration.as_str()],
        )
        .await?;

        Ok(())
    }

    /// Get a video by id
    pub async fn get(&self, id: i64) -> Result<Option<Video>> {
        let conn = self.db.connect()?;

        let id_s = id.to_string();
        let mut rows = conn
            .query("SELECT * FROM videos WHERE id = ?1", [id_s.as_str()])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_video(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Get a video by id, erroring when absent
    pub async fn get_required(&self, id: i64) -> Result<Video> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("video", id))
    }

    /// Fetch videos for a set of ids
    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<Video>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.db.connect()?;

        let id_list = ids
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!("SELECT * FROM videos WHERE id IN ({})", id_list);

        let mut rows = conn.query(&sql, ()).await?;
        let mut videos = Vec::new();
        while let Some(row) = rows.next().await? {
            videos.push(Self::row_to_video(&row)?);
        }

        Ok(videos)
    }

    /// Update the EIS snapshot on a video (last-write-wins)
    pub async fn update_eis(&self, id: i64, eis: f64, at: DateTime<Utc>) -> Result<()> {
        let conn = self.db.connect()?;

        let eis_s = eis.to_string();
        let at_s = at.to_rfc3339();
        let id_s = id.to_string();
        let affected = conn
            .execute(
                "UPDATE videos SET eis_current = ?1, eis_updated_at = ?2 WHERE id = ?3",
                [eis_s.as_str(), at_s.as_str(), id_s.as_str()],
            )
            .await?;

        if affected == 0 {
            return Err(StoreError::not_found("video", id));
        }

        debug!(video_id = id, eis, "Updated EIS snapshot");
        Ok(())
    }

    /// The most recently scored videos for a creator
    ///
    /// Returns up to `limit` videos with a non-null `eis_current`, newest
    /// `eis_updated_at` first. Feeds the Creator Trust Score.
    pub async fn recent_scored_for_creator(
        &self,
        creator_id: i64,
        limit: u32,
    ) -> Result<Vec<Video>> {
        let conn = self.db.connect()?;

        let creator = creator_id.to_string();
        let limit_s = limit.to_string();
        let mut rows = conn
            .query(
                r#"
                SELECT * FROM videos
                WHERE creator_id = ?1 AND eis_current IS NOT NULL
                ORDER BY eis_updated_at DESC
                LIMIT ?2
                "#,
                [creator.as_str(), limit_s.as_str()],
            )
            .await?;

        let mut videos = Vec::new();
        while let Some(row) = rows.next().await? {
            videos.push(Self::row_to_video(&row)?);
        }

        Ok(videos)
    }

    /// All of a creator's videos whose EIS snapshot was updated since `since`
    ///
    /// Feeds the 7-day integrity streak bonus.
    pub async fn scored_for_creator_since(
        &self,
        creator_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<Video>> {
        let conn = self.db.connect()?;

        let creator = creator_id.to_string();
        let since_s = since.to_rfc3339();
        let mut rows = conn
            .query(
                r#"
                SELECT * FROM videos
                WHERE creator_id = ?1 AND eis_updated_at >= ?2
                "#,
                [creator.as_str(), since_s.as_str()],
            )
            .await?;

        let mut videos = Vec::new();
        while let Some(row) = rows.next().await? {
            videos.push(Self::row_to_video(&row)?);
        }

        Ok(videos)
    }

    fn row_to_video(row: &turso::Row) -> Result<Video> {
        let id = *row.get_value(0)?.as_integer().unwrap_or(&0);
        let creator_id = *row.get_value(1)?.as_integer().unwrap_or(&0);
        let created_at = row
            .get_value(2)?
            .as_text()
            .and_then(|s| parse_rfc3339(s))
            .unwrap_or_else(Utc::now);
        let duration_seconds = row.get_value(3)?.as_real().copied();
        let eis_current = row.get_value(4)?.as_real().copied();
        let eis_updated_at = row
            .get_value(5)?
            .as_text()
            .and_then(|s| parse_rfc3339(s));

        Ok(Video {
            id,
            creator_id,
            created_at,
            duration_seconds,
            eis_current,
            eis_updated_at,
        })
    }
}
