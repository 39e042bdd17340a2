//! Event repository
//!
//! Read access to the append-only viewer interaction log.

use chrono::{DateTime, Utc};
use turso::Database;

use crate::error::Result;
use crate::models::{EventKind, ViewerEvent};
use crate::repos::users::parse_rfc3339;

/// Event repository
pub struct EventRepo<'a> {
    db: &'a Database,
}

impl<'a> EventRepo<'a> {
    /// Create a new event repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append an event (seeding and tests; ingestion owns this in prod)
    pub async fn insert(&self, event: &ViewerEvent) -> Result<()> {
        let conn = self.db.connect()?;

        let video = event.video_id.to_string();
        let user = event.user_id.to_string();
        let ts = event.ts.to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO event (video_id, user_id, event_type, ts, device_id, ip_hash)
            VALUES (?1, ?2, ?3, ?4, NULLIF(?5, ''), NULLIF(?6, ''))
            "#,
            [
                video.as_str(),
                user.as_str(),
                event.kind.as_str(),
                ts.as_str(),
                event.device_id.as_deref().unwrap_or(""),
                event.ip_hash.as_deref().unwrap_or(""),
            ],
        )
        .await?;

        Ok(())
    }

    /// Events for one video in [start, end), ordered by timestamp
    pub async fn for_video_in(
        &self,
        video_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ViewerEvent>> {
        let conn = self.db.connect()?;

        let video = video_id.to_string();
        let start_s = start.to_rfc3339();
        let end_s = end.to_rfc3339();
        let mut rows = conn
            .query(
                r#"
                SELECT * FROM event
                WHERE video_id = ?1 AND ts >= ?2 AND ts < ?3
                ORDER BY ts
                "#,
                [video.as_str(), start_s.as_str(), end_s.as_str()],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(Self::row_to_event(&row)?);
        }

        Ok(events)
    }

    /// All events in [start, end), ordered by timestamp
    pub async fn in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ViewerEvent>> {
        let conn = self.db.connect()?;

        let start_s = start.to_rfc3339();
        let end_s = end.to_rfc3339();
        let mut rows = conn
            .query(
                "SELECT * FROM event WHERE ts >= ?1 AND ts < ?2 ORDER BY ts",
                [start_s.as_str(), end_s.as_str()],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(Self::row_to_event(&row)?);
        }

        Ok(events)
    }

    /// Count events in [start, end)
    ///
    /// Fast path for skipping empty days without loading rows.
    pub async fn count_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64> {
        let conn = self.db.connect()?;

        let start_s = start.to_rfc3339();
        let end_s = end.to_rfc3339();
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM event WHERE ts >= ?1 AND ts < ?2",
                [start_s.as_str(), end_s.as_str()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let count: i64 = row.get(0)?;
            Ok(count)
        } else {
            Ok(0)
        }
    }

    /// Distinct video ids with any event in [start, end)
    pub async fn video_ids_in(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        let conn = self.db.connect()?;

        let start_s = start.to_rfc3339();
        let end_s = end.to_rfc3339();
        let mut rows = conn
            .query(
                r#"
                SELECT DISTINCT video_id FROM event
                WHERE ts >= ?1 AND ts < ?2
                ORDER BY video_id
                "#,
                [start_s.as_str(), end_s.as_str()],
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: i64 = row.get(0)?;
            ids.push(id);
        }

        Ok(ids)
    }

    fn row_to_event(row: &turso::Row) -> Result<ViewerEvent> {
        let id = *row.get_value(0)?.as_integer().unwrap_or(&0);
        let video_id = *row.get_value(1)?.as_integer().unwrap_or(&0);
        let user_id = *row.get_value(2)?.as_integer().unwrap_or(&0);
        let kind = row
            .get_value(3)?
            .as_text()
            .map(|s| EventKind::parse(s))
            .unwrap_or(EventKind::Unknown(String::new()));
        let ts = row
            .get_value(4)?
            .as_text()
            .and_then(|s| parse_rfc3339(s))
            .unwrap_or_else(Utc::now);
        let device_id = row.get_value(5)?.as_text().cloned();
        let ip_hash = row.get_value(6)?.as_text().cloned();

        Ok(ViewerEvent {
            id,
            video_id,
            user_id,
            kind,
            ts,
            device_id,
            ip_hash,
        })
    }
}
