//! Revenue window repository

use chrono::Utc;
use tracing::info;
use turso::Database;

use crate::error::Result;
use crate::models::{RevenueWindow, VideoRevShare};
use crate::repos::users::parse_rfc3339;

/// Revenue window repository
pub struct WindowRepo<'a> {
    db: &'a Database,
}

impl<'a> WindowRepo<'a> {
    /// Create a new window repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a revenue window, returning its assigned id
    pub async fn insert(&self, win: &RevenueWindow) -> Result<i64> {
        let conn = self.db.connect()?;

        let start = win.window_start.to_rfc3339();
        let end = win.window_end.to_rfc3339();
        let gross = win.gross_revenue_cents.to_string();
        let taxes = win.taxes_cents.to_string();
        let store_fees = win.app_store_fees_cents.to_string();
        let refunds = win.refunds_cents.to_string();
        let pool_pct = win.pool_pct.to_string();
        let margin = win.margin_target.to_string();
        let reserve = win.risk_reserve_pct.to_string();
        let fee = win.platform_fee_pct.to_string();
        let costs = win.costs_est_cents.to_string();
        let pool = win.creator_pool_cents.to_string();
        let meta = serde_json::to_string(&win.meta)?;
        let created = win.created_at.to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO revenue_windows
                (window_start, window_end, gross_revenue_cents, taxes_cents,
                 app_store_fees_cents, refunds_cents, pool_pct, margin_target,
                 risk_reserve_pct, platform_fee_pct, costs_est_cents,
                 creator_pool_cents, meta, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            [
                start.as_str(),
                end.as_str(),
                gross.as_str(),
                taxes.as_str(),
                store_fees.as_str(),
                refunds.as_str(),
                pool_pct.as_str(),
                margin.as_str(),
                reserve.as_str(),
                fee.as_str(),
                costs.as_str(),
                pool.as_str(),
                meta.as_str(),
                created.as_str(),
            ],
        )
        .await?;

        let mut rows = conn.query("SELECT last_insert_rowid()", ()).await?;
        let id = if let Some(row) = rows.next().await? {
            row.get(0)?
        } else {
            0
        };

        info!(
            window_id = id,
            pool_cents = win.creator_pool_cents,
            "Recorded revenue window"
        );
        Ok(id)
    }

    /// Get a revenue window by id
    pub async fn get(&self, id: i64) -> Result<Option<RevenueWindow>> {
        let conn = self.db.connect()?;

        let id_s = id.to_string();
        let mut rows = conn
            .query("SELECT * FROM revenue_windows WHERE id = ?1", [id_s.as_str()])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_window(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Append one video's share of a window
    pub async fn insert_share(&self, share: &VideoRevShare) -> Result<()> {
        let conn = self.db.connect()?;

        let window = share.revenue_window_id.to_string();
        let video = share.video_id.to_string();
        let eng = share.eng_units.to_string();
        let eis = share.eis_avg.to_string();
        let vu = share.vu.to_string();
        let pct = share.share_pct.to_string();
        let alloc = share.allocated_cents.to_string();
        let meta = serde_json::to_string(&share.meta)?;

        conn.execute(
            r#"
            INSERT INTO video_rev_shares
                (revenue_window_id, video_id, eng_units, eis_avg, vu,
                 share_pct, allocated_cents, meta)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            [
                window.as_str(),
                video.as_str(),
                eng.as_str(),
                eis.as_str(),
                vu.as_str(),
                pct.as_str(),
                alloc.as_str(),
                meta.as_str(),
            ],
        )
        .await?;

        Ok(())
    }

    /// Shares recorded for a window, ordered by allocation (largest first)
    pub async fn shares_for_window(&self, window_id: i64) -> Result<Vec<VideoRevShare>> {
        let conn = self.db.connect()?;

        let window = window_id.to_string();
        let mut rows = conn
            .query(
                r#"
                SELECT * FROM video_rev_shares
                WHERE revenue_window_id = ?1
                ORDER BY allocated_cents DESC
                "#,
                [window.as_str()],
            )
            .await?;

        let mut shares = Vec::new();
        while let Some(row) = rows.next().await? {
            shares.push(Self::row_to_share(&row)?);
        }

        Ok(shares)
    }

    fn row_to_window(row: &turso::Row) -> Result<RevenueWindow> {
        let id = *row.get_value(0)?.as_integer().unwrap_or(&0);
        let window_start = row
            .get_value(1)?
            .as_text()
            .and_then(|s| parse_rfc3339(s))
            .unwrap_or_else(Utc::now);
        let window_end = row
            .get_value(2)?
            .as_text()
            .and_then(|s| parse_rfc3339(s))
            .unwrap_or_else(Utc::now);
        let gross_revenue_cents = *row.get_value(3)?.as_integer().unwrap_or(&0);
        let taxes_cents = *row.get_value(4)?.as_integer().unwrap_or(&0);
        let app_store_fees_cents = *row.get_value(5)?.as_integer().unwrap_or(&0);
        let refunds_cents = *row.get_value(6)?.as_integer().unwrap_or(&0);
        let pool_pct = *row.get_value(7)?.as_real().unwrap_or(&0.0);
        let margin_target = *row.get_value(8)?.as_real().unwrap_or(&0.0);
        let risk_reserve_pct = *row.get_value(9)?.as_real().unwrap_or(&0.0);
        let platform_fee_pct = *row.get_value(10)?.as_real().unwrap_or(&0.0);
        let costs_est_cents = *row.get_value(11)?.as_integer().unwrap_or(&0);
        let creator_pool_cents = *row.get_value(12)?.as_integer().unwrap_or(&0);
        let meta = row
            .get_value(13)?
            .as_text()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        let created_at = row
            .get_value(14)?
            .as_text()
            .and_then(|s| parse_rfc3339(s))
            .unwrap_or_else(Utc::now);

        Ok(RevenueWindow {
            id,
            window_start,
            window_end,
            gross_revenue_cents,
            taxes_cents,
            app_store_fees_cents,
            refunds_cents,
            pool_pct,
            margin_target,
            risk_reserve_pct,
            platform_fee_pct,
            costs_est_cents,
            creator_pool_cents,
            meta,
            created_at,
        })
    }

    fn row_to_share(row: &turso::Row) -> Result<VideoRevShare> {
        let id = *row.get_value(0)?.as_integer().unwrap_or(&0);
        let revenue_window_id = *row.get_value(1)?.as_integer().unwrap_or(&0);
        let video_id = *row.get_value(2)?.as_integer().unwrap_or(&0);
        let eng_units = *row.get_value(3)?.as_real().unwrap_or(&0.0);
        let eis_avg = *row.get_value(4)?.as_real().unwrap_or(&0.0);
        let vu = *row.get_value(5)?.as_real().unwrap_or(&0.0);
        let share_pct = *row.get_value(6)?.as_real().unwrap_or(&0.0);
        let allocated_cents = *row.get_value(7)?.as_integer().unwrap_or(&0);
        let meta = row
            .get_value(8)?
            .as_text()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_else(|| serde_json::json!({}));

        Ok(VideoRevShare {
            id,
            revenue_window_id,
            video_id,
            eng_units,
            eis_avg,
            vu,
            share_pct,
            allocated_cents,
            meta,
        })
    }
}
