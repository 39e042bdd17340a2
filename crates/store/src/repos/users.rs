//! User repository
//!
//! Reads user/creator records and applies additive balance updates.

use chrono::{DateTime, Utc};
use tracing::debug;
use turso::Database;

use crate::error::{Result, StoreError};
use crate::models::User;

/// User repository
pub struct UserRepo<'a> {
    db: &'a Database,
}

impl<'a> UserRepo<'a> {
    /// Create a new user repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a user row (seeding and tests; ingestion owns this in prod)
    pub async fn insert(&self, user: &User) -> Result<()> {
        let conn = self.db.connect()?;

        let id = user.id.to_string();
        let kyc = user.kyc_level.to_string();
        let cts = user
            .creator_trust_score
            .map(|v| v.to_string())
            .unwrap_or_default();
        let vts = user
            .viewer_trust_score
            .map(|v| v.to_string())
            .unwrap_or_default();
        let bot = if user.likely_bot { "1" } else { "0" };
        let created = user
            .account_created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let balance = user.current_balance_cents.to_string();

        conn.execute(
            r#"
            INSERT INTO users (id, kyc_level, creator_trust_score, viewer_trust_score,
                               likely_bot, account_created_at, current_balance_cents)
            VALUES (?1, ?2, NULLIF(?3, ''), NULLIF(?4, ''), ?5, NULLIF(?6, ''), ?7)
            "#,
            [
                id.as_str(),
                kyc.as_str(),
                cts.as_str(),
                vts.as_str(),
                bot,
                created.as_str(),
                balance.as_str(),
            ],
        )
        .await?;

        Ok(())
    }

    /// Get a user by id
    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        let conn = self.db.connect()?;

        let id_s = id.to_string();
        let mut rows = conn
            .query("SELECT * FROM users WHERE id = ?1", [id_s.as_str()])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_user(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Get a user by id, erroring when absent
    pub async fn get_required(&self, id: i64) -> Result<User> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    /// Fetch users for a set of ids
    ///
    /// Ids with no matching row are simply absent from the result.
    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.db.connect()?;

        // Integer ids formatted inline; no user-controlled text involved.
        let id_list = ids
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!("SELECT * FROM users WHERE id IN ({})", id_list);

        let mut rows = conn.query(&sql, ()).await?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(Self::row_to_user(&row)?);
        }

        Ok(users)
    }

    /// Add to a user's cached balance
    ///
    /// The balance is always adjusted in place, never overwritten from a
    /// stale read; the transaction ledger remains the source of truth.
    pub async fn add_balance(&self, id: i64, delta_cents: i64) -> Result<()> {
        let conn = self.db.connect()?;

        let delta = delta_cents.to_string();
        let id_s = id.to_string();
        let affected = conn
            .execute(
                "UPDATE users SET current_balance_cents = current_balance_cents + ?1 WHERE id = ?2",
                [delta.as_str(), id_s.as_str()],
            )
            .await?;

        if affected == 0 {
            return Err(StoreError::not_found("user", id));
        }

        debug!(user_id = id, delta_cents, "Adjusted cached balance");
        Ok(())
    }

    /// Overwrite a user's cached balance with a ledger-derived value
    ///
    /// Used by the balance reconciliation pass, not by payout runs.
    pub async fn set_balance(&self, id: i64, balance_cents: i64) -> Result<()> {
        let conn = self.db.connect()?;

        let balance = balance_cents.to_string();
        let id_s = id.to_string();
        let affected = conn
            .execute(
                "UPDATE users SET current_balance_cents = ?1 WHERE id = ?2",
                [balance.as_str(), id_s.as_str()],
            )
            .await?;

        if affected == 0 {
            return Err(StoreError::not_found("user", id));
        }

        Ok(())
    }

    fn row_to_user(row: &turso::Row) -> Result<User> {
        let id = *row.get_value(0)?.as_integer().unwrap_or(&0);
        let kyc_level = *row.get_value(1)?.as_integer().unwrap_or(&0);
        let creator_trust_score = row.get_value(2)?.as_real().copied();
        let viewer_trust_score = row.get_value(3)?.as_real().copied();
        let likely_bot = *row.get_value(4)?.as_integer().unwrap_or(&0) != 0;
        let account_created_at = row
            .get_value(5)?
            .as_text()
            .and_then(|s| parse_rfc3339(s));
        let current_balance_cents = *row.get_value(6)?.as_integer().unwrap_or(&0);

        Ok(User {
            id,
            kyc_level,
            creator_trust_score,
            viewer_trust_score,
            likely_bot,
            account_created_at,
            current_balance_cents,
        })
    }
}

pub(crate) fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
