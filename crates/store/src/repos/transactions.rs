//! Transaction repository
//!
//! The append-only ledger of record, plus the payout-run guard that makes
//! recurring runs at-most-once per calendar period.

use chrono::Utc;
use tracing::{debug, warn};
use turso::Database;

use crate::error::Result;
use crate::models::{Transaction, TxDirection, TxStatus};
use crate::repos::users::parse_rfc3339;

/// Transaction repository
pub struct TransactionRepo<'a> {
    db: &'a Database,
}

impl<'a> TransactionRepo<'a> {
    /// Create a new transaction repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append a ledger row
    pub async fn insert(&self, tx: &Transaction) -> Result<()> {
        let conn = self.db.connect()?;

        let recipient = tx.recipient.to_string();
        let amount = tx.amount_cents.to_string();
        let hold = tx
            .hold_until
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let created = tx.created_at.to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO transactions
                (recipient, amount_cents, status, payment_type, direction,
                 period_key, hold_until, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, NULLIF(?6, ''), NULLIF(?7, ''), ?8)
            "#,
            [
                recipient.as_str(),
                amount.as_str(),
                tx.status.as_str(),
                tx.payment_type.as_str(),
                tx.direction.as_str(),
                tx.period_key.as_deref().unwrap_or(""),
                hold.as_str(),
                created.as_str(),
            ],
        )
        .await?;

        debug!(
            recipient = tx.recipient,
            amount_cents = tx.amount_cents,
            payment_type = %tx.payment_type,
            "Appended ledger row"
        );
        Ok(())
    }

    /// Claim a (payment_type, period) run
    ///
    /// Returns `true` if this caller won the claim and may write payouts;
    /// `false` if the period was already processed. Orchestrators run one
    /// at a time; if two racing claims do slip past the existence check,
    /// the primary key on `payout_runs` fails the second insert with an
    /// error, so it still aborts before writing payouts.
    pub async fn claim_run(&self, payment_type: &str, period_key: &str) -> Result<bool> {
        if self.run_exists(payment_type, period_key).await? {
            warn!(payment_type, period_key, "Run already claimed for period");
            return Ok(false);
        }

        let conn = self.db.connect()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO payout_runs (payment_type, period_key, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            [payment_type, period_key, now.as_str()],
        )
        .await?;

        Ok(true)
    }

    /// Release a claimed run after a failed commit
    ///
    /// Deletes the guard row so the period can be retried. Callers release
    /// only on an error path, before any successful run completes.
    pub async fn release_run(&self, payment_type: &str, period_key: &str) -> Result<()> {
        let conn = self.db.connect()?;

        conn.execute(
            "DELETE FROM payout_runs WHERE payment_type = ?1 AND period_key = ?2",
            [payment_type, period_key],
        )
        .await?;

        warn!(payment_type, period_key, "Released claim for period");
        Ok(())
    }

    /// Whether a run has been committed for a period
    pub async fn run_exists(&self, payment_type: &str, period_key: &str) -> Result<bool> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM payout_runs WHERE payment_type = ?1 AND period_key = ?2",
                [payment_type, period_key],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let count: i64 = row.get(0)?;
            Ok(count > 0)
        } else {
            Ok(false)
        }
    }

    /// Count ledger rows for a (payment_type, period)
    pub async fn count_for_period(&self, payment_type: &str, period_key: &str) -> Result<i64> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM transactions WHERE payment_type = ?1 AND period_key = ?2",
                [payment_type, period_key],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let count: i64 = row.get(0)?;
            Ok(count)
        } else {
            Ok(0)
        }
    }

    /// Ledger rows for a recipient, newest first
    pub async fn for_recipient(&self, recipient: i64) -> Result<Vec<Transaction>> {
        let conn = self.db.connect()?;

        let recipient_s = recipient.to_string();
        let mut rows = conn
            .query(
                "SELECT * FROM transactions WHERE recipient = ?1 ORDER BY created_at DESC",
                [recipient_s.as_str()],
            )
            .await?;

        let mut txs = Vec::new();
        while let Some(row) = rows.next().await? {
            txs.push(Self::row_to_tx(&row)?);
        }

        Ok(txs)
    }

    /// Recompute a recipient's balance from the ledger
    ///
    /// Sum of disbursed inflows minus outflows, where disbursed means
    /// pending or completed. On-hold reserves and failed rows never touch
    /// the balance. This is the compensating control when the cached
    /// balance drifts.
    pub async fn recompute_balance(&self, recipient: i64) -> Result<i64> {
        let conn = self.db.connect()?;

        let recipient_s = recipient.to_string();
        let mut rows = conn
            .query(
                r#"
                SELECT COALESCE(SUM(
                    CASE WHEN direction = 'inflow' THEN amount_cents
                         ELSE -amount_cents END), 0)
                FROM transactions
                WHERE recipient = ?1 AND status IN ('pending', 'completed')
                "#,
                [recipient_s.as_str()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let balance: i64 = row.get(0)?;
            Ok(balance)
        } else {
            Ok(0)
        }
    }

    fn row_to_tx(row: &turso::Row) -> Result<Transaction> {
        let id = *row.get_value(0)?.as_integer().unwrap_or(&0);
        let recipient = *row.get_value(1)?.as_integer().unwrap_or(&0);
        let amount_cents = *row.get_value(2)?.as_integer().unwrap_or(&0);
        let status = row
            .get_value(3)?
            .as_text()
            .map(|s| TxStatus::parse(s))
            .unwrap_or(TxStatus::Pending);
        let payment_type = row
            .get_value(4)?
            .as_text()
            .cloned()
            .unwrap_or_default();
        let direction = row
            .get_value(5)?
            .as_text()
            .map(|s| TxDirection::parse(s))
            .unwrap_or(TxDirection::Inflow);
        let period_key = row.get_value(6)?.as_text().cloned();
        let hold_until = row
            .get_value(7)?
            .as_text()
            .and_then(|s| parse_rfc3339(s));
        let created_at = row
            .get_value(8)?
            .as_text()
            .and_then(|s| parse_rfc3339(s))
            .unwrap_or_else(Utc::now);

        Ok(Transaction {
            id,
            recipient,
            amount_cents,
            status,
            payment_type,
            direction,
            period_key,
            hold_until,
            created_at,
        })
    }
}
