//! Payout splitting and ledger writes
//!
//! Takes final per-creator allocations and turns them into ledger rows:
//! a pending net payout, an on-hold risk reserve, and a balance bump.
//! The platform fee is retained, not ledgered per creator.

use chrono::{Duration, Utc};
use serde::Serialize;
use slice_config::PolicyConfig;
use slice_store::{Store, Transaction, TxStatus};
use tracing::info;

use crate::error::Result;

/// How one allocation splits into fee, reserve and net
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayoutSplit {
    pub gross_cents: i64,
    pub fee_cents: i64,
    pub reserve_cents: i64,
    pub net_cents: i64,
    /// Net fell below the minimum and was folded into the reserve
    pub deferred: bool,
}

/// Split an allocation into platform fee, risk reserve and net payout
///
/// Fee and reserve are floored so the creator always receives at least
/// the exact remainder. A net below the payout minimum is not paid out;
/// it joins the reserve and is released with it later.
pub fn split_payout(gross_cents: i64, policy: &PolicyConfig) -> PayoutSplit {
    let gross = gross_cents.max(0);
    let fee_cents = (gross as f64 * policy.platform_fee_pct).floor() as i64;
    let mut reserve_cents = (gross as f64 * policy.risk_reserve_pct).floor() as i64;
    let mut net_cents = gross - fee_cents - reserve_cents;

    let deferred = net_cents > 0 && net_cents < policy.min_payout_cents;
    if deferred {
        reserve_cents += net_cents;
        net_cents = 0;
    }

    PayoutSplit {
        gross_cents: gross,
        fee_cents,
        reserve_cents,
        net_cents,
        deferred,
    }
}

/// Summary of one committed payout batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct PayoutBatch {
    pub creators_paid: usize,
    pub creators_deferred: usize,
    pub total_net_cents: i64,
    pub total_reserve_cents: i64,
    pub total_fee_cents: i64,
}

/// Writes payout ledger rows and balance bumps
pub struct PayoutWriter<'a> {
    store: &'a Store,
    policy: &'a PolicyConfig,
}

impl<'a> PayoutWriter<'a> {
    /// Create a payout writer
    pub fn new(store: &'a Store, policy: &'a PolicyConfig) -> Self {
        Self { store, policy }
    }

    /// Commit one creator's allocation to the ledger
    ///
    /// Writes a pending net inflow (settlement flips it to completed
    /// downstream) plus an on-hold reserve inflow, then bumps the cached
    /// balance by the net. The bump is an additive SQL update, so
    /// concurrent commits cannot lose increments.
    pub async fn commit(
        &self,
        creator_id: i64,
        gross_cents: i64,
        payment_type: &str,
        period_key: &str,
    ) -> Result<PayoutSplit> {
        let split = split_payout(gross_cents, self.policy);

        if split.net_cents > 0 {
            let tx = Transaction::inflow(creator_id, split.net_cents, payment_type)
                .with_period(period_key);
            self.store.transactions().insert(&tx).await?;
            self.store.users().add_balance(creator_id, split.net_cents).await?;
        }

        if split.reserve_cents > 0 {
            let hold_until = Utc::now() + Duration::days(self.policy.hold_days);
            let tx = Transaction::inflow(creator_id, split.reserve_cents, "reserve")
                .with_status(TxStatus::OnHold)
                .with_period(period_key)
                .with_hold_until(hold_until);
            self.store.transactions().insert(&tx).await?;
        }

        Ok(split)
    }

    /// Commit a whole batch of allocations
    pub async fn commit_batch(
        &self,
        allocations: impl IntoIterator<Item = (i64, i64)>,
        payment_type: &str,
        period_key: &str,
    ) -> Result<PayoutBatch> {
        let mut batch = PayoutBatch::default();
        for (creator_id, gross_cents) in allocations {
            let split = self.commit(creator_id, gross_cents, payment_type, period_key).await?;
            if split.net_cents > 0 {
                batch.creators_paid += 1;
            }
            if split.deferred {
                batch.creators_deferred += 1;
            }
            batch.total_net_cents += split.net_cents;
            batch.total_reserve_cents += split.reserve_cents;
            batch.total_fee_cents += split.fee_cents;
        }

        info!(
            payment_type,
            period_key,
            creators_paid = batch.creators_paid,
            net_cents = batch.total_net_cents,
            reserve_cents = batch.total_reserve_cents,
            "Committed payout batch"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slice_store::{TxDirection, User};

    #[test]
    fn test_split_floors_favor_the_creator() {
        let policy = PolicyConfig::default();
        // 10% fee, 10% reserve on 10001: floors leave the odd cent in net.
        let split = split_payout(10_001, &policy);
        assert_eq!(split.fee_cents, 1_000);
        assert_eq!(split.reserve_cents, 1_000);
        assert_eq!(split.net_cents, 8_001);
        assert!(!split.deferred);
        assert_eq!(
            split.fee_cents + split.reserve_cents + split.net_cents,
            split.gross_cents
        );
    }

    #[test]
    fn test_sub_minimum_net_is_deferred_into_reserve() {
        let policy = PolicyConfig::default();
        // Net 800 < min 1000: folded into the reserve, nothing paid.
        let split = split_payout(1_000, &policy);
        assert_eq!(split.net_cents, 0);
        assert_eq!(split.reserve_cents, 900);
        assert!(split.deferred);
    }

    #[test]
    fn test_zero_and_negative_amounts_are_noops() {
        let policy = PolicyConfig::default();
        let split = split_payout(0, &policy);
        assert_eq!(split.net_cents, 0);
        assert!(!split.deferred);
        assert_eq!(split_payout(-500, &policy).gross_cents, 0);
    }

    #[tokio::test]
    async fn test_commit_writes_ledger_and_balance() {
        let store = Store::new_memory().await.unwrap();
        let policy = PolicyConfig::default();
        store.users().insert(&User::new(1, 2)).await.unwrap();

        let writer = PayoutWriter::new(&store, &policy);
        let split = writer.commit(1, 10_000, "revenue_split_daily", "2026-07-14").await.unwrap();
        assert_eq!(split.net_cents, 8_000);

        let user = store.users().get_required(1).await.unwrap();
        assert_eq!(user.current_balance_cents, 8_000);

        let txs = store.transactions().for_recipient(1).await.unwrap();
        assert_eq!(txs.len(), 2);
        let reserve = txs.iter().find(|t| t.payment_type == "reserve").unwrap();
        assert_eq!(reserve.status, TxStatus::OnHold);
        assert_eq!(reserve.amount_cents, 1_000);
        assert!(reserve.hold_until.is_some());
        let net = txs.iter().find(|t| t.payment_type == "revenue_split_daily").unwrap();
        assert_eq!(net.direction, TxDirection::Inflow);
        assert_eq!(net.status, TxStatus::Pending);
        assert_eq!(net.amount_cents, 8_000);

        // The cached balance matches the ledger-derived one.
        let derived = store.transactions().recompute_balance(1).await.unwrap();
        assert_eq!(derived, 8_000);
    }

    #[tokio::test]
    async fn test_deferred_commit_pays_nothing() {
        let store = Store::new_memory().await.unwrap();
        let policy = PolicyConfig::default();
        store.users().insert(&User::new(1, 1)).await.unwrap();

        let writer = PayoutWriter::new(&store, &policy);
        let batch = writer
            .commit_batch([(1i64, 1_000i64)], "revenue_split_daily", "2026-07-14")
            .await
            .unwrap();

        assert_eq!(batch.creators_paid, 0);
        assert_eq!(batch.creators_deferred, 1);
        let user = store.users().get_required(1).await.unwrap();
        assert_eq!(user.current_balance_cents, 0);
    }
}
