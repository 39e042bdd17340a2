//! Ledger transactions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    OnHold,
    Completed,
    Failed,
}

impl TxStatus {
    /// The canonical stored name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a stored status, defaulting to `Pending` on unknown text
    pub fn parse(s: &str) -> Self {
        match s {
            "on_hold" => Self::OnHold,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Money direction relative to the creator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxDirection {
    Inflow,
    Outflow,
}

impl TxDirection {
    /// The canonical stored name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inflow => "inflow",
            Self::Outflow => "outflow",
        }
    }

    /// Parse a stored direction, defaulting to `Inflow` on unknown text
    pub fn parse(s: &str) -> Self {
        match s {
            "outflow" => Self::Outflow,
            _ => Self::Inflow,
        }
    }
}

/// A ledger transaction (append-only ledger of record)
///
/// `current_balance_cents` on the user is a cache; the sum of completed
/// inflows minus completed outflows here is the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Creator user id receiving (or paying) the amount
    pub recipient: i64,
    pub amount_cents: i64,
    pub status: TxStatus,
    /// Run type, e.g. "payout", "reserve", "revenue_split_monthly"
    pub payment_type: String,
    pub direction: TxDirection,
    /// Calendar period the run covered, e.g. "2026-07" or "2026-07-14"
    pub period_key: Option<String>,
    /// When an on-hold reserve becomes releasable
    pub hold_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a pending inflow transaction (id 0 until inserted)
    pub fn inflow(recipient: i64, amount_cents: i64, payment_type: impl Into<String>) -> Self {
        Self {
            id: 0,
            recipient,
            amount_cents,
            status: TxStatus::Pending,
            payment_type: payment_type.into(),
            direction: TxDirection::Inflow,
            period_key: None,
            hold_until: None,
            created_at: Utc::now(),
        }
    }

    /// Set the status
    pub fn with_status(mut self, status: TxStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the calendar period key
    pub fn with_period(mut self, period_key: impl Into<String>) -> Self {
        self.period_key = Some(period_key.into());
        self
    }

    /// Set the reserve hold expiry
    pub fn with_hold_until(mut self, hold_until: DateTime<Utc>) -> Self {
        self.hold_until = Some(hold_until);
        self
    }
}
