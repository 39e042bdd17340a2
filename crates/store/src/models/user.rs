//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored user record
///
/// `kyc_level` is assigned by an external KYC rule engine and treated here
/// as an opaque risk tier. `current_balance_cents` is a derived cache of
/// the transaction ledger, mutated only by addition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// KYC risk tier (0 = unverified, higher = more verified)
    pub kyc_level: i64,
    /// Rolling average of the creator's recent video EIS values
    pub creator_trust_score: Option<f64>,
    /// Explicit viewer trust score, when one has been stored
    pub viewer_trust_score: Option<f64>,
    /// Bot-detection flag
    pub likely_bot: bool,
    pub account_created_at: Option<DateTime<Utc>>,
    /// Cached ledger balance
    pub current_balance_cents: i64,
}

impl User {
    /// Create a user record with neutral defaults
    pub fn new(id: i64, kyc_level: i64) -> Self {
        Self {
            id,
            kyc_level,
            creator_trust_score: None,
            viewer_trust_score: None,
            likely_bot: false,
            account_created_at: None,
            current_balance_cents: 0,
        }
    }

    /// Set the creator trust score
    pub fn with_creator_trust(mut self, score: f64) -> Self {
        self.creator_trust_score = Some(score);
        self
    }

    /// Set the viewer trust score
    pub fn with_viewer_trust(mut self, score: f64) -> Self {
        self.viewer_trust_score = Some(score);
        self
    }

    /// Flag as a likely bot
    pub fn with_likely_bot(mut self, likely_bot: bool) -> Self {
        self.likely_bot = likely_bot;
        self
    }

    /// Set the account creation time
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.account_created_at = Some(at);
        self
    }
}
