//! Viewer Trust Score (VTS)
//!
//! A 0-100 per-user trust estimate derived from account age, bot flags,
//! and KYC level. Used to weight comment/like/report signals.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use slice_store::User;

/// Neutral score assumed for users with no stored record
pub const DEFAULT_VTS: f64 = 50.0;

/// Compute the Viewer Trust Score for a single user record
///
/// Starts from the explicit stored score when present, otherwise derives a
/// base from account age (`40 + 0.25 per day`, missing creation time falls
/// back to a neutral 50). Bot flags and KYC risk tiers adjust the base;
/// the result is clamped to [0, 100].
pub fn vts_for_user(user: &User, now: DateTime<Utc>) -> f64 {
    let mut vts = match user.viewer_trust_score {
        Some(score) => score,
        None => match user.account_created_at {
            Some(created) => {
                let age_days = (now - created).num_days().max(0) as f64;
                40.0 + 0.25 * age_days
            }
            None => 50.0,
        },
    };

    if user.likely_bot {
        vts -= 30.0;
    }

    // KYC risk tiers: 1 low .. 4 critical
    vts += match user.kyc_level {
        1 => 5.0,
        2 => 0.0,
        3 => -15.0,
        4 => -40.0,
        _ => 0.0,
    };

    vts.clamp(0.0, 100.0)
}

/// A batch of viewer trust scores keyed by user id
///
/// Users with no stored row are absent; lookups fall back to
/// [`DEFAULT_VTS`].
#[derive(Debug, Clone, Default)]
pub struct VtsMap {
    scores: HashMap<i64, f64>,
}

impl VtsMap {
    /// Build from user records
    pub fn from_users(users: &[User], now: DateTime<Utc>) -> Self {
        let scores = users
            .iter()
            .map(|u| (u.id, vts_for_user(u, now)))
            .collect();
        Self { scores }
    }

    /// Score for a user, neutral default when absent
    pub fn get_or_default(&self, user_id: i64) -> f64 {
        self.scores.get(&user_id).copied().unwrap_or(DEFAULT_VTS)
    }

    /// Number of scored users
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether any users are scored
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
