//! Payout policy knobs
//!
//! Percentages are fractions (0.45 = 45%), money is in integer cents.

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Policy knobs for pool sizing and payout splitting
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Base creator pool as a fraction of net revenue
    /// Default: 0.45
    pub pool_pct: f64,

    /// Margin guardrail as a fraction of gross revenue
    /// Default: 0.60
    pub margin_target: f64,

    /// Platform fee taken from each creator allocation
    /// Default: 0.10
    pub platform_fee_pct: f64,

    /// Fraction of each allocation held back as a risk reserve
    /// Default: 0.10
    pub risk_reserve_pct: f64,

    /// Estimated operating costs deducted when sizing a window pool (cents)
    /// Default: 0
    pub costs_est_cents: i64,

    /// EIS exponent for window-based video weights
    /// Default: 2.0
    pub gamma: f64,

    /// Payouts below this are deferred into the reserve (cents)
    /// Default: 1000 ($10.00)
    pub min_payout_cents: i64,

    /// Days a reserve transaction stays on hold
    /// Default: 14
    pub hold_days: i64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            pool_pct: 0.45,
            margin_target: 0.60,
            platform_fee_pct: 0.10,
            risk_reserve_pct: 0.10,
            costs_est_cents: 0,
            gamma: 2.0,
            min_payout_cents: 1000,
            hold_days: 14,
        }
    }
}

impl PolicyConfig {
    /// Validate that all fractions are sane
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("pool_pct", self.pool_pct),
            ("margin_target", self.margin_target),
            ("platform_fee_pct", self.platform_fee_pct),
            ("risk_reserve_pct", self.risk_reserve_pct),
        ] {
            if !(0.0..=1.0).contains(&value) || !value.is_finite() {
                return Err(ConfigError::invalid_value(
                    "policy",
                    field,
                    format!("must be a fraction in 0..=1, got {}", value),
                ));
            }
        }
        if self.platform_fee_pct + self.risk_reserve_pct >= 1.0 {
            return Err(ConfigError::invalid_value(
                "policy",
                "platform_fee_pct",
                "fee plus reserve must leave something to pay out",
            ));
        }
        if self.min_payout_cents < 0 {
            return Err(ConfigError::invalid_value(
                "policy",
                "min_payout_cents",
                "must be non-negative",
            ));
        }
        if self.hold_days < 0 {
            return Err(ConfigError::invalid_value(
                "policy",
                "hold_days",
                "must be non-negative",
            ));
        }
        if !self.gamma.is_finite() || self.gamma < 0.0 {
            return Err(ConfigError::invalid_value(
                "policy",
                "gamma",
                "must be a non-negative finite number",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PolicyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_payout_cents, 1000);
        assert_eq!(config.hold_days, 14);
    }

    #[test]
    fn test_rejects_out_of_range_fraction() {
        let config = PolicyConfig {
            pool_pct: 1.5,
            ..PolicyConfig::default()
        };
        assert!(config.validate().is_err());

        // The error names the offending field.
        let config = PolicyConfig {
            margin_target: -0.1,
            ..PolicyConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("margin_target"));
    }

    #[test]
    fn test_rejects_fee_plus_reserve_at_one() {
        let config = PolicyConfig {
            platform_fee_pct: 0.5,
            risk_reserve_pct: 0.5,
            ..PolicyConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
