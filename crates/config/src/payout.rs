//! KYC payout caps
//!
//! Regulatory per-run caps keyed by a creator's externally assigned KYC
//! level. Level 0 means not eligible for payouts at all; the highest level
//! is uncapped.

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Per-KYC-level payout caps (cents per run)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PayoutConfig {
    /// Cap for KYC level 1 accounts (cents)
    /// Default: 5000 ($50)
    pub level1_cap_cents: i64,

    /// Cap for KYC level 2 accounts (cents)
    /// Default: 50000 ($500)
    pub level2_cap_cents: i64,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            level1_cap_cents: 5_000,
            level2_cap_cents: 50_000,
        }
    }
}

impl PayoutConfig {
    /// Cap in cents for a KYC level; `None` means uncapped
    ///
    /// Level 0 returns `Some(0)`: those accounts cannot receive anything.
    pub fn cap_for_level(&self, kyc_level: i64) -> Option<i64> {
        match kyc_level {
            l if l <= 0 => Some(0),
            1 => Some(self.level1_cap_cents),
            2 => Some(self.level2_cap_cents),
            _ => None,
        }
    }

    /// Validate that caps are non-negative and ordered
    pub fn validate(&self) -> Result<()> {
        if self.level1_cap_cents < 0 || self.level2_cap_cents < 0 {
            return Err(ConfigError::invalid_value(
                "payout",
                "level1_cap_cents",
                "caps must be non-negative",
            ));
        }
        if self.level1_cap_cents > self.level2_cap_cents {
            return Err(ConfigError::invalid_value(
                "payout",
                "level2_cap_cents",
                "level 2 cap must be at least the level 1 cap",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_table() {
        let config = PayoutConfig::default();
        assert_eq!(config.cap_for_level(0), Some(0));
        assert_eq!(config.cap_for_level(1), Some(5_000));
        assert_eq!(config.cap_for_level(2), Some(50_000));
        assert_eq!(config.cap_for_level(3), None);
        assert_eq!(config.cap_for_level(7), None);
    }

    #[test]
    fn test_negative_level_is_ineligible() {
        let config = PayoutConfig::default();
        assert_eq!(config.cap_for_level(-1), Some(0));
    }

    #[test]
    fn test_rejects_inverted_caps() {
        let config = PayoutConfig {
            level1_cap_cents: 100_000,
            level2_cap_cents: 50_000,
        };
        assert!(config.validate().is_err());
    }
}
