//! Slice Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use slice_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[policy]\npool_pct = 0.40").unwrap();
//! assert_eq!(config.policy.pool_pct, 0.40);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [store]
//! data_dir = "data"
//!
//! [policy]
//! pool_pct = 0.45
//! margin_target = 0.60
//! platform_fee_pct = 0.10
//! risk_reserve_pct = 0.10
//! min_payout_cents = 1000
//! hold_days = 14
//!
//! [payout]
//! level1_cap_cents = 5000
//! level2_cap_cents = 50000
//! ```
//!
//! # Environment Overrides
//!
//! Run-level knobs can be overridden from the environment (legacy job
//! interface): `POOL_CENTS`, `DRY_RUN`, `YEAR`, `MONTH`, `SLICE_DATA_DIR`.

mod error;
mod logging;
mod payout;
mod policy;
mod store;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use error::{ConfigError, Result};
pub use logging::LogConfig;
pub use payout::PayoutConfig;
pub use policy::PolicyConfig;
pub use store::StoreConfig;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data store location
    pub store: StoreConfig,

    /// Pool sizing and payout split knobs
    pub policy: PolicyConfig,

    /// KYC payout caps
    pub payout: PayoutConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Load configuration from a TOML file if it exists, defaults otherwise
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse configuration from a TOML string
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all sections
    fn validate(&self) -> Result<()> {
        self.policy.validate()?;
        self.payout.validate()?;
        Ok(())
    }

    /// Apply environment overrides to the store section
    pub fn apply_env(&mut self) {
        self.store.apply_env();
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Run-level overrides sourced from the environment
///
/// These mirror the knobs the legacy batch jobs read: pool size, dry-run
/// flag, and target period. CLI flags take precedence over these.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    /// Pool size in cents (`POOL_CENTS`)
    pub pool_cents: Option<i64>,
    /// Preview-only mode (`DRY_RUN`)
    pub dry_run: Option<bool>,
    /// Target year (`YEAR`)
    pub year: Option<i32>,
    /// Target month, 1-12 (`MONTH`)
    pub month: Option<u32>,
}

impl RunOverrides {
    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            pool_cents: parse_env_int("POOL_CENTS")?,
            dry_run: parse_env_bool("DRY_RUN"),
            year: parse_env_int("YEAR")?.map(|y| y as i32),
            month: match parse_env_int("MONTH")? {
                Some(m) if (1..=12).contains(&m) => Some(m as u32),
                Some(m) => {
                    return Err(ConfigError::invalid_env(
                        "MONTH",
                        format!("must be 1-12, got {}", m),
                    ))
                }
                None => None,
            },
        })
    }
}

fn parse_env_int(var: &'static str) -> Result<Option<i64>> {
    match std::env::var(var) {
        Ok(s) if !s.trim().is_empty() => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ConfigError::invalid_env(var, format!("not an integer: {:?}", s))),
        _ => Ok(None),
    }
}

fn parse_env_bool(var: &str) -> Option<bool> {
    match std::env::var(var) {
        Ok(s) => {
            let s = s.trim().to_lowercase();
            if s.is_empty() {
                None
            } else {
                Some(matches!(s.as_str(), "1" | "true" | "yes" | "y" | "on"))
            }
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.policy.pool_pct, 0.45);
        assert_eq!(config.payout.level2_cap_cents, 50_000);
        assert_eq!(config.store.data_dir, "data");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_config_overrides_one_section() {
        let config = Config::from_str("[policy]\nmin_payout_cents = 500").unwrap();
        assert_eq!(config.policy.min_payout_cents, 500);
        assert_eq!(config.policy.pool_pct, 0.45);
    }

    #[test]
    fn test_invalid_policy_rejected_at_parse() {
        let result = Config::from_str("[policy]\npool_pct = 2.0");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::from_file_or_default("/nonexistent/slice.toml").unwrap();
        assert_eq!(config.policy.hold_days, 14);
    }
}
