//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error - a value is out of its allowed range
    #[error("[{section}] has invalid {field}: {message}")]
    InvalidValue {
        /// Config section (e.g., "policy", "payout")
        section: &'static str,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },

    /// Environment override could not be parsed
    #[error("invalid value for {var}: {message}")]
    InvalidEnv {
        /// Environment variable name
        var: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create an InvalidValue error
    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }

    /// Create an InvalidEnv error
    pub fn invalid_env(var: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidEnv {
            var,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("policy", "pool_pct", "must be in 0..=1");
        assert!(err.to_string().contains("policy"));
        assert!(err.to_string().contains("pool_pct"));
    }

    #[test]
    fn test_invalid_env_error() {
        let err = ConfigError::invalid_env("POOL_CENTS", "not an integer");
        assert!(err.to_string().contains("POOL_CENTS"));
    }
}
