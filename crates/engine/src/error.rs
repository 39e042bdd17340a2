//! Engine error types

use thiserror::Error;

/// Errors raised by allocation and payout runs
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] slice_store::StoreError),

    #[error("scoring error: {0}")]
    Scoring(#[from] slice_scoring::ScoringError),

    #[error("{payment_type} run already committed for period {period_key}")]
    AlreadyProcessed {
        payment_type: String,
        period_key: String,
    },

    #[error("invalid pool: {message}")]
    InvalidPool { message: String },

    #[error("invalid window: {message}")]
    InvalidWindow { message: String },

    #[error("preview write failed: {0}")]
    PreviewIo(#[from] std::io::Error),
}

impl EngineError {
    /// Create an already-processed error
    pub fn already_processed(payment_type: impl Into<String>, period_key: impl Into<String>) -> Self {
        Self::AlreadyProcessed {
            payment_type: payment_type.into(),
            period_key: period_key.into(),
        }
    }

    /// Create an invalid-pool error
    pub fn invalid_pool(message: impl Into<String>) -> Self {
        Self::InvalidPool {
            message: message.into(),
        }
    }

    /// Create an invalid-window error
    pub fn invalid_window(message: impl Into<String>) -> Self {
        Self::InvalidWindow {
            message: message.into(),
        }
    }
}

/// Convenience result alias
pub type Result<T> = std::result::Result<T, EngineError>;
