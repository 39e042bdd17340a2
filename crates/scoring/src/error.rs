//! Scoring error types

use thiserror::Error;

/// Scoring errors
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Store access failed
    #[error("store error: {0}")]
    Store(#[from] slice_store::StoreError),

    /// The video under analysis does not exist
    #[error("video not found: {video_id}")]
    VideoNotFound { video_id: i64 },

    /// A window read failed, with enough context to diagnose
    #[error("failed to read window {start}..{end} for video {video_id}: {source}")]
    WindowRead {
        video_id: i64,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
        #[source]
        source: slice_store::StoreError,
    },
}

/// Result type for scoring operations
pub type Result<T> = std::result::Result<T, ScoringError>;
