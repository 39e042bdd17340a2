//! Trust and engagement scoring
//!
//! Turns raw viewer events into the two trust signals the payout engine
//! consumes:
//!
//! | Score | Range | Meaning |
//! |-------|-------|---------|
//! | VTS (Viewer Trust Score) | 0-100 | How much weight a viewer's activity carries |
//! | EIS (Engagement Integrity Score) | 0-100 | How authentic a video's engagement looks |
//!
//! The [`Analyzer`] scores one (video, window) pair at a time: it loads
//! the window's events, excludes the creator's own activity, computes
//! four component scores, blends them, modulates by the creator's trust
//! and persists the result.

pub mod analyzer;
pub mod components;
pub mod error;
pub mod vts;

#[cfg(test)]
mod components_test;

pub use analyzer::{Analyzer, WindowAnalysis, DEFAULT_CTS};
pub use components::{
    authentic_engagement, comment_quality, eis_score, like_integrity, modulate_by_creator_trust,
    report_cleanliness, AuthenticEngagement, CommentQuality, EngagementFeatures, LikeIntegrity,
    ReportCleanliness,
};
pub use error::{Result, ScoringError};
pub use vts::{vts_for_user, VtsMap, DEFAULT_VTS};
