//! Window analyzer
//!
//! Pulls a video's events for a time window, computes the Engagement
//! Integrity Score and persists both the append-only aggregate row and
//! the snapshot on the video.

use chrono::{DateTime, Utc};
use serde::Serialize;
use slice_store::{EventKind, Store, User, VideoAggregate, ViewerEvent};
use tracing::{debug, warn};

use crate::components::{
    authentic_engagement, comment_quality, eis_score, like_integrity, modulate_by_creator_trust,
    report_cleanliness, AuthenticEngagement, CommentQuality, EngagementFeatures, LikeIntegrity,
    ReportCleanliness,
};
use crate::error::{Result, ScoringError};
use crate::vts::VtsMap;

/// How many recent scored videos feed the Creator Trust Score
const CTS_VIDEO_LIMIT: u32 = 10;

/// Neutral Creator Trust Score for creators with no scored videos yet
pub const DEFAULT_CTS: f64 = 50.0;

/// Result of scoring one (video, window) pair
#[derive(Debug, Clone, Serialize)]
pub struct WindowAnalysis {
    pub video_id: i64,
    pub creator_id: i64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Final EIS after creator-trust modulation
    pub eis: f64,
    pub creator_trust: f64,
    pub authentic_engagement: AuthenticEngagement,
    pub comment_quality: CommentQuality,
    pub like_integrity: LikeIntegrity,
    pub report_cleanliness: ReportCleanliness,
    pub view_count: usize,
    pub like_count: usize,
    pub comment_count: usize,
    pub report_count: usize,
}

/// Scores videos over event windows against a store
pub struct Analyzer<'a> {
    store: &'a Store,
}

impl<'a> Analyzer<'a> {
    /// Create an analyzer over a store
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Score one video over [start, end) and persist the result
    ///
    /// Events authored by the video's own creator are excluded before any
    /// component sees them, so self-engagement can never raise a score.
    pub async fn analyze_window(
        &self,
        video_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<WindowAnalysis> {
        if end <= start {
            return Err(ScoringError::WindowRead {
                video_id,
                start,
                end,
                source: slice_store::StoreError::invalid("window", "end must be after start"),
            });
        }

        let video = self
            .store
            .videos()
            .get(video_id)
            .await?
            .ok_or(ScoringError::VideoNotFound { video_id })?;

        let events = self.store.events().for_video_in(video_id, start, end).await?;

        let mut views = Vec::new();
        let mut likes = Vec::new();
        let mut comments = Vec::new();
        let mut reports = Vec::new();
        for event in events {
            if event.user_id == video.creator_id {
                continue;
            }
            match &event.kind {
                EventKind::View => views.push(event),
                EventKind::Like => likes.push(event),
                EventKind::Comment => comments.push(event),
                EventKind::Report => reports.push(event),
                EventKind::Share => {}
                EventKind::Unknown(kind) => {
                    warn!(video_id, kind = kind.as_str(), "Skipping unknown event kind");
                }
            }
        }

        let vts = self.vts_for_participants(&views, &likes, &comments, &reports, end).await?;

        let active_viewers = unique_users(&views).max(if views.is_empty() { 0 } else { 1 });
        let features = EngagementFeatures {
            active_viewers,
            total_views: views.len() as u64,
            likes_per_view: likes.len() as f64 / views.len().max(1) as f64,
            comments_per_view: comments.len() as f64 / views.len().max(1) as f64,
            duration_seconds: video.duration_seconds,
            age_hours: Some((end - video.created_at).num_seconds() as f64 / 3600.0),
        };

        let ae = authentic_engagement(&features);
        let cq = comment_quality(&comments, &vts, active_viewers);
        let li = like_integrity(&likes, &vts);
        let rc = report_cleanliness(&reports, &vts);

        let raw_eis = eis_score(ae.score, cq.score, li.score, rc.score);
        let creator_trust = self.creator_trust_score(video.creator_id).await?;
        let eis = modulate_by_creator_trust(raw_eis, creator_trust);

        let breakdown = serde_json::json!({
            "features": features,
            "authentic_engagement": ae,
            "comment_quality": cq,
            "like_integrity": li,
            "report_cleanliness": rc,
            "raw_eis": raw_eis,
            "creator_trust": creator_trust,
        });

        let agg = VideoAggregate::new(
            video_id, start, end, eis, ae.score, cq.score, li.score, rc.score,
        )
        .with_breakdown(breakdown);
        self.store.aggregates().insert(&agg).await?;
        self.store.videos().update_eis(video_id, eis, end).await?;

        debug!(
            video_id,
            eis,
            authentic = ae.score,
            comments = cq.score,
            likes = li.score,
            reports = rc.score,
            "Scored window"
        );

        Ok(WindowAnalysis {
            video_id,
            creator_id: video.creator_id,
            window_start: start,
            window_end: end,
            eis,
            creator_trust,
            authentic_engagement: ae,
            comment_quality: cq,
            like_integrity: li,
            report_cleanliness: rc,
            view_count: views.len(),
            like_count: likes.len(),
            comment_count: comments.len(),
            report_count: reports.len(),
        })
    }

    /// Mean `eis_current` over the creator's most recently scored videos
    ///
    /// Neutral 50 when nothing has been scored yet.
    pub async fn creator_trust_score(&self, creator_id: i64) -> Result<f64> {
        let videos = self
            .store
            .videos()
            .recent_scored_for_creator(creator_id, CTS_VIDEO_LIMIT)
            .await?;

        let scores: Vec<f64> = videos.iter().filter_map(|v| v.eis_current).collect();
        if scores.is_empty() {
            return Ok(DEFAULT_CTS);
        }
        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    /// Load every participating user once and build the VTS lookup
    async fn vts_for_participants(
        &self,
        views: &[ViewerEvent],
        likes: &[ViewerEvent],
        comments: &[ViewerEvent],
        reports: &[ViewerEvent],
        now: DateTime<Utc>,
    ) -> Result<VtsMap> {
        let mut ids: Vec<i64> = views
            .iter()
            .chain(likes)
            .chain(comments)
            .chain(reports)
            .map(|e| e.user_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let users: Vec<User> = self.store.users().get_many(&ids).await?;
        Ok(VtsMap::from_users(&users, now))
    }
}

fn unique_users(events: &[ViewerEvent]) -> u64 {
    let unique: std::collections::HashSet<i64> = events.iter().map(|e| e.user_id).collect();
    unique.len() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use slice_store::Video;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).single().unwrap()
    }

    async fn store_with_video(creator_id: i64) -> Store {
        let store = Store::new_memory().await.unwrap();
        let creator = User::new(creator_id, 2).with_viewer_trust(60.0);
        store.users().insert(&creator).await.unwrap();
        let video = Video::new(1, creator_id, t0()).with_duration(30.0);
        store.videos().insert(&video).await.unwrap();
        store
    }

    async fn seed_viewer(store: &Store, id: i64, vts: f64) {
        let user = User::new(id, 1).with_viewer_trust(vts);
        store.users().insert(&user).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_window_is_neutral() {
        let store = store_with_video(100).await;
        let analyzer = Analyzer::new(&store);

        let analysis = analyzer
            .analyze_window(1, t0(), t0() + Duration::hours(24))
            .await
            .unwrap();

        // ae 0, cq 50, li 50, rc 90 blended, neutral trust modulation
        assert!((analysis.eis - 36.0).abs() < 1e-9);
        assert_eq!(analysis.report_cleanliness.score, 90.0);
    }

    #[tokio::test]
    async fn test_self_engagement_is_excluded() {
        let store = store_with_video(100).await;
        let analyzer = Analyzer::new(&store);

        // Only the creator interacts with their own video.
        for i in 0..20 {
            let ev = ViewerEvent::new(1, 100, EventKind::Like, t0() + Duration::minutes(i));
            store.events().insert(&ev).await.unwrap();
        }

        let analysis = analyzer
            .analyze_window(1, t0(), t0() + Duration::hours(24))
            .await
            .unwrap();

        assert_eq!(analysis.like_count, 0);
        // Identical to an empty window
        assert!((analysis.eis - 36.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_trusted_reports_floor_the_report_score() {
        let store = store_with_video(100).await;
        let analyzer = Analyzer::new(&store);

        for (i, reporter) in [(0i64, 201i64), (1, 202), (2, 203)] {
            seed_viewer(&store, reporter, 80.0).await;
            let ev = ViewerEvent::new(1, reporter, EventKind::Report, t0() + Duration::hours(i));
            store.events().insert(&ev).await.unwrap();
        }

        let analysis = analyzer
            .analyze_window(1, t0(), t0() + Duration::hours(24))
            .await
            .unwrap();

        // 80 * ln(4) * 15 far exceeds 100
        assert_eq!(analysis.report_cleanliness.score, 0.0);
        assert_eq!(analysis.report_count, 3);
    }

    #[tokio::test]
    async fn test_analysis_persists_aggregate_and_snapshot() {
        let store = store_with_video(100).await;
        let analyzer = Analyzer::new(&store);

        seed_viewer(&store, 201, 70.0).await;
        for i in 0..5 {
            let ev = ViewerEvent::new(1, 201, EventKind::View, t0() + Duration::minutes(i * 7));
            store.events().insert(&ev).await.unwrap();
        }

        let end = t0() + Duration::hours(24);
        let analysis = analyzer.analyze_window(1, t0(), end).await.unwrap();

        let video = store.videos().get_required(1).await.unwrap();
        assert_eq!(video.eis_current, Some(analysis.eis));

        let aggs = store.aggregates().for_video_in(1, t0(), end).await.unwrap();
        assert_eq!(aggs.len(), 1);
        assert!((aggs[0].eis - analysis.eis).abs() < 1e-9);
        assert!(aggs[0].breakdown.get("features").is_some());
    }

    #[tokio::test]
    async fn test_creator_trust_modulates_eis() {
        let store = Store::new_memory().await.unwrap();
        let trusted = User::new(100, 2);
        store.users().insert(&trusted).await.unwrap();

        // Two already-scored videos give the creator a high trust score.
        for id in 1..=2 {
            let video = Video::new(id, 100, t0());
            store.videos().insert(&video).await.unwrap();
            store.videos().update_eis(id, 90.0, t0()).await.unwrap();
        }
        let fresh = Video::new(3, 100, t0());
        store.videos().insert(&fresh).await.unwrap();

        let analyzer = Analyzer::new(&store);
        let cts = analyzer.creator_trust_score(100).await.unwrap();
        assert!((cts - 90.0).abs() < 1e-9);

        let analysis = analyzer
            .analyze_window(3, t0(), t0() + Duration::hours(24))
            .await
            .unwrap();

        // Neutral blend 36 lifted by the 0.95 + 0.10 * 0.9 factor
        assert!((analysis.eis - 36.0 * 1.04).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_video_errors() {
        let store = Store::new_memory().await.unwrap();
        let analyzer = Analyzer::new(&store);

        let err = analyzer
            .analyze_window(42, t0(), t0() + Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::VideoNotFound { video_id: 42 }));
    }
}
