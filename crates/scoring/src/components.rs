//! EIS component scores
//!
//! Four 0-100 component scores blended into the Engagement Integrity
//! Score. Each function returns a structured result carrying the scalar
//! plus its breakdown, which the analyzer persists for audits.

use serde::{Deserialize, Serialize};
use slice_store::ViewerEvent;

use crate::vts::VtsMap;

/// Component blend weights for the final EIS
pub const W_AUTHENTIC: f64 = 0.40;
pub const W_COMMENT: f64 = 0.30;
pub const W_LIKE: f64 = 0.15;
pub const W_REPORT: f64 = 0.15;

/// Normalized per-window engagement features for one video
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementFeatures {
    /// Unique viewers (min 1 once any events exist)
    pub active_viewers: u64,
    pub total_views: u64,
    pub likes_per_view: f64,
    pub comments_per_view: f64,
    pub duration_seconds: Option<f64>,
    /// Hours from video creation to window end
    pub age_hours: Option<f64>,
}

/// Authentic engagement score and its breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticEngagement {
    pub score: f64,
    pub like_score: f64,
    pub comment_score: f64,
    pub base_score: f64,
    pub audience_component: f64,
    pub like_target: f64,
    pub comment_target: f64,
    pub duration_scale: f64,
    pub recency_scale: f64,
}

/// Rate-based authenticity: observed like/comment rates against adaptive
/// targets, blended with a log-normalized audience component.
pub fn authentic_engagement(features: &EngagementFeatures) -> AuthenticEngagement {
    let mut like_target = 0.10;
    let mut comment_target = 0.02;

    // Shorter videos earn engagement more easily; scale targets up.
    let duration_scale = match features.duration_seconds {
        Some(d) if d > 0.0 => (15.0 / d).clamp(0.7, 1.3),
        _ => 1.0,
    };
    like_target *= duration_scale;
    comment_target *= duration_scale;

    // Newer videos get leniency; older ones are held to a stricter target.
    let recency_scale = match features.age_hours {
        Some(h) if h >= 0.0 => (0.8 + 0.4 * (h / 24.0).min(1.0)).clamp(0.8, 1.2),
        _ => 1.0,
    };
    like_target *= recency_scale;
    comment_target *= recency_scale;

    let like_score = (100.0 * features.likes_per_view / like_target.max(1e-6)).min(100.0);
    let comment_score = (100.0 * features.comments_per_view / comment_target.max(1e-6)).min(100.0);
    let base_score = (0.6 * like_score + 0.4 * comment_score).clamp(0.0, 100.0);

    // Audience size normalized so ~100 viewers saturates the component
    let audience_component = if features.active_viewers == 0 {
        0.0
    } else {
        let norm = ((1.0 + features.active_viewers as f64).ln() / 101.0_f64.ln()).min(1.0);
        100.0 * norm
    };

    let score = (0.8 * base_score + 0.2 * audience_component).clamp(0.0, 100.0);

    AuthenticEngagement {
        score,
        like_score,
        comment_score,
        base_score,
        audience_component,
        like_target,
        comment_target,
        duration_scale,
        recency_scale,
    }
}

/// Comment quality score and its breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentQuality {
    pub score: f64,
    pub unique_commenter_rate: f64,
    pub avg_commenter_vts: Option<f64>,
}

/// Content-agnostic comment quality: who comments, not what they say.
///
/// Blends the unique-commenter rate (0.6) with the mean commenter VTS
/// (0.4). No comments is neutral, not bad.
pub fn comment_quality(
    comments: &[ViewerEvent],
    vts: &VtsMap,
    active_viewers: u64,
) -> CommentQuality {
    if comments.is_empty() {
        return CommentQuality {
            score: 50.0,
            unique_commenter_rate: 0.0,
            avg_commenter_vts: None,
        };
    }

    let unique: std::collections::HashSet<i64> = comments.iter().map(|c| c.user_id).collect();
    let unique_commenter_rate = (unique.len() as f64 / active_viewers.max(1) as f64).min(1.0);

    let vts_mean_01 = comments
        .iter()
        .map(|c| vts.get_or_default(c.user_id))
        .sum::<f64>()
        / (100.0 * comments.len() as f64);

    let score = (100.0 * (0.6 * unique_commenter_rate + 0.4 * vts_mean_01)).clamp(0.0, 100.0);

    CommentQuality {
        score,
        unique_commenter_rate,
        avg_commenter_vts: Some(vts_mean_01 * 100.0),
    }
}

/// Like integrity score and its breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeIntegrity {
    pub score: f64,
    pub avg_vts: Option<f64>,
    /// Coefficient of variation of inter-like arrival times
    pub interarrival_cv: Option<f64>,
    pub users_per_device: Option<f64>,
    pub users_per_ip: Option<f64>,
    pub penalty_device: f64,
    pub penalty_ip: f64,
    pub penalty_naturalness: f64,
}

/// Liker trustworthiness minus clustering and timing penalties.
///
/// Many distinct users funneled through one device or IP is suspicious,
/// as is like traffic that arrives either metronomically (cv < 0.5) or in
/// extreme bursts (cv > 1.5). Each penalty is capped at 25 points.
pub fn like_integrity(likes: &[ViewerEvent], vts: &VtsMap) -> LikeIntegrity {
    if likes.is_empty() {
        return LikeIntegrity {
            score: 50.0,
            avg_vts: None,
            interarrival_cv: None,
            users_per_device: None,
            users_per_ip: None,
            penalty_device: 0.0,
            penalty_ip: 0.0,
            penalty_naturalness: 0.0,
        };
    }

    let base = likes
        .iter()
        .map(|l| vts.get_or_default(l.user_id))
        .sum::<f64>()
        / likes.len() as f64;

    // Timing naturalness
    let mut ts: Vec<_> = likes.iter().map(|l| l.ts).collect();
    ts.sort();
    let diffs: Vec<f64> = ts
        .windows(2)
        .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
        .filter(|d| *d > 0.0)
        .collect();

    let mut interarrival_cv = None;
    let mut penalty_naturalness = 0.0;
    if diffs.len() >= 2 {
        let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
        if mean > 0.0 {
            let var = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>()
                / (diffs.len() - 1) as f64;
            let cv = var.max(0.0).sqrt() / mean;
            interarrival_cv = Some(cv);
            if cv < 0.5 {
                penalty_naturalness = (40.0 * (0.5 - cv)).min(25.0);
            } else if cv > 1.5 {
                penalty_naturalness = (20.0 * (cv - 1.5)).min(25.0);
            }
        }
    }

    // Device/IP clustering
    let users_per_device = mean_users_per_key(likes, |l| l.device_id.as_deref());
    let users_per_ip = mean_users_per_key(likes, |l| l.ip_hash.as_deref());

    let penalty_device = users_per_device
        .map(|upd| (12.0 * (upd - 1.2).max(0.0)).min(25.0))
        .unwrap_or(0.0);
    let penalty_ip = users_per_ip
        .map(|upi| (10.0 * (upi - 1.5).max(0.0)).min(25.0))
        .unwrap_or(0.0);

    let score = (base - penalty_device - penalty_ip - penalty_naturalness).clamp(0.0, 100.0);

    LikeIntegrity {
        score,
        avg_vts: Some(base),
        interarrival_cv,
        users_per_device,
        users_per_ip,
        penalty_device,
        penalty_ip,
        penalty_naturalness,
    }
}

/// Mean distinct users per device/IP key, `None` when no events carry one
fn mean_users_per_key<'a, F>(events: &'a [ViewerEvent], key: F) -> Option<f64>
where
    F: Fn(&'a ViewerEvent) -> Option<&'a str>,
{
    use std::collections::{HashMap, HashSet};

    let mut groups: HashMap<&str, HashSet<i64>> = HashMap::new();
    for e in events {
        if let Some(k) = key(e) {
            groups.entry(k).or_default().insert(e.user_id);
        }
    }
    if groups.is_empty() {
        return None;
    }
    let total: usize = groups.values().map(|s| s.len()).sum();
    Some(total as f64 / groups.len() as f64)
}

/// Report cleanliness score and its breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCleanliness {
    pub score: f64,
    pub report_count: usize,
    pub avg_reporter_vts: Option<f64>,
    pub penalty: f64,
}

/// Inverse report pressure: higher is cleaner.
///
/// Penalty grows with reporter trust and (logarithmically) report count:
/// `avg_vts * ln(1 + count) * 15`. Zero reports scores a mildly
/// optimistic 90, not a perfect 100.
///
/// The penalty is deliberately not rescaled by 100, matching the
/// production calibration: a handful of trusted reporters floors the
/// score. TODO: revisit the magnitude together with the cap table once
/// report volumes are large enough to calibrate against.
pub fn report_cleanliness(reports: &[ViewerEvent], vts: &VtsMap) -> ReportCleanliness {
    let report_count = reports.len();

    let avg_reporter_vts = if report_count > 0 {
        reports
            .iter()
            .map(|r| vts.get_or_default(r.user_id))
            .sum::<f64>()
            / report_count as f64
    } else {
        0.0
    };

    let penalty = avg_reporter_vts * (1.0 + report_count as f64).ln() * 15.0;

    let score = if report_count == 0 {
        90.0
    } else {
        (100.0 - penalty).clamp(0.0, 100.0)
    };

    ReportCleanliness {
        score,
        report_count,
        avg_reporter_vts: (report_count > 0).then_some(avg_reporter_vts),
        penalty,
    }
}

/// Blend the four component scores into the EIS
pub fn eis_score(ae: f64, cq: f64, li: f64, rc: f64) -> f64 {
    (W_AUTHENTIC * ae + W_COMMENT * cq + W_LIKE * li + W_REPORT * rc).clamp(0.0, 100.0)
}

/// Modulate an EIS by the creator's own trust score (±5% swing)
pub fn modulate_by_creator_trust(eis: f64, cts: f64) -> f64 {
    let factor = 0.95 + 0.10 * (cts / 100.0);
    (eis * factor).clamp(0.0, 100.0)
}
