//! Tests for EIS component math

use chrono::{DateTime, Duration, TimeZone, Utc};
use slice_store::{EventKind, User, ViewerEvent};

use crate::components::{
    authentic_engagement, comment_quality, eis_score, like_integrity, modulate_by_creator_trust,
    report_cleanliness, EngagementFeatures,
};
use crate::vts::VtsMap;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().unwrap()
}

fn neutral_vts() -> VtsMap {
    VtsMap::from_users(&[], t0())
}

fn vts_for(scores: &[(i64, f64)]) -> VtsMap {
    let users: Vec<User> = scores
        .iter()
        .map(|(id, s)| User::new(*id, 1).with_viewer_trust(*s))
        .collect();
    VtsMap::from_users(&users, t0())
}

fn like_at(user_id: i64, ts: DateTime<Utc>) -> ViewerEvent {
    ViewerEvent::new(1, user_id, EventKind::Like, ts)
}

#[test]
fn test_on_target_rates_with_large_audience_max_out() {
    let features = EngagementFeatures {
        active_viewers: 100,
        total_views: 100,
        likes_per_view: 0.10,
        comments_per_view: 0.02,
        duration_seconds: None,
        age_hours: None,
    };

    let ae = authentic_engagement(&features);
    assert!((ae.base_score - 100.0).abs() < 1e-9);
    assert!((ae.audience_component - 100.0).abs() < 1e-6);
    assert!((ae.score - 100.0).abs() < 1e-6);
}

#[test]
fn test_short_videos_face_lower_targets() {
    let features = EngagementFeatures {
        duration_seconds: Some(30.0),
        ..Default::default()
    };

    let ae = authentic_engagement(&features);
    // 15 / 30 = 0.5 is clamped to the 0.7 floor
    assert!((ae.duration_scale - 0.7).abs() < 1e-9);
    assert!((ae.like_target - 0.07).abs() < 1e-9);
}

#[test]
fn test_recency_scale_ramps_over_first_day() {
    let brand_new = authentic_engagement(&EngagementFeatures {
        age_hours: Some(0.0),
        ..Default::default()
    });
    let day_old = authentic_engagement(&EngagementFeatures {
        age_hours: Some(24.0),
        ..Default::default()
    });
    let week_old = authentic_engagement(&EngagementFeatures {
        age_hours: Some(168.0),
        ..Default::default()
    });

    assert!((brand_new.recency_scale - 0.8).abs() < 1e-9);
    assert!((day_old.recency_scale - 1.2).abs() < 1e-9);
    // Saturates at one day
    assert!((week_old.recency_scale - 1.2).abs() < 1e-9);
}

#[test]
fn test_no_comments_is_neutral() {
    let cq = comment_quality(&[], &neutral_vts(), 10);
    assert_eq!(cq.score, 50.0);
    assert!(cq.avg_commenter_vts.is_none());
}

#[test]
fn test_comment_quality_blends_uniqueness_and_trust() {
    let comments = vec![
        ViewerEvent::new(1, 10, EventKind::Comment, t0()),
        ViewerEvent::new(1, 10, EventKind::Comment, t0()),
        ViewerEvent::new(1, 11, EventKind::Comment, t0()),
        ViewerEvent::new(1, 11, EventKind::Comment, t0()),
    ];
    let vts = vts_for(&[(10, 80.0), (11, 80.0)]);

    let cq = comment_quality(&comments, &vts, 4);
    // 2 unique of 4 viewers, trust 0.8: 100 * (0.6 * 0.5 + 0.4 * 0.8)
    assert!((cq.unique_commenter_rate - 0.5).abs() < 1e-9);
    assert!((cq.score - 62.0).abs() < 1e-9);
    assert!((cq.avg_commenter_vts.unwrap() - 80.0).abs() < 1e-9);
}

#[test]
fn test_no_likes_is_neutral() {
    let li = like_integrity(&[], &neutral_vts());
    assert_eq!(li.score, 50.0);
    assert!(li.interarrival_cv.is_none());
}

#[test]
fn test_metronomic_likes_are_penalized() {
    // Perfectly spaced arrivals, distinct users, no device/ip data.
    let likes: Vec<ViewerEvent> = (0..6)
        .map(|i| like_at(100 + i, t0() + Duration::seconds(i * 10)))
        .collect();

    let li = like_integrity(&likes, &neutral_vts());
    // cv = 0, penalty min(25, 40 * 0.5) = 20 off the default-VTS base
    assert!((li.interarrival_cv.unwrap()).abs() < 1e-9);
    assert!((li.penalty_naturalness - 20.0).abs() < 1e-9);
    assert!((li.score - 30.0).abs() < 1e-9);
}

#[test]
fn test_device_farming_is_capped_at_25() {
    let likes: Vec<ViewerEvent> = (0..5)
        .map(|i| like_at(100 + i, t0() + Duration::seconds(i * i * 13)).with_device("dev-1"))
        .collect();

    let li = like_integrity(&likes, &neutral_vts());
    // 5 users on one device, penalty 12 * 3.8 capped at 25
    assert!((li.users_per_device.unwrap() - 5.0).abs() < 1e-9);
    assert!((li.penalty_device - 25.0).abs() < 1e-9);
}

#[test]
fn test_unshared_devices_carry_no_penalty() {
    let likes: Vec<ViewerEvent> = (0..4)
        .map(|i| {
            like_at(100 + i, t0() + Duration::seconds(i * i * 7))
                .with_device(format!("dev-{i}"))
                .with_ip(format!("ip-{i}"))
        })
        .collect();

    let li = like_integrity(&likes, &neutral_vts());
    assert_eq!(li.penalty_device, 0.0);
    assert_eq!(li.penalty_ip, 0.0);
}

#[test]
fn test_no_reports_scores_ninety() {
    let rc = report_cleanliness(&[], &neutral_vts());
    assert_eq!(rc.score, 90.0);
    assert_eq!(rc.penalty, 0.0);
}

#[test]
fn test_trusted_reports_zero_the_score() {
    let reports = vec![
        ViewerEvent::new(1, 10, EventKind::Report, t0()),
        ViewerEvent::new(1, 11, EventKind::Report, t0()),
        ViewerEvent::new(1, 12, EventKind::Report, t0()),
    ];
    let vts = vts_for(&[(10, 80.0), (11, 80.0), (12, 80.0)]);

    let rc = report_cleanliness(&reports, &vts);
    assert_eq!(rc.score, 0.0);
    assert!((rc.penalty - 80.0 * 4.0_f64.ln() * 15.0).abs() < 1e-6);
}

#[test]
fn test_low_trust_report_leaves_partial_score() {
    let reports = vec![ViewerEvent::new(1, 10, EventKind::Report, t0())];
    let vts = vts_for(&[(10, 5.0)]);

    let rc = report_cleanliness(&reports, &vts);
    let expected = 100.0 - 5.0 * 2.0_f64.ln() * 15.0;
    assert!((rc.score - expected).abs() < 1e-9);
    assert!(rc.score > 0.0 && rc.score < 50.0);
}

#[test]
fn test_eis_blend_weights() {
    assert!((eis_score(100.0, 100.0, 100.0, 100.0) - 100.0).abs() < 1e-9);
    assert!((eis_score(50.0, 50.0, 50.0, 50.0) - 50.0).abs() < 1e-9);
    // ae 0, cq 50, li 50, rc 90 is the empty-window blend
    assert!((eis_score(0.0, 50.0, 50.0, 90.0) - 36.0).abs() < 1e-9);
}

#[test]
fn test_creator_trust_modulation_swings_five_percent() {
    assert!((modulate_by_creator_trust(60.0, 0.0) - 57.0).abs() < 1e-9);
    assert!((modulate_by_creator_trust(60.0, 50.0) - 60.0).abs() < 1e-9);
    assert!((modulate_by_creator_trust(60.0, 100.0) - 63.0).abs() < 1e-9);
    assert_eq!(modulate_by_creator_trust(100.0, 100.0), 100.0);
}
