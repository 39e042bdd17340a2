//! Revenue window finalization
//!
//! The window path starts from money, not from a pre-sized pool: gross
//! revenue minus taxes, store fees and refunds, guarded by a margin
//! floor, becomes the creator pool. Eligible videos split it by
//! quality-weighted video units and the result is persisted as an
//! immutable window with per-video share rows.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use slice_config::Config;
use slice_scoring::Analyzer;
use slice_store::{EventKind, RevenueWindow, Store, VideoRevShare};
use tracing::{error, info, warn};

use crate::error::{EngineError, Result};
use crate::payout::{PayoutBatch, PayoutWriter};

pub const WINDOW_PAYMENT_TYPE: &str = "revenue_window";

/// Eligibility gates for window revenue sharing
const MIN_KYC_LEVEL: i64 = 2;
const MIN_CREATOR_TRUST: f64 = 50.0;

/// Streak adjustments for creators holding a high (or poor) weekly EIS
const STREAK_HIGH_THRESHOLD: f64 = 70.0;
const STREAK_LOW_THRESHOLD: f64 = 40.0;
const STREAK_BONUS: f64 = 1.03;
const STREAK_MALUS: f64 = 0.97;

/// Fallback score averages when a video cannot be scored for the window
const FALLBACK_EIS: f64 = 0.0;
const FALLBACK_AUTHENTIC_ENGAGEMENT: f64 = 50.0;
const FALLBACK_LIKE_INTEGRITY: f64 = 50.0;
const FALLBACK_REPORT_CLEANLINESS: f64 = 90.0;

/// Revenue inputs for one window
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WindowRevenue {
    pub gross_cents: i64,
    pub taxes_cents: i64,
    pub app_store_fees_cents: i64,
    pub refunds_cents: i64,
}

impl WindowRevenue {
    /// Net revenue after taxes, store fees and refunds
    pub fn net_cents(&self) -> i64 {
        self.gross_cents - self.taxes_cents - self.app_store_fees_cents - self.refunds_cents
    }
}

/// Outcome of finalizing one revenue window
#[derive(Debug, Clone, Serialize)]
pub struct WindowReport {
    pub window_id: i64,
    pub period_key: String,
    pub pool_cents: i64,
    pub quality_nudge: f64,
    pub eligible_videos: usize,
    pub batch: Option<PayoutBatch>,
}

/// Pool sizing: the configured share of net, floored by the margin guard
///
/// `min(pool_pct * net, net - costs - margin_target * gross)`, never
/// negative. The guard keeps the pool from eating the platform's target
/// margin in a weak month.
pub fn pool_base_cents(revenue: &WindowRevenue, config: &Config) -> i64 {
    let net = revenue.net_cents() as f64;
    let by_pct = config.policy.pool_pct * net;
    let by_margin = net
        - config.policy.costs_est_cents as f64
        - config.policy.margin_target * revenue.gross_cents as f64;
    by_pct.min(by_margin).max(0.0).floor() as i64
}

/// Quality nudge from the window's average EIS, +-2%
///
/// Centered at EIS 60: a high-integrity window grows the pool slightly,
/// a low one shrinks it.
pub fn quality_nudge(avg_eis: f64) -> f64 {
    ((avg_eis - 60.0) / 400.0).clamp(-0.02, 0.02)
}

/// Weighted engagement volume proxy, floored at zero
///
/// Reports subtract hard: `views + 2 likes + 5 comments - 10 reports`.
pub fn engagement_proxy(views: u64, likes: u64, comments: u64, reports: u64) -> f64 {
    (views as f64 + 2.0 * likes as f64 + 5.0 * comments as f64 - 10.0 * reports as f64).max(0.0)
}

/// Integrity modifier from like integrity and report cleanliness
///
/// A multiplicative discount in [0.85, 1.0]: both components at 100 keep
/// full weight, degraded components shave up to 15% off a video's units.
pub fn integrity_modifier(like_integrity: f64, report_cleanliness: f64) -> f64 {
    let product = (like_integrity / 100.0) * (report_cleanliness / 100.0);
    (0.85 + 0.15 * product).clamp(0.85, 1.0)
}

/// Window-average scores for one video
#[derive(Debug, Clone, Copy, Serialize)]
struct VideoAverages {
    eis: f64,
    authentic_engagement: f64,
    like_integrity: f64,
    report_cleanliness: f64,
}

struct EligibleVideo {
    video_id: i64,
    creator_id: i64,
    eng_units: f64,
    averages: VideoAverages,
    integrity_mod: f64,
    vu: f64,
}

/// Finalize one revenue window end to end
///
/// At-most-once per window span; a run that fails after claiming the
/// span releases the claim before returning, so it can be retried.
/// Windows with no eligible engagement are still recorded, with a zero
/// pool and an explanatory meta note, so the span stays claimed and
/// auditable.
pub async fn finalize_window(
    store: &Store,
    config: &Config,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    revenue: WindowRevenue,
) -> Result<WindowReport> {
    if end <= start {
        return Err(EngineError::invalid_window("window end must be after start"));
    }
    if revenue.gross_cents < 0 {
        return Err(EngineError::invalid_pool("gross revenue must be non-negative"));
    }

    let period_key = format!(
        "{}..{}",
        start.format("%Y-%m-%dT%H:%M"),
        end.format("%Y-%m-%dT%H:%M")
    );
    if !store.transactions().claim_run(WINDOW_PAYMENT_TYPE, &period_key).await? {
        return Err(EngineError::already_processed(WINDOW_PAYMENT_TYPE, &period_key));
    }

    let result = finalize_claimed(store, config, start, end, revenue, &period_key).await;
    if result.is_err() {
        if let Err(release_err) = store
            .transactions()
            .release_run(WINDOW_PAYMENT_TYPE, &period_key)
            .await
        {
            error!(period_key, error = %release_err, "Failed to release window claim");
        }
    }
    result
}

/// The claimed portion of a window run
async fn finalize_claimed(
    store: &Store,
    config: &Config,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    revenue: WindowRevenue,
    period_key: &str,
) -> Result<WindowReport> {
    let eligible = eligible_videos(store, config, start, end).await?;
    if eligible.is_empty() {
        let window = RevenueWindow {
            id: 0,
            window_start: start,
            window_end: end,
            gross_revenue_cents: revenue.gross_cents,
            taxes_cents: revenue.taxes_cents,
            app_store_fees_cents: revenue.app_store_fees_cents,
            refunds_cents: revenue.refunds_cents,
            pool_pct: config.policy.pool_pct,
            margin_target: config.policy.margin_target,
            risk_reserve_pct: config.policy.risk_reserve_pct,
            platform_fee_pct: config.policy.platform_fee_pct,
            costs_est_cents: config.policy.costs_est_cents,
            creator_pool_cents: 0,
            meta: serde_json::json!({ "note": "no eligible engagement" }),
            created_at: Utc::now(),
        };
        let window_id = store.windows().insert(&window).await?;
        info!(window_id, period_key, "Window closed with no eligible engagement");
        return Ok(WindowReport {
            window_id,
            period_key: period_key.to_string(),
            pool_cents: 0,
            quality_nudge: 0.0,
            eligible_videos: 0,
            batch: None,
        });
    }

    let total_eng: f64 = eligible.iter().map(|v| v.eng_units).sum();
    let avg_eis = if total_eng > 0.0 {
        eligible.iter().map(|v| v.averages.eis * v.eng_units).sum::<f64>() / total_eng
    } else {
        eligible.iter().map(|v| v.averages.eis).sum::<f64>() / eligible.len() as f64
    };
    let nudge = quality_nudge(avg_eis);

    // The nudge never lifts the pool above the margin guard.
    let net = revenue.net_cents() as f64;
    let by_margin = net
        - config.policy.costs_est_cents as f64
        - config.policy.margin_target * revenue.gross_cents as f64;
    let nudged = pool_base_cents(&revenue, config) as f64 * (1.0 + nudge);
    let pool_cents = nudged.min(by_margin).max(0.0).floor() as i64;

    let total_vu: f64 = eligible.iter().map(|v| v.vu).sum();
    let window = RevenueWindow {
        id: 0,
        window_start: start,
        window_end: end,
        gross_revenue_cents: revenue.gross_cents,
        taxes_cents: revenue.taxes_cents,
        app_store_fees_cents: revenue.app_store_fees_cents,
        refunds_cents: revenue.refunds_cents,
        pool_pct: config.policy.pool_pct,
        margin_target: config.policy.margin_target,
        risk_reserve_pct: config.policy.risk_reserve_pct,
        platform_fee_pct: config.policy.platform_fee_pct,
        costs_est_cents: config.policy.costs_est_cents,
        creator_pool_cents: pool_cents,
        meta: serde_json::json!({
            "avg_eis": avg_eis,
            "quality_nudge": nudge,
            "total_vu": total_vu,
            "eligible_videos": eligible.len(),
        }),
        created_at: Utc::now(),
    };
    let window_id = store.windows().insert(&window).await?;

    let mut creator_totals: BTreeMap<i64, i64> = BTreeMap::new();
    for video in &eligible {
        let share_pct = if total_vu > 0.0 { video.vu / total_vu } else { 0.0 };
        let allocated_cents = (pool_cents as f64 * share_pct).floor() as i64;
        *creator_totals.entry(video.creator_id).or_insert(0) += allocated_cents;

        let share = VideoRevShare {
            id: 0,
            revenue_window_id: window_id,
            video_id: video.video_id,
            eng_units: video.eng_units,
            eis_avg: video.averages.eis,
            vu: video.vu,
            share_pct,
            allocated_cents,
            meta: serde_json::json!({
                "creator_id": video.creator_id,
                "averages": video.averages,
                "integrity_mod": video.integrity_mod,
                "gamma": config.policy.gamma,
            }),
        };
        store.windows().insert_share(&share).await?;
    }

    let writer = PayoutWriter::new(store, &config.policy);
    let batch = writer
        .commit_batch(
            creator_totals.iter().map(|(id, amt)| (*id, *amt)),
            WINDOW_PAYMENT_TYPE,
            period_key,
        )
        .await?;

    info!(
        window_id,
        period_key,
        pool_cents,
        avg_eis,
        videos = eligible.len(),
        creators = creator_totals.len(),
        "Finalized revenue window"
    );

    Ok(WindowReport {
        window_id,
        period_key: period_key.to_string(),
        pool_cents,
        quality_nudge: nudge,
        eligible_videos: eligible.len(),
        batch: Some(batch),
    })
}

/// Collect eligible videos with their engagement proxy and weighted units
///
/// Eligibility is per creator: KYC at least level 2 and a creator trust
/// score of 50 or better. Videos without scores for the window are scored
/// on demand; if that fails they fall back to conservative defaults. vu
/// applies the quality exponent, the integrity modifier and the weekly
/// streak adjustment so high-EIS videos earn superlinearly.
async fn eligible_videos(
    store: &Store,
    config: &Config,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<EligibleVideo>> {
    let analyzer = Analyzer::new(store);

    let video_ids = store.events().video_ids_in(start, end).await?;
    let videos = store.videos().get_many(&video_ids).await?;
    let creator_ids: Vec<i64> = videos.iter().map(|v| v.creator_id).collect();
    let users: BTreeMap<i64, slice_store::User> = store
        .users()
        .get_many(&creator_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut streaks: BTreeMap<i64, f64> = BTreeMap::new();
    let mut eligible = Vec::new();
    for video in videos {
        let Some(creator) = users.get(&video.creator_id) else {
            warn!(video_id = video.id, "Video has no creator row, skipping");
            continue;
        };
        // No trust score means no track record; such creators do not pass.
        let cts = creator.creator_trust_score.unwrap_or(0.0);
        if creator.kyc_level < MIN_KYC_LEVEL || cts < MIN_CREATOR_TRUST || creator.likely_bot {
            continue;
        }

        let events = store.events().for_video_in(video.id, start, end).await?;
        let (mut views, mut likes, mut comments, mut reports) = (0u64, 0u64, 0u64, 0u64);
        for event in &events {
            if event.user_id == video.creator_id {
                continue;
            }
            match event.kind {
                EventKind::View => views += 1,
                EventKind::Like => likes += 1,
                EventKind::Comment => comments += 1,
                EventKind::Report => reports += 1,
                _ => {}
            }
        }

        let eng_units = engagement_proxy(views, likes, comments, reports);
        if eng_units <= 0.0 {
            continue;
        }

        let avg = video_averages(store, &analyzer, video.id, start, end).await?;

        let streak = match streaks.get(&video.creator_id) {
            Some(mult) => *mult,
            None => {
                let mult = streak_multiplier(store, video.creator_id, end).await?;
                streaks.insert(video.creator_id, mult);
                mult
            }
        };

        let integrity_mod = integrity_modifier(avg.like_integrity, avg.report_cleanliness);
        let vu = eng_units
            * (avg.eis.clamp(0.0, 100.0) / 100.0).powf(config.policy.gamma)
            * integrity_mod
            * streak;

        eligible.push(EligibleVideo {
            video_id: video.id,
            creator_id: video.creator_id,
            eng_units,
            averages: avg,
            integrity_mod,
            vu,
        });
    }

    Ok(eligible)
}

/// Window-average scores, computed on demand when no aggregate covers it
async fn video_averages(
    store: &Store,
    analyzer: &Analyzer<'_>,
    video_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<VideoAverages> {
    let aggs = store.aggregates().for_video_in(video_id, start, end).await?;
    if !aggs.is_empty() {
        let n = aggs.len() as f64;
        return Ok(VideoAverages {
            eis: aggs.iter().map(|a| a.eis).sum::<f64>() / n,
            authentic_engagement: aggs.iter().map(|a| a.authentic_engagement).sum::<f64>() / n,
            like_integrity: aggs.iter().map(|a| a.like_integrity).sum::<f64>() / n,
            report_cleanliness: aggs.iter().map(|a| a.report_credibility).sum::<f64>() / n,
        });
    }

    match analyzer.analyze_window(video_id, start, end).await {
        Ok(analysis) => Ok(VideoAverages {
            eis: analysis.eis,
            authentic_engagement: analysis.authentic_engagement.score,
            like_integrity: analysis.like_integrity.score,
            report_cleanliness: analysis.report_cleanliness.score,
        }),
        Err(err) => {
            warn!(video_id, error = %err, "On-demand scoring failed, using fallback averages");
            Ok(VideoAverages {
                eis: FALLBACK_EIS,
                authentic_engagement: FALLBACK_AUTHENTIC_ENGAGEMENT,
                like_integrity: FALLBACK_LIKE_INTEGRITY,
                report_cleanliness: FALLBACK_REPORT_CLEANLINESS,
            })
        }
    }
}

/// Streak adjustment from the creator's trailing-week EIS snapshots
///
/// Averages `eis_current` across videos scored in the last seven days.
/// Holding 70+ earns a 3% bonus, sliding to 40 or below costs 3%. An
/// empty week averages to zero, so creators without a scored track
/// record take the malus.
async fn streak_multiplier(store: &Store, creator_id: i64, end: DateTime<Utc>) -> Result<f64> {
    let since = end - chrono::Duration::days(7);
    let videos = store.videos().scored_for_creator_since(creator_id, since).await?;
    let scores: Vec<f64> = videos.iter().filter_map(|v| v.eis_current).collect();
    let avg = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };
    if avg >= STREAK_HIGH_THRESHOLD {
        Ok(STREAK_BONUS)
    } else if avg <= STREAK_LOW_THRESHOLD {
        Ok(STREAK_MALUS)
    } else {
        Ok(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use slice_store::{User, Video, ViewerEvent};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).single().unwrap()
    }

    fn revenue() -> WindowRevenue {
        WindowRevenue {
            gross_cents: 1_000_000,
            taxes_cents: 80_000,
            app_store_fees_cents: 150_000,
            refunds_cents: 20_000,
        }
    }

    async fn seed_eligible_creator(store: &Store, creator: i64, video: i64) {
        let user = User::new(creator, 2).with_creator_trust(60.0);
        store.users().insert(&user).await.unwrap();
        let v = Video::new(video, creator, t0() - Duration::days(1)).with_duration(30.0);
        store.videos().insert(&v).await.unwrap();
    }

    async fn seed_views(store: &Store, video: i64, n: i64) {
        for viewer in 0..n {
            let user = User::new(9_000 + video * 100 + viewer, 1).with_viewer_trust(60.0);
            store.users().insert(&user).await.unwrap();
            let ev = ViewerEvent::new(
                video,
                user.id,
                EventKind::View,
                t0() + Duration::minutes(viewer),
            );
            store.events().insert(&ev).await.unwrap();
        }
    }

    #[test]
    fn test_pool_respects_the_margin_guard() {
        let config = Config::default();
        // Default 60% margin target: net 750k minus 600k margin leaves
        // 150k, well under 45% of net, so the guard sets the pool.
        assert_eq!(pool_base_cents(&revenue(), &config), 150_000);

        // Thin window: the guard goes negative and the pool floors at zero.
        let thin = WindowRevenue {
            gross_cents: 1_000_000,
            taxes_cents: 200_000,
            app_store_fees_cents: 300_000,
            refunds_cents: 100_000,
        };
        assert_eq!(pool_base_cents(&thin, &config), 0);

        // A relaxed margin target lets the percentage share win.
        let mut relaxed = Config::default();
        relaxed.policy.margin_target = 0.10;
        let net = revenue().net_cents() as f64;
        assert_eq!(
            pool_base_cents(&revenue(), &relaxed),
            (0.45 * net).floor() as i64
        );
    }

    #[test]
    fn test_quality_nudge_clamps() {
        assert_eq!(quality_nudge(60.0), 0.0);
        assert!((quality_nudge(64.0) - 0.01).abs() < 1e-9);
        assert_eq!(quality_nudge(100.0), 0.02);
        assert_eq!(quality_nudge(0.0), -0.02);
    }

    #[test]
    fn test_engagement_proxy_floors_at_zero() {
        assert_eq!(engagement_proxy(10, 5, 2, 0), 30.0);
        assert_eq!(engagement_proxy(5, 0, 0, 3), 0.0);
    }

    #[test]
    fn test_integrity_modifier_range() {
        assert!((integrity_modifier(100.0, 100.0) - 1.0).abs() < 1e-9);
        // Half integrity on both axes: 0.85 + 0.15 * 0.25
        assert!((integrity_modifier(50.0, 50.0) - 0.8875).abs() < 1e-9);
        assert_eq!(integrity_modifier(0.0, 0.0), 0.85);
        assert_eq!(integrity_modifier(0.0, 100.0), 0.85);
    }

    #[tokio::test]
    async fn test_finalize_persists_window_and_pays() {
        let store = Store::new_memory().await.unwrap();
        let config = Config::default();
        seed_eligible_creator(&store, 1, 10).await;
        seed_views(&store, 10, 30).await;

        let end = t0() + Duration::days(30);
        let report = finalize_window(&store, &config, t0(), end, revenue())
            .await
            .unwrap();

        assert_eq!(report.eligible_videos, 1);
        assert!(report.pool_cents > 0);

        let window = store.windows().get(report.window_id).await.unwrap().unwrap();
        assert_eq!(window.creator_pool_cents, report.pool_cents);

        let shares = store.windows().shares_for_window(report.window_id).await.unwrap();
        assert_eq!(shares.len(), 1);
        assert!((shares[0].share_pct - 1.0).abs() < 1e-9);
        assert_eq!(shares[0].allocated_cents, report.pool_cents);

        let user = store.users().get_required(1).await.unwrap();
        assert!(user.current_balance_cents > 0);
    }

    #[tokio::test]
    async fn test_unscored_creators_are_gated_out() {
        let store = Store::new_memory().await.unwrap();
        let config = Config::default();

        // KYC clears the bar but there is no trust score; no track
        // record means no window revenue.
        let user = User::new(1, 2);
        store.users().insert(&user).await.unwrap();
        let v = Video::new(10, 1, t0() - Duration::days(1));
        store.videos().insert(&v).await.unwrap();
        seed_views(&store, 10, 25).await;

        let end = t0() + Duration::days(30);
        let report = finalize_window(&store, &config, t0(), end, revenue())
            .await
            .unwrap();

        assert_eq!(report.eligible_videos, 0);
        assert_eq!(report.pool_cents, 0);
    }

    #[tokio::test]
    async fn test_streak_reflects_weekly_snapshots() {
        let store = Store::new_memory().await.unwrap();

        // No scored history averages to zero and takes the malus.
        let m = streak_multiplier(&store, 1, t0()).await.unwrap();
        assert_eq!(m, STREAK_MALUS);

        store.users().insert(&User::new(1, 2)).await.unwrap();
        let v = Video::new(10, 1, t0() - Duration::days(3));
        store.videos().insert(&v).await.unwrap();
        store
            .videos()
            .update_eis(10, 80.0, t0() - Duration::days(1))
            .await
            .unwrap();

        let m = streak_multiplier(&store, 1, t0()).await.unwrap();
        assert_eq!(m, STREAK_BONUS);
    }

    #[tokio::test]
    async fn test_ineligible_creators_are_gated_out() {
        let store = Store::new_memory().await.unwrap();
        let config = Config::default();

        // KYC level 1 fails the window gate even with good trust.
        let user = User::new(1, 1).with_creator_trust(80.0);
        store.users().insert(&user).await.unwrap();
        let v = Video::new(10, 1, t0() - Duration::days(1));
        store.videos().insert(&v).await.unwrap();
        seed_views(&store, 10, 25).await;

        let end = t0() + Duration::days(30);
        let report = finalize_window(&store, &config, t0(), end, revenue())
            .await
            .unwrap();

        assert_eq!(report.eligible_videos, 0);
        assert_eq!(report.pool_cents, 0);
        let window = store.windows().get(report.window_id).await.unwrap().unwrap();
        assert_eq!(window.meta["note"], "no eligible engagement");
    }

    #[tokio::test]
    async fn test_window_is_at_most_once() {
        let store = Store::new_memory().await.unwrap();
        let config = Config::default();

        let end = t0() + Duration::days(30);
        finalize_window(&store, &config, t0(), end, revenue()).await.unwrap();
        let err = finalize_window(&store, &config, t0(), end, revenue())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyProcessed { .. }));
    }

    #[tokio::test]
    async fn test_inverted_window_is_rejected() {
        let store = Store::new_memory().await.unwrap();
        let config = Config::default();
        let err = finalize_window(&store, &config, t0(), t0(), revenue())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidWindow { .. }));
    }
}
