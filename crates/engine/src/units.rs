//! Engagement unit computation
//!
//! Folds one day of viewer events into trust-weighted engagement units
//! per creator. Units are the allocation currency: a creator's payout is
//! proportional to their unit share of the pool.
//!
//! Two layers: pure per-video factors ([`video_units`]) over immutable
//! day stats, then a per-creator fold applying trailing-week diversity,
//! creator trust and the bot gate.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use slice_store::{EventKind, Store, Video, ViewerEvent};
use tracing::{debug, warn};

use crate::error::Result;

/// Event weights for the base unit formula
const W_VIEW: f64 = 1.0;
const W_LIKE: f64 = 3.0;
const W_COMMENT: f64 = 5.0;
const W_SHARE: f64 = 8.0;

/// Velocity kicker thresholds
const VELOCITY_MIN_EARLY_VIEWS: u64 = 50;
const VELOCITY_MIN_DEVICE_RATIO: f64 = 0.50;
const VELOCITY_MIN_IP_RATIO: f64 = 0.40;
const VELOCITY_KICKER: f64 = 1.05;

/// Cluster penalty thresholds
const CLUSTER_SHARE_THRESHOLD: f64 = 0.20;
const CLUSTER_MAX_PENALTY: f64 = 0.30;

/// One video's event counts and concentration measures for a day
#[derive(Debug, Clone, Default, Serialize)]
pub struct VideoDayStats {
    pub video_id: i64,
    pub creator_id: i64,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub reports: u64,
    /// Views landing within two hours of the video's creation (wall
    /// clock, so it may reach outside the day window)
    pub early_views: u64,
    /// Distinct view devices within the first two hours
    pub early_distinct_devices: u64,
    /// Distinct view IPs within the first two hours
    pub early_distinct_ips: u64,
    pub distinct_devices: u64,
    pub distinct_ips: u64,
    /// Largest single-device share of the day's views
    pub top_device_view_share: f64,
    /// Largest single-ip share of the day's views
    pub top_ip_view_share: f64,
}

impl VideoDayStats {
    /// Engagement rate: actions per view
    pub fn engagement_rate(&self) -> f64 {
        if self.views == 0 {
            return 0.0;
        }
        (self.likes + self.comments + self.shares) as f64 / self.views as f64
    }
}

/// Day-level context shared by every video's unit computation
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DayContext {
    /// Mean engagement rate across the day's videos
    pub rate_mean: f64,
    /// Population standard deviation of the engagement rate
    pub rate_std: f64,
}

impl DayContext {
    /// Build the context from a day's video stats
    pub fn from_stats(stats: &[VideoDayStats]) -> Self {
        let (rate_mean, rate_std) = mean_std(stats.iter().map(|s| s.engagement_rate()));
        Self { rate_mean, rate_std }
    }
}

/// One video's computed units and the factors that shaped them
#[derive(Debug, Clone, Serialize)]
pub struct VideoUnits {
    pub video_id: i64,
    pub creator_id: i64,
    pub base_units: f64,
    pub quality_multiplier: f64,
    pub velocity_multiplier: f64,
    pub cluster_multiplier: f64,
    pub units: f64,
}

/// One creator's folded units and the factors that shaped them
#[derive(Debug, Clone, Serialize)]
pub struct CreatorUnits {
    pub creator_id: i64,
    /// Sum of the creator's video units before creator-level factors
    pub raw_units: f64,
    pub integrity_multiplier: f64,
    pub trust_multiplier: f64,
    pub likely_bot: bool,
    pub units: f64,
}

/// Units for one day, per creator and per video
#[derive(Debug, Clone, Default, Serialize)]
pub struct DayUnits {
    /// Folded units keyed by creator id; iteration order is deterministic
    pub per_creator: BTreeMap<i64, CreatorUnits>,
    pub per_video: Vec<VideoUnits>,
    pub event_count: usize,
}

impl DayUnits {
    /// Final unit totals only, for allocation; bots and zero-unit
    /// creators are absent
    pub fn unit_totals(&self) -> BTreeMap<i64, f64> {
        self.per_creator
            .iter()
            .filter(|(_, c)| c.units > 0.0)
            .map(|(id, c)| (*id, c.units))
            .collect()
    }

    /// Sum of final units across creators
    pub fn total_units(&self) -> f64 {
        self.per_creator.values().map(|c| c.units).sum()
    }
}

/// Weighted event volume: views + 3 likes + 5 comments + 8 shares
pub fn base_units(stats: &VideoDayStats) -> f64 {
    W_VIEW * stats.views as f64
        + W_LIKE * stats.likes as f64
        + W_COMMENT * stats.comments as f64
        + W_SHARE * stats.shares as f64
}

/// Quality multiplier from the engagement-rate z-score within the day
///
/// A gentle +-2% nudge: `1 + clamp(z * 0.01, -0.02, 0.02)`. Degenerate
/// distributions (one video, zero spread) get exactly 1.
pub fn quality_multiplier(rate: f64, ctx: &DayContext) -> f64 {
    if ctx.rate_std <= f64::EPSILON {
        return 1.0;
    }
    let z = (rate - ctx.rate_mean) / ctx.rate_std;
    1.0 + (z * 0.01).clamp(-0.02, 0.02)
}

/// Velocity kicker for genuinely viral spread
///
/// x1.05 when a video pulls 50+ views in its first two hours AND that
/// early audience is spread across devices and IPs. Concentrated early
/// spikes (few devices, few IPs) get no kicker, no matter how the rest
/// of the day looks.
pub fn velocity_multiplier(stats: &VideoDayStats) -> f64 {
    if stats.early_views < VELOCITY_MIN_EARLY_VIEWS {
        return 1.0;
    }
    let device_ratio = stats.early_distinct_devices as f64 / stats.early_views as f64;
    let ip_ratio = stats.early_distinct_ips as f64 / stats.early_views as f64;
    if device_ratio >= VELOCITY_MIN_DEVICE_RATIO && ip_ratio >= VELOCITY_MIN_IP_RATIO {
        VELOCITY_KICKER
    } else {
        1.0
    }
}

/// Cluster penalty for views funneled through one device or IP
///
/// The worse of the two concentrations drives the penalty: above a 20%
/// single-source share, units are discounted twice as fast as the excess
/// share, capped at a 30% discount.
pub fn cluster_multiplier(stats: &VideoDayStats) -> f64 {
    let share = stats.top_device_view_share.max(stats.top_ip_view_share);
    if share <= CLUSTER_SHARE_THRESHOLD {
        return 1.0;
    }
    1.0 - (2.0 * (share - CLUSTER_SHARE_THRESHOLD)).min(CLUSTER_MAX_PENALTY)
}

/// All per-video factors combined
pub fn video_units(stats: &VideoDayStats, ctx: &DayContext) -> VideoUnits {
    let base = base_units(stats);
    let quality = quality_multiplier(stats.engagement_rate(), ctx);
    let velocity = velocity_multiplier(stats);
    let cluster = cluster_multiplier(stats);
    VideoUnits {
        video_id: stats.video_id,
        creator_id: stats.creator_id,
        base_units: base,
        quality_multiplier: quality,
        velocity_multiplier: velocity,
        cluster_multiplier: cluster,
        units: base * quality * velocity * cluster,
    }
}

/// View volume and spread within a video's first two hours
#[derive(Debug, Clone, Copy, Default)]
struct EarlyWindow {
    views: u64,
    distinct_devices: u64,
    distinct_ips: u64,
}

/// A creator's trailing-week audience diversity
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WeeklyDiversity {
    pub views: u64,
    pub likes_and_comments: u64,
    pub distinct_devices: u64,
    pub distinct_ips: u64,
}

/// Seven-day integrity multiplier from audience diversity
///
/// Three saturating diversity scores (devices, IPs, and interaction
/// depth, each relative to views) average into [0, 1] and map onto
/// [0.97, 1.03]. No trailing views is neutral.
pub fn integrity_multiplier(diversity: &WeeklyDiversity) -> f64 {
    if diversity.views == 0 {
        return 1.0;
    }
    let views = diversity.views as f64;
    let device_score = (5.0 * diversity.distinct_devices as f64 / views).min(1.0);
    let ip_score = (5.0 * diversity.distinct_ips as f64 / views).min(1.0);
    let depth_score = (10.0 * diversity.likes_and_comments as f64 / views).min(1.0);
    let avg = (device_score + ip_score + depth_score) / 3.0;
    0.97 + 0.06 * avg
}

/// Creator trust multiplier, [0.80, 1.20] across the 0-100 CTS range
///
/// Creators with no trust score yet are neutral.
pub fn trust_multiplier(cts: Option<f64>) -> f64 {
    match cts {
        Some(score) => (0.80 + 0.40 * (score / 100.0)).clamp(0.80, 1.20),
        None => 1.0,
    }
}

/// Computes per-creator units for a day against a store
pub struct UnitEngine<'a> {
    store: &'a Store,
}

impl<'a> UnitEngine<'a> {
    /// Create a unit engine over a store
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Fold all events in [start, end) into per-creator units
    pub async fn compute_day(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<DayUnits> {
        let video_ids = self.store.events().video_ids_in(start, end).await?;
        if video_ids.is_empty() {
            return Ok(DayUnits::default());
        }

        let videos: HashMap<i64, Video> = self
            .store
            .videos()
            .get_many(&video_ids)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let mut stats = Vec::new();
        let mut event_count = 0;
        for video_id in &video_ids {
            let Some(video) = videos.get(video_id) else {
                warn!(video_id = *video_id, "Events reference a missing video, skipping");
                continue;
            };
            let events = self.store.events().for_video_in(*video_id, start, end).await?;
            event_count += events.len();
            let early = self.early_window(video).await?;
            stats.push(day_stats(video, &events, early));
        }

        let ctx = DayContext::from_stats(&stats);
        let mut per_video = Vec::with_capacity(stats.len());
        let mut raw_by_creator: BTreeMap<i64, f64> = BTreeMap::new();
        for s in &stats {
            let vu = video_units(s, &ctx);
            *raw_by_creator.entry(vu.creator_id).or_insert(0.0) += vu.units;
            per_video.push(vu);
        }

        let creator_ids: Vec<i64> = raw_by_creator.keys().copied().collect();
        let users: HashMap<i64, slice_store::User> = self
            .store
            .users()
            .get_many(&creator_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let diversity = self.weekly_diversity(&videos, end).await?;

        let mut per_creator = BTreeMap::new();
        for (creator_id, raw_units) in raw_by_creator {
            let integrity =
                integrity_multiplier(diversity.get(&creator_id).unwrap_or(&WeeklyDiversity::default()));

            let (trust, likely_bot) = match users.get(&creator_id) {
                Some(user) => (trust_multiplier(user.creator_trust_score), user.likely_bot),
                None => {
                    warn!(creator_id, "Unknown creator, treating as untrusted");
                    (1.0, true)
                }
            };

            let units = if likely_bot {
                0.0
            } else {
                raw_units * integrity * trust
            };

            debug!(
                creator_id,
                raw_units, integrity, trust, units, "Folded creator units"
            );
            per_creator.insert(
                creator_id,
                CreatorUnits {
                    creator_id,
                    raw_units,
                    integrity_multiplier: integrity,
                    trust_multiplier: trust,
                    likely_bot,
                    units,
                },
            );
        }

        Ok(DayUnits {
            per_creator,
            per_video,
            event_count,
        })
    }

    /// Views and their device/IP spread within the video's first two
    /// wall-clock hours
    async fn early_window(&self, video: &Video) -> Result<EarlyWindow> {
        let cutoff = video.created_at + Duration::hours(2);
        let events = self
            .store
            .events()
            .for_video_in(video.id, video.created_at, cutoff)
            .await?;

        let mut early = EarlyWindow::default();
        let mut devices: HashSet<&str> = HashSet::new();
        let mut ips: HashSet<&str> = HashSet::new();
        for event in &events {
            if event.kind != EventKind::View || event.user_id == video.creator_id {
                continue;
            }
            early.views += 1;
            if let Some(device) = event.device_id.as_deref() {
                devices.insert(device);
            }
            if let Some(ip) = event.ip_hash.as_deref() {
                ips.insert(ip);
            }
        }
        early.distinct_devices = devices.len() as u64;
        early.distinct_ips = ips.len() as u64;
        Ok(early)
    }

    /// Trailing-7-day audience diversity per creator
    async fn weekly_diversity(
        &self,
        day_videos: &HashMap<i64, Video>,
        end: DateTime<Utc>,
    ) -> Result<HashMap<i64, WeeklyDiversity>> {
        let since = end - Duration::days(7);
        let events = self.store.events().in_range(since, end).await?;

        // Events may reference videos outside today's set.
        let mut missing: Vec<i64> = events
            .iter()
            .map(|e| e.video_id)
            .filter(|id| !day_videos.contains_key(id))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        let extra: HashMap<i64, Video> = self
            .store
            .videos()
            .get_many(&missing)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let creator_of = |video_id: i64| {
            day_videos
                .get(&video_id)
                .or_else(|| extra.get(&video_id))
                .map(|v| v.creator_id)
        };

        let mut out: HashMap<i64, WeeklyDiversity> = HashMap::new();
        let mut devices: HashMap<i64, HashSet<String>> = HashMap::new();
        let mut ips: HashMap<i64, HashSet<String>> = HashMap::new();
        for event in &events {
            let Some(creator_id) = creator_of(event.video_id) else {
                continue;
            };
            if event.user_id == creator_id {
                continue;
            }
            let entry = out.entry(creator_id).or_default();
            match event.kind {
                EventKind::View => {
                    entry.views += 1;
                    if let Some(device) = &event.device_id {
                        devices.entry(creator_id).or_default().insert(device.clone());
                    }
                    if let Some(ip) = &event.ip_hash {
                        ips.entry(creator_id).or_default().insert(ip.clone());
                    }
                }
                EventKind::Like | EventKind::Comment => entry.likes_and_comments += 1,
                _ => {}
            }
        }
        for (creator_id, entry) in out.iter_mut() {
            entry.distinct_devices = devices.get(creator_id).map_or(0, |s| s.len() as u64);
            entry.distinct_ips = ips.get(creator_id).map_or(0, |s| s.len() as u64);
        }

        Ok(out)
    }
}

/// Count one video's day of events, excluding creator self-engagement
fn day_stats(video: &Video, events: &[ViewerEvent], early: EarlyWindow) -> VideoDayStats {
    let mut stats = VideoDayStats {
        video_id: video.id,
        creator_id: video.creator_id,
        early_views: early.views,
        early_distinct_devices: early.distinct_devices,
        early_distinct_ips: early.distinct_ips,
        ..Default::default()
    };

    let mut devices: HashMap<&str, u64> = HashMap::new();
    let mut ips: HashMap<&str, u64> = HashMap::new();

    for event in events {
        if event.user_id == video.creator_id {
            continue;
        }
        match &event.kind {
            EventKind::View => {
                stats.views += 1;
                if let Some(device) = event.device_id.as_deref() {
                    *devices.entry(device).or_insert(0) += 1;
                }
                if let Some(ip) = event.ip_hash.as_deref() {
                    *ips.entry(ip).or_insert(0) += 1;
                }
            }
            EventKind::Like => stats.likes += 1,
            EventKind::Comment => stats.comments += 1,
            EventKind::Report => stats.reports += 1,
            EventKind::Share => stats.shares += 1,
            EventKind::Unknown(kind) => {
                warn!(video_id = video.id, kind = kind.as_str(), "Skipping unknown event kind");
            }
        }
    }

    stats.distinct_devices = devices.len() as u64;
    stats.distinct_ips = ips.len() as u64;
    if stats.views > 0 {
        let views = stats.views as f64;
        stats.top_device_view_share =
            devices.values().max().copied().unwrap_or(0) as f64 / views;
        stats.top_ip_view_share = ips.values().max().copied().unwrap_or(0) as f64 / views;
    }
    stats
}

/// Population mean and standard deviation
fn mean_std(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, var.max(0.0).sqrt())
}
