//! Pool allocation and KYC caps
//!
//! Converts a pool of cents into per-creator allocations proportional to
//! engagement units, then applies per-KYC-level caps with the freed money
//! redistributed among uncapped creators. Integer cents throughout; any
//! residue the caps or floor division strand is reported, never invented.

use std::collections::BTreeMap;

use serde::Serialize;
use slice_config::PayoutConfig;
use tracing::debug;

/// Result of allocating a pool across creators
#[derive(Debug, Clone, Serialize)]
pub struct Allocation {
    /// Cents per creator; only eligible creators with units appear
    pub allocations: BTreeMap<i64, i64>,
    /// Pool cents that could not be placed (caps, floor residue)
    pub unallocated_cents: i64,
    pub pool_cents: i64,
    /// Redistribution rounds taken
    pub rounds: u32,
}

impl Allocation {
    /// Total cents actually allocated
    pub fn allocated_cents(&self) -> i64 {
        self.allocations.values().sum()
    }
}

/// Allocate `pool_cents` proportionally to units, honoring KYC caps
///
/// `kyc_levels` maps creator id to KYC level; creators missing from it
/// are treated as level 0 and excluded. Capped creators are frozen at
/// their cap and the overflow re-split among the rest; the loop is
/// bounded because each extra round freezes at least one creator.
pub fn allocate(
    pool_cents: i64,
    units: &BTreeMap<i64, f64>,
    kyc_levels: &BTreeMap<i64, i64>,
    payout: &PayoutConfig,
) -> Allocation {
    let mut allocations: BTreeMap<i64, i64> = BTreeMap::new();

    // Level-0 creators are ineligible; their units never enter the split.
    let mut active: BTreeMap<i64, f64> = units
        .iter()
        .filter(|(id, u)| {
            **u > 0.0 && payout.cap_for_level(*kyc_levels.get(id).unwrap_or(&0)) != Some(0)
        })
        .map(|(id, u)| (*id, *u))
        .collect();

    for id in active.keys() {
        allocations.insert(*id, 0);
    }

    let max_rounds = active.len() as u32 + 2;
    let mut pool_left = pool_cents.max(0);
    let mut rounds = 0;

    while rounds < max_rounds && pool_left > 0 && !active.is_empty() {
        rounds += 1;
        let total_units: f64 = active.values().sum();
        if total_units <= 0.0 {
            break;
        }

        let mut distributed: i64 = 0;
        let mut still_active = BTreeMap::new();
        for (id, u) in &active {
            let proposed = (pool_left as f64 * u / total_units).floor() as i64;
            let already = allocations.get(id).copied().unwrap_or(0);
            let cap = payout.cap_for_level(*kyc_levels.get(id).unwrap_or(&0));
            let headroom = cap.map(|c| (c - already).max(0));

            let granted = match headroom {
                Some(room) => proposed.min(room),
                None => proposed,
            };
            allocations.insert(*id, already + granted);
            distributed += granted;

            // Creators still below their cap stay in the next round.
            if headroom.map(|room| granted < room).unwrap_or(true) {
                still_active.insert(*id, *u);
            }
        }

        pool_left -= distributed;
        let everyone_survived = still_active.len() == active.len();
        active = still_active;

        // Only floor residue is left; it cannot be split further.
        if everyone_survived && distributed == 0 {
            break;
        }
    }

    allocations.retain(|_, amount| *amount > 0);

    debug!(
        pool_cents,
        allocated = pool_cents.max(0) - pool_left,
        unallocated = pool_left,
        rounds,
        "Allocated pool"
    );

    Allocation {
        allocations,
        unallocated_cents: pool_left,
        pool_cents,
        rounds,
    }
}
