//! Tests for pool allocation and KYC caps

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use slice_config::PayoutConfig;

use crate::allocation::allocate;

fn units(pairs: &[(i64, f64)]) -> BTreeMap<i64, f64> {
    pairs.iter().copied().collect()
}

fn levels(pairs: &[(i64, i64)]) -> BTreeMap<i64, i64> {
    pairs.iter().copied().collect()
}

#[test]
fn test_proportional_split() {
    let alloc = allocate(
        10_000,
        &units(&[(1, 185.0), (2, 65.0)]),
        &levels(&[(1, 3), (2, 3)]),
        &PayoutConfig::default(),
    );

    assert_eq!(alloc.allocations[&1], 7_400);
    assert_eq!(alloc.allocations[&2], 2_600);
    assert_eq!(alloc.unallocated_cents, 0);
}

#[test]
fn test_level_zero_is_excluded_and_remainder_hits_cap() {
    // The level-0 creator's units vanish; the level-1 creator takes the
    // whole pool but their cap strands the rest.
    let alloc = allocate(
        10_000,
        &units(&[(1, 100.0), (2, 100.0)]),
        &levels(&[(1, 0), (2, 1)]),
        &PayoutConfig::default(),
    );

    assert!(!alloc.allocations.contains_key(&1));
    assert_eq!(alloc.allocations[&2], 5_000);
    assert_eq!(alloc.unallocated_cents, 5_000);
}

#[test]
fn test_capped_overflow_redistributes() {
    // Creator 1 would get 8000 but caps at 5000; the 3000 flows to
    // creator 2, who is uncapped.
    let alloc = allocate(
        10_000,
        &units(&[(1, 800.0), (2, 200.0)]),
        &levels(&[(1, 1), (2, 3)]),
        &PayoutConfig::default(),
    );

    assert_eq!(alloc.allocations[&1], 5_000);
    assert_eq!(alloc.allocations[&2], 5_000);
    assert_eq!(alloc.unallocated_cents, 0);
}

#[test]
fn test_floor_residue_is_reported_not_invented() {
    let alloc = allocate(
        100,
        &units(&[(1, 1.0), (2, 1.0), (3, 1.0)]),
        &levels(&[(1, 3), (2, 3), (3, 3)]),
        &PayoutConfig::default(),
    );

    assert_eq!(alloc.allocated_cents(), 99);
    assert_eq!(alloc.unallocated_cents, 1);
}

#[test]
fn test_zero_pool_and_zero_units() {
    let payout = PayoutConfig::default();

    let alloc = allocate(0, &units(&[(1, 10.0)]), &levels(&[(1, 3)]), &payout);
    assert!(alloc.allocations.is_empty());
    assert_eq!(alloc.unallocated_cents, 0);

    let alloc = allocate(10_000, &units(&[]), &levels(&[]), &payout);
    assert!(alloc.allocations.is_empty());
    assert_eq!(alloc.unallocated_cents, 10_000);
}

#[test]
fn test_unknown_creator_defaults_to_ineligible() {
    let alloc = allocate(
        1_000,
        &units(&[(1, 10.0)]),
        &levels(&[]),
        &PayoutConfig::default(),
    );
    assert!(alloc.allocations.is_empty());
    assert_eq!(alloc.unallocated_cents, 1_000);
}

#[test]
fn test_everyone_capped_strands_the_rest() {
    let alloc = allocate(
        100_000,
        &units(&[(1, 1.0), (2, 1.0)]),
        &levels(&[(1, 1), (2, 2)]),
        &PayoutConfig::default(),
    );

    assert_eq!(alloc.allocations[&1], 5_000);
    assert_eq!(alloc.allocations[&2], 50_000);
    assert_eq!(alloc.unallocated_cents, 45_000);
}

#[test]
fn test_randomized_runs_conserve_money_and_converge() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let payout = PayoutConfig::default();

    for _ in 0..200 {
        let n = rng.gen_range(1..=12);
        let mut us = BTreeMap::new();
        let mut ls = BTreeMap::new();
        for id in 0..n {
            us.insert(id, rng.gen_range(0.0..1_000.0));
            ls.insert(id, rng.gen_range(0..=4));
        }
        let pool = rng.gen_range(0..=1_000_000);

        let alloc = allocate(pool, &us, &ls, &payout);

        // Money is conserved exactly, never over-allocated.
        assert_eq!(alloc.allocated_cents() + alloc.unallocated_cents, pool);
        assert!(alloc.unallocated_cents >= 0);

        // Bounded by one freeze per round plus slack.
        assert!(alloc.rounds <= n as u32 + 2);

        // No creator ever exceeds their cap.
        for (id, amount) in &alloc.allocations {
            if let Some(cap) = payout.cap_for_level(ls[id]) {
                assert!(*amount <= cap, "creator {id} over cap: {amount} > {cap}");
            }
        }
    }
}
