//! Integration tests for first-fit vs best-fit placement.

use pretty_assertions::assert_eq;
use segpool::{PlacementPolicy, Pool, SegmentState};

fn segments(pool: &Pool) -> Vec<(u64, u64, SegmentState)> {
    pool.inspect()
        .expect("inspect")
        .into_iter()
        .map(|info| (info.offset, info.size, info.state))
        .collect()
}

/// Two gaps separated by live allocations: 100 bytes at offset 0 and 300
/// bytes at offset 150, with a 350-byte tail.
fn fragmented_small_left(policy: PlacementPolicy) -> Pool {
    let mut pool = Pool::open(1000, policy).expect("open");
    let a = pool.allocate(100).expect("allocate a");
    let _keep = pool.allocate(50).expect("allocate keep");
    let b = pool.allocate(300).expect("allocate b");
    let _tail = pool.allocate(200).expect("allocate tail");
    pool.free(a).expect("free a");
    pool.free(b).expect("free b");
    assert_eq!(
        segments(&pool),
        vec![
            (0, 100, SegmentState::Free),
            (100, 50, SegmentState::Allocated),
            (150, 300, SegmentState::Free),
            (450, 200, SegmentState::Allocated),
            (650, 350, SegmentState::Free),
        ]
    );
    pool
}

/// The mirror image: 300 bytes free at offset 0, 100 bytes free at offset
/// 350, no tail gap.
fn fragmented_small_right(policy: PlacementPolicy) -> Pool {
    let mut pool = Pool::open(1000, policy).expect("open");
    let a = pool.allocate(300).expect("allocate a");
    let _keep = pool.allocate(50).expect("allocate keep");
    let b = pool.allocate(100).expect("allocate b");
    let _tail = pool.allocate(550).expect("allocate tail");
    pool.free(a).expect("free a");
    pool.free(b).expect("free b");
    assert_eq!(
        segments(&pool),
        vec![
            (0, 300, SegmentState::Free),
            (300, 50, SegmentState::Allocated),
            (350, 100, SegmentState::Free),
            (450, 550, SegmentState::Allocated),
        ]
    );
    pool
}

#[test]
fn best_fit_selects_the_smallest_gap() {
    let mut pool = fragmented_small_left(PlacementPolicy::BestFit);
    pool.allocate(90).expect("allocate");
    // The 100-byte gap at offset 0 is the best fit; 10 bytes remain of it.
    assert_eq!(
        segments(&pool),
        vec![
            (0, 90, SegmentState::Allocated),
            (90, 10, SegmentState::Free),
            (100, 50, SegmentState::Allocated),
            (150, 300, SegmentState::Free),
            (450, 200, SegmentState::Allocated),
            (650, 350, SegmentState::Free),
        ]
    );
}

#[test]
fn first_fit_agrees_when_the_leftmost_gap_is_smallest() {
    let mut pool = fragmented_small_left(PlacementPolicy::FirstFit);
    pool.allocate(90).expect("allocate");
    assert_eq!(
        segments(&pool)[..2],
        [(0, 90, SegmentState::Allocated), (90, 10, SegmentState::Free)]
    );
}

#[test]
fn policies_diverge_when_the_small_gap_is_on_the_right() {
    // FirstFit takes the leftmost (300-byte) gap.
    let mut pool = fragmented_small_right(PlacementPolicy::FirstFit);
    pool.allocate(90).expect("allocate");
    assert_eq!(
        segments(&pool),
        vec![
            (0, 90, SegmentState::Allocated),
            (90, 210, SegmentState::Free),
            (300, 50, SegmentState::Allocated),
            (350, 100, SegmentState::Free),
            (450, 550, SegmentState::Allocated),
        ]
    );

    // BestFit takes the smaller (100-byte) gap on the right.
    let mut pool = fragmented_small_right(PlacementPolicy::BestFit);
    pool.allocate(90).expect("allocate");
    assert_eq!(
        segments(&pool),
        vec![
            (0, 300, SegmentState::Free),
            (300, 50, SegmentState::Allocated),
            (350, 90, SegmentState::Allocated),
            (440, 10, SegmentState::Free),
            (450, 550, SegmentState::Allocated),
        ]
    );
}

#[test]
fn exact_fit_consumes_the_gap() {
    let mut pool = fragmented_small_left(PlacementPolicy::BestFit);
    assert_eq!(pool.num_gaps(), 3);
    pool.allocate(100).expect("allocate");
    // No remainder: the gap count drops by one.
    assert_eq!(pool.num_gaps(), 2);
    assert_eq!(segments(&pool)[0], (0, 100, SegmentState::Allocated));
}

#[test]
fn best_fit_tie_break_is_stable() {
    // Two equal 100-byte gaps; the one freed (indexed) later wins.
    let mut pool = Pool::open(1000, PlacementPolicy::BestFit).expect("open");
    let a = pool.allocate(100).expect("allocate a");
    let _keep = pool.allocate(50).expect("allocate keep");
    let b = pool.allocate(100).expect("allocate b");
    let _tail = pool.allocate(750).expect("allocate tail");
    pool.free(a).expect("free a");
    pool.free(b).expect("free b");

    pool.allocate(100).expect("allocate");
    assert_eq!(
        segments(&pool),
        vec![
            (0, 100, SegmentState::Free),
            (100, 50, SegmentState::Allocated),
            (150, 100, SegmentState::Allocated),
            (250, 750, SegmentState::Allocated),
        ]
    );
}

#[test]
fn first_fit_prefers_the_leftmost_of_equal_gaps() {
    let mut pool = Pool::open(1000, PlacementPolicy::FirstFit).expect("open");
    let a = pool.allocate(100).expect("allocate a");
    let _keep = pool.allocate(50).expect("allocate keep");
    let b = pool.allocate(100).expect("allocate b");
    let _tail = pool.allocate(750).expect("allocate tail");
    pool.free(a).expect("free a");
    pool.free(b).expect("free b");

    pool.allocate(100).expect("allocate");
    assert_eq!(
        segments(&pool),
        vec![
            (0, 100, SegmentState::Allocated),
            (100, 50, SegmentState::Allocated),
            (150, 100, SegmentState::Free),
            (250, 750, SegmentState::Allocated),
        ]
    );
}

#[test]
fn policy_is_fixed_at_open_time() {
    let pool = Pool::open(64, PlacementPolicy::BestFit).expect("open");
    assert_eq!(pool.policy(), PlacementPolicy::BestFit);
    assert_eq!(pool.config().policy, PlacementPolicy::BestFit);
}
