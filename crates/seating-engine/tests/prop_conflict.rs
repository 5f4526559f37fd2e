//! Property-based tests for window arithmetic and conflict detection.
//!
//! These check invariants that hold for any pair of same-day windows, not
//! just the hand-picked cases in `conflict_tests.rs`.

mod common;

use common::*;
use proptest::prelude::*;
use seating_engine::conflict::{check_capacity, find_double_booking};
use seating_engine::{DetectionContext, ProposedBooking, TimeWindow};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// A window starting between 10:00 and 20:00, 15 minutes to two hours long.
fn arb_window() -> impl Strategy<Value = TimeWindow> {
    (40u32..=80, 1u32..=8).prop_map(|(quarter, len)| {
        let start = quarter * 15;
        let end = start + len * 15;
        TimeWindow::on(
            service_day(),
            t(start / 60, start % 60),
            t(end / 60, end % 60),
        )
        .unwrap()
    })
}

fn arb_turnaround() -> impl Strategy<Value = u32> {
    prop_oneof![Just(0u32), Just(10), Just(15), Just(30)]
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

fn booking(window: TimeWindow, guests: u32) -> ProposedBooking {
    ProposedBooking {
        reservation_id: None,
        assignment: at("t1"),
        window,
        guest_count: guests,
    }
}

fn collides(existing: TimeWindow, proposed: TimeWindow, turnaround: u32) -> bool {
    let index = index();
    let reservations = vec![confirmed(
        "r1",
        "t1",
        existing.start_time(),
        existing.end_time(),
        2,
    )];
    let ctx = DetectionContext {
        index: &index,
        reservations: &reservations,
        turnaround_minutes: turnaround,
        rush_threshold_ratio: 0.8,
    };
    find_double_booking(&booking(proposed, 2), &ctx).is_some()
}

// ---------------------------------------------------------------------------
// Property 1: overlap is symmetric and matches the half-open definition
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn overlap_is_symmetric(a in arb_window(), b in arb_window()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        prop_assert_eq!(a.overlap_minutes(&b), b.overlap_minutes(&a));
        prop_assert_eq!(a.overlaps(&b), a.start < b.end && b.start < a.end);
        prop_assert_eq!(a.overlaps(&b), a.overlap_minutes(&b) > 0);
    }
}

// ---------------------------------------------------------------------------
// Property 2: double booking is symmetric in which side already exists
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn double_booking_is_symmetric(
        a in arb_window(),
        b in arb_window(),
        turnaround in arb_turnaround(),
    ) {
        prop_assert_eq!(collides(a, b, turnaround), collides(b, a, turnaround));
    }
}

// ---------------------------------------------------------------------------
// Property 3: a larger buffer never removes a conflict
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn buffer_is_monotonic(
        a in arb_window(),
        b in arb_window(),
        small in 0u32..=30,
        extra in 0u32..=30,
    ) {
        if collides(a, b, small) {
            prop_assert!(collides(a, b, small + extra));
        }
    }
}

// ---------------------------------------------------------------------------
// Property 4: collision iff the gap is shorter than twice the turnaround
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn collision_matches_gap_rule(
        a in arb_window(),
        b in arb_window(),
        turnaround in arb_turnaround(),
    ) {
        let gap = if a.end <= b.start {
            (b.start - a.end).num_minutes()
        } else if b.end <= a.start {
            (a.start - b.end).num_minutes()
        } else {
            -1
        };
        let expected = gap < 2 * i64::from(turnaround);
        prop_assert_eq!(collides(a, b, turnaround), expected);
    }
}

// ---------------------------------------------------------------------------
// Property 5: capacity conflict iff the party outgrows the table
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn capacity_conflict_iff_party_exceeds_seats(w in arb_window(), guests in 1u32..=12) {
        let index = index();
        let conflict = check_capacity(&booking(w, guests), &index);
        prop_assert_eq!(conflict.is_some(), guests > 4);
    }
}
