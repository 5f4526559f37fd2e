//! Tests for resolution proposals, ranking and the auto-apply policy.

mod common;

use common::*;
use seating_engine::resolver::{resolve_all, should_auto_apply, ResolverContext};
use seating_engine::{
    apply_proposal, detect_conflicts, propose_resolutions, ApplyOutcome, AvailabilityRules,
    BookingError, BookingPolicy, Conflict, ConflictKind, CustomerImpact, DetectionContext,
    EngineConfig, OpeningHours, ProposedBooking, Reservation, ReservationId, ResolutionAction,
    ResolutionPlan, ResolutionProposal, Severity, TableAssignment, TableIndex, TimeWindow,
};

struct Fixture {
    index: TableIndex,
    reservations: Vec<Reservation>,
    policy: BookingPolicy,
    hours: Vec<OpeningHours>,
    config: EngineConfig,
}

impl Fixture {
    fn new(reservations: Vec<Reservation>) -> Self {
        Self {
            index: index(),
            reservations,
            policy: policy(),
            hours: all_week(t(12, 0), t(23, 0)),
            config: EngineConfig::default(),
        }
    }

    fn turnaround(mut self, minutes: u32) -> Self {
        self.policy.turnaround_minutes = minutes;
        self
    }

    fn ctx(&self) -> ResolverContext<'_> {
        ResolverContext {
            detection: DetectionContext {
                index: &self.index,
                reservations: &self.reservations,
                turnaround_minutes: self.policy.turnaround_minutes,
                rush_threshold_ratio: self.config.rush_threshold_ratio,
            },
            rules: AvailabilityRules::new(&self.policy, &self.hours, &[]),
            config: &self.config,
            now: None,
        }
    }

    fn plans(&self, proposed: &ProposedBooking) -> Vec<ResolutionPlan> {
        let ctx = self.ctx();
        let conflicts = detect_conflicts(proposed, &ctx.detection);
        resolve_all(&conflicts, proposed, &ctx)
    }
}

fn request(assignment: TableAssignment, start: chrono::NaiveTime, end: chrono::NaiveTime, guests: u32) -> ProposedBooking {
    ProposedBooking {
        reservation_id: None,
        assignment,
        window: TimeWindow::on(service_day(), start, end).unwrap(),
        guest_count: guests,
    }
}

fn actions(plan: &ResolutionPlan) -> Vec<String> {
    plan.proposals.iter().map(|p| p.action.to_string()).collect()
}

// ── Double booking ──────────────────────────────────────────────────────────

#[test]
fn turnaround_collision_offers_reassignment_and_a_later_slot() {
    // Existing 19:00–20:00 padded to 18:30–20:30; request 20:15–21:15 padded
    // to 19:45–21:45.
    let fx = Fixture::new(vec![confirmed("r1", "t1", t(19, 0), t(20, 0), 4)]).turnaround(30);
    let plans = fx.plans(&request(at("t1"), t(20, 15), t(21, 15), 4));

    assert_eq!(plans.len(), 1);
    let plan = &plans[0];
    assert_eq!(plan.conflict.kind, ConflictKind::DoubleBooking);
    assert_eq!(plan.conflict.severity, Severity::High);
    assert_eq!(
        actions(plan),
        vec![
            "reassign to table:t2",
            "reassign to table:t4",
            "shift +60 min",
            "manual review"
        ]
    );

    let top = plan.top().unwrap();
    assert!((top.confidence - 0.95).abs() < 1e-9);
    assert_eq!(top.impact, CustomerImpact::Low);
    assert_eq!(plan.proposals[1].impact, CustomerImpact::Medium, "terrace is another room");

    match &plan.proposals[2].action {
        ResolutionAction::ShiftTime { offset_minutes, window } => {
            assert_eq!(*offset_minutes, 60);
            assert_eq!(window.start_time(), t(21, 15));
            assert_eq!(window.end_time(), t(22, 15));
        }
        other => panic!("expected a time shift, got {other:?}"),
    }
    assert_eq!(plan.proposals[2].impact, CustomerImpact::High);
    assert!(!plan.auto_apply, "high severity is never applied automatically");
}

#[test]
fn proposals_are_sorted_by_confidence_then_impact() {
    let fx = Fixture::new(vec![confirmed("r1", "t1", t(19, 0), t(20, 0), 4)]).turnaround(30);
    let plans = fx.plans(&request(at("t1"), t(20, 15), t(21, 15), 4));
    let ps = &plans[0].proposals;
    for pair in ps.windows(2) {
        assert!(
            pair[0].confidence > pair[1].confidence
                || (pair[0].confidence == pair[1].confidence && pair[0].impact <= pair[1].impact)
        );
    }
}

#[test]
fn low_confidence_alternatives_are_dropped() {
    let mut fx = Fixture::new(vec![confirmed("r1", "t1", t(19, 0), t(20, 0), 4)]).turnaround(30);
    fx.config.min_confidence = 0.9;
    let plans = fx.plans(&request(at("t1"), t(20, 15), t(21, 15), 4));
    assert_eq!(actions(&plans[0]), vec!["reassign to table:t2", "manual review"]);
}

#[test]
fn manual_review_when_nothing_else_works() {
    let mut fx = Fixture::new(vec![confirmed("r1", "t1", t(19, 0), t(21, 0), 4)]);
    fx.index = TableIndex::build(&[table("t1", 1, 4, "main")], &[]).unwrap();

    let plans = fx.plans(&request(at("t1"), t(19, 30), t(21, 30), 4));
    let plan = &plans[0];
    assert_eq!(plan.proposals.len(), 1);
    let only = plan.top().unwrap();
    assert!(only.is_manual());
    assert_eq!(only.confidence, 1.0);
    assert!(!plan.auto_apply);
}

#[test]
fn shifts_stay_inside_opening_hours() {
    // Late request; moving it later would run past closing.
    let fx = Fixture::new(vec![confirmed("r1", "t3", t(20, 30), t(22, 30), 2)]);
    let plans = fx.plans(&request(at("t3"), t(21, 0), t(23, 0), 2));
    for p in &plans[0].proposals {
        if let ResolutionAction::ShiftTime { window, .. } = &p.action {
            assert!(window.end_time() <= t(23, 0));
        }
    }
}

// ── Capacity ────────────────────────────────────────────────────────────────

#[test]
fn oversized_party_moves_to_a_bigger_single_table() {
    let fx = Fixture::new(Vec::new());
    let plans = fx.plans(&request(at("t3"), t(19, 0), t(21, 0), 3));
    let plan = &plans[0];
    assert_eq!(plan.conflict.kind, ConflictKind::CapacityExceeded);
    assert_eq!(
        actions(plan),
        vec![
            "reassign to table:t1",
            "reassign to table:t2",
            "reassign to table:t4",
            "manual review"
        ]
    );
    assert_eq!(plan.proposals[0].impact, CustomerImpact::Low);
    assert!(!plan.auto_apply);
}

#[test]
fn party_too_large_for_any_single_table_is_split() {
    let fx = Fixture::new(Vec::new());
    let plans = fx.plans(&request(at("t4"), t(19, 0), t(21, 0), 7));
    let plan = &plans[0];
    assert_eq!(plan.conflict.kind, ConflictKind::CapacityExceeded);
    assert_eq!(actions(plan), vec!["seat at combined:c12", "manual review"]);
    assert!((plan.proposals[0].confidence - 0.7).abs() < 1e-9);
    assert_eq!(plan.proposals[0].impact, CustomerImpact::Low);
}

#[test]
fn split_skips_occupied_combined_tables() {
    let fx = Fixture::new(vec![confirmed("r1", "t2", t(20, 0), t(22, 0), 2)]);
    let plans = fx.plans(&request(at("t4"), t(19, 0), t(21, 0), 8));
    let capacity_plan = plans
        .iter()
        .find(|p| p.conflict.kind == ConflictKind::CapacityExceeded)
        .unwrap();
    assert_eq!(actions(capacity_plan), vec!["manual review"]);
}

// ── Rush ────────────────────────────────────────────────────────────────────

#[test]
fn seatable_rush_is_acknowledged_automatically() {
    let fx = Fixture::new(vec![
        confirmed("r1", "t1", t(19, 0), t(21, 0), 4),
        confirmed("r2", "t4", t(19, 30), t(21, 30), 6),
    ]);
    let plans = fx.plans(&request(at("t2"), t(20, 0), t(22, 0), 4));
    assert_eq!(plans.len(), 1);
    let plan = &plans[0];
    assert_eq!(plan.conflict.kind, ConflictKind::RushOverlap);
    let top = plan.top().unwrap();
    assert_eq!(top.action, ResolutionAction::Acknowledge);
    assert_eq!(top.impact, CustomerImpact::None);
    assert!(plan.auto_apply);
}

#[test]
fn auto_apply_respects_the_threshold() {
    let mut fx = Fixture::new(vec![
        confirmed("r1", "t1", t(19, 0), t(21, 0), 4),
        confirmed("r2", "t4", t(19, 30), t(21, 30), 6),
    ]);
    fx.config.auto_resolve_threshold = 0.95;
    let plans = fx.plans(&request(at("t2"), t(20, 0), t(22, 0), 4));
    assert!(!plans[0].auto_apply);
}

#[test]
fn high_severity_never_auto_applies() {
    let conflict = Conflict {
        kind: ConflictKind::DoubleBooking,
        conflicting_reservation_ids: vec![ReservationId::from("r1")],
        severity: Severity::High,
        affected: at("t1"),
        overlap_minutes: 30,
        peak_guests: None,
    };
    let perfect = ResolutionProposal {
        reservation_id: None,
        conflict_kind: ConflictKind::DoubleBooking,
        action: ResolutionAction::ReassignTable { to: at("t2") },
        confidence: 1.0,
        impact: CustomerImpact::None,
    };
    assert!(!should_auto_apply(&conflict, &[perfect.clone()], &EngineConfig::default()));

    let low = Conflict {
        severity: Severity::Low,
        ..conflict
    };
    assert!(should_auto_apply(&low, &[perfect], &EngineConfig::default()));
}

#[test]
fn single_conflict_plan_matches_resolve_all() {
    let fx = Fixture::new(vec![confirmed("r1", "t1", t(19, 0), t(20, 0), 4)]).turnaround(30);
    let proposed = request(at("t1"), t(20, 15), t(21, 15), 4);
    let ctx = fx.ctx();
    let conflicts = detect_conflicts(&proposed, &ctx.detection);
    let plan = propose_resolutions(&conflicts[0], &proposed, &ctx);
    assert_eq!(vec![plan], fx.plans(&proposed));
}

// ── Applying ────────────────────────────────────────────────────────────────

#[test]
fn applying_twice_is_a_no_op() {
    let mut r = confirmed("r1", "t1", t(19, 0), t(21, 0), 4);
    let proposal = ResolutionProposal {
        reservation_id: Some(r.id.clone()),
        conflict_kind: ConflictKind::DoubleBooking,
        action: ResolutionAction::ShiftTime {
            offset_minutes: 30,
            window: TimeWindow::on(service_day(), t(19, 30), t(21, 30)).unwrap(),
        },
        confidence: 0.75,
        impact: CustomerImpact::Medium,
    };

    assert_eq!(apply_proposal(&mut r, &proposal), Ok(ApplyOutcome::Applied));
    assert_eq!(r.start_time, t(19, 30));
    assert_eq!(r.end_time, t(21, 30));
    let after_first = r.clone();

    assert_eq!(apply_proposal(&mut r, &proposal), Ok(ApplyOutcome::AlreadyResolved));
    assert_eq!(r, after_first);
}

#[test]
fn reassignment_moves_the_reservation() {
    let mut r = confirmed("r1", "t1", t(19, 0), t(21, 0), 4);
    let proposal = ResolutionProposal {
        reservation_id: Some(r.id.clone()),
        conflict_kind: ConflictKind::DoubleBooking,
        action: ResolutionAction::ReassignTable { to: at("t2") },
        confidence: 0.95,
        impact: CustomerImpact::Low,
    };
    assert_eq!(apply_proposal(&mut r, &proposal), Ok(ApplyOutcome::Applied));
    assert_eq!(r.assignment, at("t2"));
}

#[test]
fn manual_review_cannot_be_applied() {
    let mut r = confirmed("r1", "t1", t(19, 0), t(21, 0), 4);
    let proposal = ResolutionProposal {
        reservation_id: Some(r.id.clone()),
        conflict_kind: ConflictKind::DoubleBooking,
        action: ResolutionAction::ManualReview,
        confidence: 1.0,
        impact: CustomerImpact::None,
    };
    assert_eq!(
        apply_proposal(&mut r, &proposal),
        Err(BookingError::ManualReviewRequired)
    );
}

#[test]
fn acknowledgement_changes_nothing() {
    let mut r = confirmed("r1", "t1", t(19, 0), t(21, 0), 4);
    let before = r.clone();
    let proposal = ResolutionProposal {
        reservation_id: Some(r.id.clone()),
        conflict_kind: ConflictKind::RushOverlap,
        action: ResolutionAction::Acknowledge,
        confidence: 0.9,
        impact: CustomerImpact::None,
    };
    assert_eq!(apply_proposal(&mut r, &proposal), Ok(ApplyOutcome::AlreadyResolved));
    assert_eq!(r, before);
}
