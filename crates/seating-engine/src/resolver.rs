//! Turn detected conflicts into ranked resolution proposals.
//!
//! Each conflict gets a [`ResolutionPlan`]: automated proposals that clear the
//! minimum confidence, ranked by confidence (desc) then customer impact (asc),
//! plus a manual-review option that is always present. A plan is flagged for
//! automatic application only for low-severity conflicts whose top proposal is
//! both confident enough and invisible to the guest.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::allocator::find_candidate_tables;
use crate::config::EngineConfig;
use crate::conflict::{
    detect_rush, find_double_booking, has_hard_conflict, Conflict, ConflictKind, DetectionContext,
    ProposedBooking, Severity,
};
use crate::error::{BookingError, Result};
use crate::model::{CombinedTableId, Reservation, ReservationId, TableAssignment};
use crate::rules::AvailabilityRules;
use crate::window::TimeWindow;

/// How noticeable a resolution is to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerImpact {
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Seat the party at another table or combined table.
    ReassignTable { to: TableAssignment },
    /// Keep the table, move the time.
    ShiftTime {
        offset_minutes: i64,
        window: TimeWindow,
    },
    /// Seat an oversized party at a combined table.
    SplitParty { combined: CombinedTableId },
    /// Proceed as requested; the warning is informational.
    Acknowledge,
    /// No automated fix; staff decide.
    ManualReview,
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionAction::ReassignTable { to } => write!(f, "reassign to {to}"),
            ResolutionAction::ShiftTime { offset_minutes, .. } => {
                write!(f, "shift {offset_minutes:+} min")
            }
            ResolutionAction::SplitParty { combined } => write!(f, "seat at combined:{combined}"),
            ResolutionAction::Acknowledge => f.write_str("acknowledge"),
            ResolutionAction::ManualReview => f.write_str("manual review"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionProposal {
    pub reservation_id: Option<ReservationId>,
    pub conflict_kind: ConflictKind,
    pub action: ResolutionAction,
    pub confidence: f64,
    pub impact: CustomerImpact,
}

impl ResolutionProposal {
    pub fn is_manual(&self) -> bool {
        matches!(self.action, ResolutionAction::ManualReview)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionPlan {
    pub conflict: Conflict,
    /// Ranked, best first. Never empty.
    pub proposals: Vec<ResolutionProposal>,
    pub auto_apply: bool,
}

impl ResolutionPlan {
    pub fn top(&self) -> Option<&ResolutionProposal> {
        self.proposals.first()
    }
}

/// What the resolver reads besides the conflict itself.
#[derive(Debug, Clone, Copy)]
pub struct ResolverContext<'a> {
    pub detection: DetectionContext<'a>,
    pub rules: AvailabilityRules<'a>,
    pub config: &'a EngineConfig,
    /// When set, shifted windows must also respect the booking window.
    pub now: Option<NaiveDateTime>,
}

/// Plans for every conflict of `proposed`, in conflict order.
pub fn resolve_all(
    conflicts: &[Conflict],
    proposed: &ProposedBooking,
    ctx: &ResolverContext<'_>,
) -> Vec<ResolutionPlan> {
    conflicts
        .iter()
        .map(|c| propose_resolutions(c, proposed, ctx))
        .collect()
}

pub fn propose_resolutions(
    conflict: &Conflict,
    proposed: &ProposedBooking,
    ctx: &ResolverContext<'_>,
) -> ResolutionPlan {
    let mut proposals = match conflict.kind {
        ConflictKind::DoubleBooking => {
            let mut p = reassign_table(conflict, proposed, ctx);
            p.extend(shift_time(conflict, proposed, ctx));
            p
        }
        ConflictKind::CapacityExceeded => {
            let mut p = reassign_table(conflict, proposed, ctx);
            p.extend(split_party(conflict, proposed, ctx));
            p
        }
        ConflictKind::RushOverlap => {
            let mut p = acknowledge(conflict, proposed, ctx);
            p.extend(shift_time(conflict, proposed, ctx));
            p
        }
    };

    proposals.retain(|p| p.confidence >= ctx.config.min_confidence);
    let fallback = proposals.is_empty();
    proposals.push(ResolutionProposal {
        reservation_id: proposed.reservation_id.clone(),
        conflict_kind: conflict.kind,
        action: ResolutionAction::ManualReview,
        confidence: if fallback { 1.0 } else { 0.0 },
        impact: CustomerImpact::None,
    });
    rank(&mut proposals);

    let auto_apply = should_auto_apply(conflict, &proposals, ctx.config);
    debug!(
        kind = ?conflict.kind,
        severity = ?conflict.severity,
        proposals = proposals.len(),
        auto_apply,
        "resolution plan built"
    );

    ResolutionPlan {
        conflict: conflict.clone(),
        proposals,
        auto_apply,
    }
}

/// Confidence descending, then least impact. Stable, so strategy order
/// breaks remaining ties.
pub fn rank(proposals: &mut [ResolutionProposal]) {
    proposals.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.impact.cmp(&b.impact))
    });
}

/// Low severity, confident, and invisible to the guest. High-severity
/// conflicts are never applied automatically.
pub fn should_auto_apply(
    conflict: &Conflict,
    ranked: &[ResolutionProposal],
    config: &EngineConfig,
) -> bool {
    if conflict.severity != Severity::Low {
        return false;
    }
    ranked.first().is_some_and(|top| {
        !top.is_manual()
            && top.confidence >= config.auto_resolve_threshold
            && top.impact == CustomerImpact::None
    })
}

fn reassign_table(
    conflict: &Conflict,
    proposed: &ProposedBooking,
    ctx: &ResolverContext<'_>,
) -> Vec<ResolutionProposal> {
    let index = ctx.detection.index;
    let original_capacity = index.capacity_of(&proposed.assignment);
    let original_room = index.room_of(&proposed.assignment);
    // Oversized parties at combined tables are the split-party strategy's job.
    let singles_only = conflict.kind == ConflictKind::CapacityExceeded;

    find_candidate_tables(index, proposed.guest_count, ctx.config.empty_seats_buffer)
        .into_iter()
        .filter(|c| c.assignment != proposed.assignment)
        .filter(|c| !singles_only || matches!(c.assignment, TableAssignment::Table(_)))
        .filter(|c| !has_hard_conflict(&proposed.with_assignment(c.assignment.clone()), &ctx.detection))
        .take(ctx.config.max_alternatives)
        .map(|c| {
            let fit = f64::from(proposed.guest_count) / f64::from(c.capacity.max(1));
            let comparable = original_capacity.is_some_and(|orig| {
                c.room_id == original_room
                    && c.capacity.abs_diff(orig) <= ctx.config.comparable_capacity_delta
            });
            ResolutionProposal {
                reservation_id: proposed.reservation_id.clone(),
                conflict_kind: conflict.kind,
                action: ResolutionAction::ReassignTable { to: c.assignment },
                confidence: (0.5 + 0.45 * fit).min(1.0),
                impact: if comparable {
                    CustomerImpact::Low
                } else {
                    CustomerImpact::Medium
                },
            }
        })
        .collect()
}

fn shift_time(
    conflict: &Conflict,
    proposed: &ProposedBooking,
    ctx: &ResolverContext<'_>,
) -> Vec<ResolutionProposal> {
    let max_offset = f64::from(ctx.config.max_shift_minutes().max(1));
    let mut offsets: Vec<i64> = ctx
        .config
        .shift_offsets_minutes
        .iter()
        .flat_map(|&m| [i64::from(m), -i64::from(m)])
        .collect();
    offsets.sort_by_key(|o| (o.abs(), *o < 0));
    offsets.dedup();

    offsets
        .into_iter()
        .filter_map(|offset| {
            let window = proposed.window.shifted(offset).ok()?;
            if !ctx.rules.fits_opening_hours(&window) {
                return None;
            }
            if let Some(now) = ctx.now {
                ctx.rules
                    .is_within_booking_window(window.date(), window.start_time(), now)
                    .ok()?;
            }
            let moved = proposed.with_window(window);
            if find_double_booking(&moved, &ctx.detection).is_some() {
                return None;
            }
            if conflict.kind == ConflictKind::RushOverlap
                && detect_rush(&moved, &ctx.detection).is_some()
            {
                return None;
            }
            let distance = offset.unsigned_abs();
            Some(ResolutionProposal {
                reservation_id: proposed.reservation_id.clone(),
                conflict_kind: conflict.kind,
                action: ResolutionAction::ShiftTime {
                    offset_minutes: offset,
                    window,
                },
                confidence: 0.9 - 0.3 * (distance as f64 / max_offset),
                impact: match distance {
                    0..=15 => CustomerImpact::Low,
                    16..=30 => CustomerImpact::Medium,
                    _ => CustomerImpact::High,
                },
            })
        })
        .collect()
}

fn split_party(
    conflict: &Conflict,
    proposed: &ProposedBooking,
    ctx: &ResolverContext<'_>,
) -> Vec<ResolutionProposal> {
    let index = ctx.detection.index;
    if proposed.guest_count <= index.largest_single_capacity() {
        return Vec::new();
    }

    find_candidate_tables(index, proposed.guest_count, ctx.config.empty_seats_buffer)
        .into_iter()
        .filter_map(|c| match c.assignment {
            TableAssignment::Combined(id) => Some((id, c.capacity)),
            TableAssignment::Table(_) => None,
        })
        .filter(|(id, _)| {
            let moved = proposed.with_assignment(TableAssignment::Combined(id.clone()));
            !has_hard_conflict(&moved, &ctx.detection)
        })
        .take(ctx.config.max_alternatives)
        .map(|(id, capacity)| ResolutionProposal {
            reservation_id: proposed.reservation_id.clone(),
            conflict_kind: conflict.kind,
            action: ResolutionAction::SplitParty { combined: id },
            confidence: if capacity == proposed.guest_count { 0.9 } else { 0.7 },
            impact: CustomerImpact::Low,
        })
        .collect()
}

fn acknowledge(
    conflict: &Conflict,
    proposed: &ProposedBooking,
    ctx: &ResolverContext<'_>,
) -> Vec<ResolutionProposal> {
    let total = ctx.detection.index.total_seating_capacity();
    let seatable = conflict.peak_guests.is_some_and(|peak| peak <= total);
    vec![ResolutionProposal {
        reservation_id: proposed.reservation_id.clone(),
        conflict_kind: conflict.kind,
        action: ResolutionAction::Acknowledge,
        confidence: if seatable { 0.9 } else { 0.3 },
        impact: CustomerImpact::None,
    }]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied,
    /// The reservation already reflects the proposal; nothing was changed.
    AlreadyResolved,
}

/// Whether `reservation` already reflects `action`.
pub fn is_reflected(reservation: &Reservation, action: &ResolutionAction) -> bool {
    match action {
        ResolutionAction::ReassignTable { to } => &reservation.assignment == to,
        ResolutionAction::ShiftTime { window, .. } => {
            reservation.date == window.date()
                && reservation.start_time == window.start_time()
                && reservation.end_time == window.end_time()
        }
        ResolutionAction::SplitParty { combined } => {
            reservation.assignment == TableAssignment::Combined(combined.clone())
        }
        ResolutionAction::Acknowledge => true,
        ResolutionAction::ManualReview => false,
    }
}

/// Apply `proposal` to `reservation`. Applying the same proposal again is a
/// no-op reported as [`ApplyOutcome::AlreadyResolved`].
///
/// # Errors
/// Returns `BookingError::ManualReviewRequired` for manual-review proposals.
pub fn apply_proposal(
    reservation: &mut Reservation,
    proposal: &ResolutionProposal,
) -> Result<ApplyOutcome> {
    if proposal.is_manual() {
        return Err(BookingError::ManualReviewRequired);
    }
    if is_reflected(reservation, &proposal.action) {
        return Ok(ApplyOutcome::AlreadyResolved);
    }
    match &proposal.action {
        ResolutionAction::ReassignTable { to } => reservation.assignment = to.clone(),
        ResolutionAction::ShiftTime { window, .. } => {
            reservation.date = window.date();
            reservation.start_time = window.start_time();
            reservation.end_time = window.end_time();
        }
        ResolutionAction::SplitParty { combined } => {
            reservation.assignment = TableAssignment::Combined(combined.clone());
        }
        ResolutionAction::Acknowledge | ResolutionAction::ManualReview => {}
    }
    Ok(ApplyOutcome::Applied)
}

/// The booking as it would stand after `action`.
pub fn apply_to_proposed(proposed: &ProposedBooking, action: &ResolutionAction) -> ProposedBooking {
    match action {
        ResolutionAction::ReassignTable { to } => proposed.with_assignment(to.clone()),
        ResolutionAction::ShiftTime { window, .. } => proposed.with_window(*window),
        ResolutionAction::SplitParty { combined } => {
            proposed.with_assignment(TableAssignment::Combined(combined.clone()))
        }
        ResolutionAction::Acknowledge | ResolutionAction::ManualReview => proposed.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(confidence: f64, impact: CustomerImpact) -> ResolutionProposal {
        ResolutionProposal {
            reservation_id: None,
            conflict_kind: ConflictKind::RushOverlap,
            action: ResolutionAction::Acknowledge,
            confidence,
            impact,
        }
    }

    #[test]
    fn ranking_prefers_confidence_then_low_impact() {
        let mut ps = vec![
            proposal(0.6, CustomerImpact::None),
            proposal(0.8, CustomerImpact::Medium),
            proposal(0.8, CustomerImpact::Low),
        ];
        rank(&mut ps);
        assert_eq!(ps[0].impact, CustomerImpact::Low);
        assert_eq!(ps[1].impact, CustomerImpact::Medium);
        assert_eq!(ps[2].confidence, 0.6);
    }

    #[test]
    fn impact_orders_none_first() {
        assert!(CustomerImpact::None < CustomerImpact::Low);
        assert!(CustomerImpact::Medium < CustomerImpact::High);
    }
}
