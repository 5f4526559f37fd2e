//! Detect conflicts between a proposed booking and existing reservations.
//!
//! Detection is pure: it reads the inventory and the day's reservations and
//! returns conflicts as values, so it can be run speculatively for previews
//! and again inside the writer's critical section.
//!
//! Three kinds are reported:
//! - `DoubleBooking`: an active reservation on an intersecting assignment
//!   overlaps once both windows are padded by the turnaround time.
//! - `CapacityExceeded`: the party is larger than the assignment seats.
//! - `RushOverlap`: concurrently seated guests across the whole restaurant
//!   exceed a share of total seating.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::inventory::TableIndex;
use crate::model::{Reservation, ReservationId, ReservationStatus, TableAssignment};
use crate::window::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    DoubleBooking,
    CapacityExceeded,
    RushOverlap,
}

impl ConflictKind {
    /// Hard conflicts make a placement impossible; rush warnings do not.
    pub fn is_hard(self) -> bool {
        !matches!(self, ConflictKind::RushOverlap)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A detected conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub conflicting_reservation_ids: Vec<ReservationId>,
    pub severity: Severity,
    pub affected: TableAssignment,
    /// Largest unpadded overlap with a conflicting reservation. Zero when only
    /// the turnaround buffers collide.
    pub overlap_minutes: i64,
    /// Peak concurrent guests in the window, for rush warnings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_guests: Option<u32>,
}

/// A booking being considered: a new request or an existing reservation
/// being re-checked (in which case it is excluded from its own comparison).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedBooking {
    #[serde(default)]
    pub reservation_id: Option<ReservationId>,
    pub assignment: TableAssignment,
    pub window: TimeWindow,
    pub guest_count: u32,
}

impl ProposedBooking {
    pub fn from_reservation(reservation: &Reservation) -> Result<Self> {
        Ok(Self {
            reservation_id: Some(reservation.id.clone()),
            assignment: reservation.assignment.clone(),
            window: reservation.window()?,
            guest_count: reservation.guest_count,
        })
    }

    pub fn with_assignment(&self, assignment: TableAssignment) -> Self {
        Self {
            assignment,
            ..self.clone()
        }
    }

    pub fn with_window(&self, window: TimeWindow) -> Self {
        Self {
            window,
            ..self.clone()
        }
    }

    fn is_self(&self, reservation: &Reservation) -> bool {
        self.reservation_id.as_ref() == Some(&reservation.id)
    }
}

/// Everything detection reads.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    pub index: &'a TableIndex,
    pub reservations: &'a [Reservation],
    pub turnaround_minutes: u32,
    pub rush_threshold_ratio: f64,
}

/// Active reservations on the proposal's date, excluding the proposal itself,
/// paired with their windows. Malformed records are skipped.
fn active_on_day<'a>(
    reservations: &'a [Reservation],
    proposed: &'a ProposedBooking,
) -> impl Iterator<Item = (&'a Reservation, TimeWindow)> + 'a {
    let date = proposed.window.date();
    reservations
        .iter()
        .filter(move |r| r.date == date && r.occupies_time() && !proposed.is_self(r))
        .filter_map(|r| match r.window() {
            Ok(w) => Some((r, w)),
            Err(e) => {
                warn!(reservation = %r.id, error = %e, "skipping reservation with invalid window");
                None
            }
        })
}

/// All conflicts for `proposed`, hard conflicts first.
pub fn detect_conflicts(proposed: &ProposedBooking, ctx: &DetectionContext<'_>) -> Vec<Conflict> {
    let conflicts: Vec<Conflict> = [
        find_double_booking(proposed, ctx),
        check_capacity(proposed, ctx.index),
        detect_rush(proposed, ctx),
    ]
    .into_iter()
    .flatten()
    .collect();

    if !conflicts.is_empty() {
        debug!(
            assignment = %proposed.assignment,
            window = %proposed.window,
            guests = proposed.guest_count,
            count = conflicts.len(),
            "conflicts detected"
        );
    }
    conflicts
}

/// Whether `proposed` collides with a reservation or exceeds capacity.
pub fn has_hard_conflict(proposed: &ProposedBooking, ctx: &DetectionContext<'_>) -> bool {
    check_capacity(proposed, ctx.index).is_some() || find_double_booking(proposed, ctx).is_some()
}

/// Active reservations on intersecting assignments whose buffered windows
/// overlap the buffered proposal.
///
/// Severity is `High` when any colliding reservation is confirmed and
/// `Medium` when all of them are still pending.
pub fn find_double_booking(
    proposed: &ProposedBooking,
    ctx: &DetectionContext<'_>,
) -> Option<Conflict> {
    let blocking = ctx.index.blocking_assignments(&proposed.assignment);
    let padded = proposed.window.with_buffer(ctx.turnaround_minutes);

    let mut ids = Vec::new();
    let mut any_confirmed = false;
    let mut overlap_minutes = 0;

    for (reservation, window) in active_on_day(ctx.reservations, proposed) {
        if !blocking.contains(&reservation.assignment) {
            continue;
        }
        if !padded.overlaps(&window.with_buffer(ctx.turnaround_minutes)) {
            continue;
        }
        any_confirmed |= reservation.status == ReservationStatus::Confirmed;
        overlap_minutes = overlap_minutes.max(proposed.window.overlap_minutes(&window));
        ids.push(reservation.id.clone());
    }

    if ids.is_empty() {
        return None;
    }
    Some(Conflict {
        kind: ConflictKind::DoubleBooking,
        conflicting_reservation_ids: ids,
        severity: if any_confirmed {
            Severity::High
        } else {
            Severity::Medium
        },
        affected: proposed.assignment.clone(),
        overlap_minutes,
        peak_guests: None,
    })
}

/// Party larger than the assigned seats. Reported regardless of occupancy.
pub fn check_capacity(proposed: &ProposedBooking, index: &TableIndex) -> Option<Conflict> {
    let capacity = index.capacity_of(&proposed.assignment)?;
    (proposed.guest_count > capacity).then(|| Conflict {
        kind: ConflictKind::CapacityExceeded,
        conflicting_reservation_ids: Vec::new(),
        severity: Severity::Medium,
        affected: proposed.assignment.clone(),
        overlap_minutes: 0,
        peak_guests: None,
    })
}

/// Restaurant-wide density check over the proposal's window.
///
/// Sweeps the guests of every active reservation overlapping the window and
/// adds the proposed party for the whole window. Flags when the peak exceeds
/// `rush_threshold_ratio` of total active seating.
pub fn detect_rush(proposed: &ProposedBooking, ctx: &DetectionContext<'_>) -> Option<Conflict> {
    let total = ctx.index.total_seating_capacity();
    if total == 0 {
        return None;
    }

    let mut ids = Vec::new();
    let mut events: Vec<(chrono::NaiveDateTime, i64)> = Vec::new();
    for (reservation, window) in active_on_day(ctx.reservations, proposed) {
        if !window.overlaps(&proposed.window) {
            continue;
        }
        let guests = i64::from(reservation.guest_count);
        events.push((window.start.max(proposed.window.start), guests));
        events.push((window.end.min(proposed.window.end), -guests));
        ids.push(reservation.id.clone());
    }

    // Ends sort before starts at the same instant (half-open windows).
    events.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    let mut current = 0i64;
    let mut peak = 0i64;
    for (_, delta) in &events {
        current += delta;
        peak = peak.max(current);
    }
    let peak = u32::try_from(peak)
        .unwrap_or(u32::MAX)
        .saturating_add(proposed.guest_count);

    if f64::from(peak) <= ctx.rush_threshold_ratio * f64::from(total) {
        return None;
    }
    Some(Conflict {
        kind: ConflictKind::RushOverlap,
        conflicting_reservation_ids: ids,
        severity: Severity::Low,
        affected: proposed.assignment.clone(),
        overlap_minutes: 0,
        peak_guests: Some(peak),
    })
}

/// Conflicts of one stored reservation against the rest of its day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationConflicts {
    pub reservation_id: ReservationId,
    pub conflicts: Vec<Conflict>,
}

/// Re-check every active reservation against the others.
pub fn scan_reservations(ctx: &DetectionContext<'_>) -> Vec<ReservationConflicts> {
    ctx.reservations
        .iter()
        .filter(|r| r.occupies_time())
        .filter_map(|r| {
            let proposed = ProposedBooking::from_reservation(r).ok()?;
            let conflicts = detect_conflicts(&proposed, ctx);
            (!conflicts.is_empty()).then(|| ReservationConflicts {
                reservation_id: r.id.clone(),
                conflicts,
            })
        })
        .collect()
}
