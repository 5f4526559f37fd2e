//! Booking evaluation and slot search.
//!
//! [`AvailabilityService`] ties the pieces together for one restaurant
//! snapshot: rules validate the date and time, the allocator narrows
//! candidates, the detector checks each one and the resolver plans around
//! whatever conflicts remain.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::allocator::find_candidate_tables;
use crate::config::EngineConfig;
use crate::conflict::{
    detect_conflicts, detect_rush, has_hard_conflict, scan_reservations, Conflict,
    DetectionContext, ProposedBooking, ReservationConflicts, Severity,
};
use crate::error::{BookingError, Result, RuleViolation};
use crate::inventory::TableIndex;
use crate::model::{
    BookingPolicy, CombinedTable, OpeningHours, Reservation, ReservationId, RestaurantId,
    SpecialPeriod, Table, TableAssignment,
};
use crate::resolver::{
    apply_to_proposed, resolve_all, ResolutionPlan, ResolutionProposal, ResolverContext,
};
use crate::rules::AvailabilityRules;
use crate::store::BookingStore;
use crate::timeline::{find_first_free_window, find_free_windows, FreeWindow};
use crate::window::TimeWindow;

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Everything the engine needs to reason about one restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantSnapshot {
    pub restaurant_id: RestaurantId,
    /// IANA timezone the restaurant's hours are expressed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub policy: BookingPolicy,
    pub opening_hours: Vec<OpeningHours>,
    #[serde(default)]
    pub special_periods: Vec<SpecialPeriod>,
    pub tables: Vec<Table>,
    #[serde(default)]
    pub combined_tables: Vec<CombinedTable>,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
    #[serde(default)]
    pub config: EngineConfig,
}

impl RestaurantSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| BookingError::InvalidSnapshot(e.to_string()))
    }

    /// Gather a snapshot for `date` from the persistence layer.
    pub fn load<S: BookingStore + ?Sized>(
        store: &S,
        restaurant: &RestaurantId,
        date: NaiveDate,
    ) -> Result<Self> {
        Ok(Self {
            restaurant_id: restaurant.clone(),
            timezone: store.get_timezone(restaurant)?,
            policy: store.get_booking_policy(restaurant)?,
            opening_hours: store.get_opening_hours(restaurant)?,
            special_periods: store.get_special_periods(restaurant)?,
            tables: store.list_tables(restaurant)?,
            combined_tables: store.list_combined_tables(restaurant)?,
            reservations: store.list_reservations(restaurant, date)?,
            config: store.get_engine_config(restaurant)?,
        })
    }
}

/// A booking request as submitted by a guest or staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Set when re-evaluating a stored reservation (e.g. a reschedule).
    #[serde(default)]
    pub reservation_id: Option<ReservationId>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    /// Defaults to the policy's booking duration.
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    pub guest_count: u32,
    /// Staff may pin a table; otherwise one is allocated.
    #[serde(default)]
    pub assignment: Option<TableAssignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BookingOutcome {
    Accepted {
        assignment: TableAssignment,
        window: TimeWindow,
        /// Low-risk resolutions applied automatically on the way.
        auto_resolved: Vec<ResolutionProposal>,
    },
    Conflicted {
        assignment: TableAssignment,
        plans: Vec<ResolutionPlan>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingEvaluation {
    pub window: TimeWindow,
    pub guest_count: u32,
    pub outcome: BookingOutcome,
}

impl BookingEvaluation {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, BookingOutcome::Accepted { .. })
    }

    /// A high-severity unresolved conflict blocks creation outright.
    pub fn is_blocked(&self) -> bool {
        match &self.outcome {
            BookingOutcome::Accepted { .. } => false,
            BookingOutcome::Conflicted { plans, .. } => {
                plans.iter().any(|p| p.conflict.severity == Severity::High)
            }
        }
    }
}

/// A bookable start time and the assignments free for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub window: TimeWindow,
    pub assignments: Vec<TableAssignment>,
    /// The restaurant is near its seating threshold in this window.
    pub busy: bool,
}

pub struct AvailabilityService<'a> {
    snapshot: &'a RestaurantSnapshot,
    index: TableIndex,
    tz: Tz,
}

impl<'a> AvailabilityService<'a> {
    /// # Errors
    /// Returns `BookingError::InvalidTimezone` for an unknown IANA zone,
    /// `BookingError::InvalidCombinedTable` for inconsistent inventory and
    /// `BookingError::InvalidConfig` for out-of-range settings.
    pub fn new(snapshot: &'a RestaurantSnapshot) -> Result<Self> {
        let tz: Tz = snapshot
            .timezone
            .parse()
            .map_err(|_| BookingError::InvalidTimezone(snapshot.timezone.clone()))?;
        snapshot.config.validate()?;
        let index = TableIndex::build(&snapshot.tables, &snapshot.combined_tables)?;
        Ok(Self {
            snapshot,
            index,
            tz,
        })
    }

    pub fn index(&self) -> &TableIndex {
        &self.index
    }

    /// `now` expressed in restaurant-local wall-clock time.
    pub fn local_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.tz).naive_local()
    }

    pub fn rules(&self) -> AvailabilityRules<'a> {
        AvailabilityRules::new(
            &self.snapshot.policy,
            &self.snapshot.opening_hours,
            &self.snapshot.special_periods,
        )
    }

    pub fn detection(&self) -> DetectionContext<'_> {
        DetectionContext {
            index: &self.index,
            reservations: &self.snapshot.reservations,
            turnaround_minutes: self.snapshot.policy.turnaround_minutes,
            rush_threshold_ratio: self.snapshot.config.rush_threshold_ratio,
        }
    }

    fn resolver(&self, now: Option<NaiveDateTime>) -> ResolverContext<'_> {
        ResolverContext {
            detection: self.detection(),
            rules: self.rules(),
            config: &self.snapshot.config,
            now,
        }
    }

    /// Bookable start times on `date` for a party of `guest_count`.
    ///
    /// A day on which the restaurant is closed yields no slots. Individual
    /// slots failing notice or cut-off rules are skipped.
    ///
    /// # Errors
    /// Fails fast on an invalid guest count, a date outside the booking
    /// horizon, and `NoSuitableTable` when no table could ever seat the party.
    pub fn get_available_slots(
        &self,
        date: NaiveDate,
        guest_count: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<AvailableSlot>> {
        let rules = self.rules();
        rules.validate_guest_count(guest_count)?;
        let now = self.local_now(now);
        rules.check_booking_date(date, now)?;

        let candidates =
            find_candidate_tables(&self.index, guest_count, self.snapshot.config.empty_seats_buffer);
        if candidates.is_empty() {
            return Err(BookingError::NoSuitableTable {
                guests: guest_count,
            });
        }

        let Some((open, close)) = rules.opening_span(date) else {
            debug!(%date, "closed all day");
            return Ok(Vec::new());
        };

        let detection = self.detection();
        let step = chrono::Duration::minutes(i64::from(self.snapshot.config.slot_interval_minutes));
        let mut slots = Vec::new();
        let mut start = date.and_time(open);

        while start.date() == date && start.time() < close {
            let Ok(window) = rules.default_window(date, start.time()) else {
                break;
            };
            if !rules.fits_opening_hours(&window) {
                break;
            }
            start += step;

            if rules
                .is_within_booking_window(date, window.start_time(), now)
                .is_err()
            {
                continue;
            }

            let mut assignments = Vec::new();
            let mut busy = false;
            for candidate in &candidates {
                let proposed = ProposedBooking {
                    reservation_id: None,
                    assignment: candidate.assignment.clone(),
                    window,
                    guest_count,
                };
                if has_hard_conflict(&proposed, &detection) {
                    continue;
                }
                if assignments.is_empty() {
                    busy = detect_rush(&proposed, &detection).is_some();
                }
                assignments.push(candidate.assignment.clone());
            }
            if !assignments.is_empty() {
                slots.push(AvailableSlot {
                    window,
                    assignments,
                    busy,
                });
            }
        }

        Ok(slots)
    }

    /// Decide whether `request` can be booked as-is.
    ///
    /// Validation and policy failures are errors. Conflicts are not: they come
    /// back in [`BookingOutcome::Conflicted`] with ranked resolution plans, or
    /// inside [`BookingOutcome::Accepted`] when every one was low-risk and
    /// resolved automatically.
    pub fn evaluate_booking(
        &self,
        request: &BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<BookingEvaluation> {
        let rules = self.rules();
        let window = match request.end_time {
            Some(end) => TimeWindow::on(request.date, request.start_time, end)?,
            None => rules.default_window(request.date, request.start_time)?,
        };
        rules.validate_guest_count(request.guest_count)?;

        if !rules.fits_opening_hours(&window) {
            return Err(RuleViolation::RestaurantClosed { date: request.date }.into());
        }
        let now = self.local_now(now);
        rules.is_within_booking_window(request.date, request.start_time, now)?;

        let candidates: Vec<TableAssignment> = match &request.assignment {
            Some(assignment) => {
                self.index.ensure_bookable(assignment)?;
                vec![assignment.clone()]
            }
            None => find_candidate_tables(
                &self.index,
                request.guest_count,
                self.snapshot.config.empty_seats_buffer,
            )
            .into_iter()
            .map(|c| c.assignment)
            .collect(),
        };
        if candidates.is_empty() {
            return Err(BookingError::NoSuitableTable {
                guests: request.guest_count,
            });
        }

        let detection = self.detection();
        let proposals: Vec<ProposedBooking> = candidates
            .into_iter()
            .map(|assignment| ProposedBooking {
                reservation_id: request.reservation_id.clone(),
                assignment,
                window,
                guest_count: request.guest_count,
            })
            .collect();

        // Prefer a clean candidate, then one with only soft warnings, then
        // the tightest fit.
        let mut best: Option<(ProposedBooking, Vec<Conflict>)> = None;
        for proposed in proposals {
            let conflicts = detect_conflicts(&proposed, &detection);
            if conflicts.is_empty() {
                best = Some((proposed, conflicts));
                break;
            }
            let soft = conflicts.iter().all(|c| !c.kind.is_hard());
            let replace = match &best {
                None => true,
                Some((_, current)) => soft && current.iter().any(|c| c.kind.is_hard()),
            };
            if replace {
                best = Some((proposed, conflicts));
            }
        }
        let Some((proposed, conflicts)) = best else {
            return Err(BookingError::NoSuitableTable {
                guests: request.guest_count,
            });
        };

        let outcome = if conflicts.is_empty() {
            BookingOutcome::Accepted {
                assignment: proposed.assignment,
                window,
                auto_resolved: Vec::new(),
            }
        } else {
            let plans = resolve_all(&conflicts, &proposed, &self.resolver(Some(now)));
            if plans.iter().all(|p| p.auto_apply) {
                let mut resolved = proposed.clone();
                let mut applied = Vec::new();
                for plan in &plans {
                    if let Some(top) = plan.top() {
                        resolved = apply_to_proposed(&resolved, &top.action);
                        info!(
                            kind = ?plan.conflict.kind,
                            action = %top.action,
                            confidence = top.confidence,
                            "auto-resolved conflict"
                        );
                        applied.push(top.clone());
                    }
                }
                BookingOutcome::Accepted {
                    assignment: resolved.assignment,
                    window: resolved.window,
                    auto_resolved: applied,
                }
            } else {
                BookingOutcome::Conflicted {
                    assignment: proposed.assignment,
                    plans,
                }
            }
        };

        Ok(BookingEvaluation {
            window,
            guest_count: request.guest_count,
            outcome,
        })
    }

    /// Free gaps at `assignment` during the opening hours of `date`. With
    /// `min_duration_minutes`, only the first gap at least that long.
    ///
    /// # Errors
    /// `UnknownAssignment` or `InactiveAssignment` when the table cannot be
    /// booked at all.
    pub fn free_windows(
        &self,
        assignment: &TableAssignment,
        date: NaiveDate,
        min_duration_minutes: Option<i64>,
    ) -> Result<Vec<FreeWindow>> {
        self.index.ensure_bookable(assignment)?;
        let Some((open, close)) = self.rules().opening_span(date) else {
            return Ok(Vec::new());
        };
        let bounds = TimeWindow::on(date, open, close)?;
        let turnaround = self.snapshot.policy.turnaround_minutes;
        let reservations = &self.snapshot.reservations;
        Ok(match min_duration_minutes {
            Some(min) => find_first_free_window(
                &self.index,
                assignment,
                reservations,
                &bounds,
                turnaround,
                min,
            )
            .into_iter()
            .collect(),
            None => find_free_windows(&self.index, assignment, reservations, &bounds, turnaround),
        })
    }

    /// Conflicts among the snapshot's stored reservations.
    pub fn scan_conflicts(&self) -> Vec<ReservationConflicts> {
        scan_reservations(&self.detection())
    }

    /// Resolution plans for each stored reservation that has conflicts.
    pub fn plan_existing(&self) -> Vec<(ReservationId, Vec<ResolutionPlan>)> {
        let resolver = self.resolver(None);
        self.scan_conflicts()
            .into_iter()
            .filter_map(|rc| {
                let reservation = self
                    .snapshot
                    .reservations
                    .iter()
                    .find(|r| r.id == rc.reservation_id)?;
                let proposed = ProposedBooking::from_reservation(reservation).ok()?;
                Some((
                    rc.reservation_id,
                    resolve_all(&rc.conflicts, &proposed, &resolver),
                ))
            })
            .collect()
    }
}
