//! Persistence seam and an in-memory reference store.
//!
//! The engine itself performs no I/O. A [`BookingStore`] supplies the data it
//! reasons about and owns the write path: `create_reservation` and
//! `apply_resolution` must re-run conflict detection inside the same critical
//! section that performs the write, so two requests racing for one table and
//! window cannot both succeed.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::conflict::{
    check_capacity, detect_conflicts, find_double_booking, Conflict, ConflictKind,
    DetectionContext, ProposedBooking,
};
use crate::error::{BookingError, Result};
use crate::inventory::TableIndex;
use crate::model::{
    BookingPolicy, CombinedTable, CustomerInfo, OpeningHours, Reservation, ReservationId,
    ReservationStatus, RestaurantId, SpecialPeriod, Table, TableAssignment,
};
use crate::resolver::{apply_proposal, is_reflected, ResolutionProposal};
use crate::service::RestaurantSnapshot;
use crate::window::TimeWindow;

/// A reservation about to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    pub assignment: TableAssignment,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub guest_count: u32,
    #[serde(default = "default_status")]
    pub status: ReservationStatus,
    #[serde(default)]
    pub customer: CustomerInfo,
    /// Staff may seat a party larger than the table.
    #[serde(default)]
    pub allow_capacity_override: bool,
}

fn default_status() -> ReservationStatus {
    ReservationStatus::Pending
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreateOutcome {
    Created { reservation: Reservation },
    /// A conflicting write won; nothing was stored.
    Rejected { conflicts: Vec<Conflict> },
}

/// Result of applying a resolution through a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StoreApplyOutcome {
    Applied { reservation: Reservation },
    /// Already in effect; nothing was changed.
    AlreadyResolved,
    /// The reservations changed since the proposal was made and it would now
    /// collide.
    Superseded { conflicts: Vec<Conflict> },
}

pub trait BookingStore: Send + Sync {
    fn list_reservations(&self, restaurant: &RestaurantId, date: NaiveDate)
        -> Result<Vec<Reservation>>;

    fn list_tables(&self, restaurant: &RestaurantId) -> Result<Vec<Table>>;

    fn list_combined_tables(&self, restaurant: &RestaurantId) -> Result<Vec<CombinedTable>>;

    fn get_booking_policy(&self, restaurant: &RestaurantId) -> Result<BookingPolicy>;

    fn get_opening_hours(&self, restaurant: &RestaurantId) -> Result<Vec<OpeningHours>>;

    fn get_special_periods(&self, restaurant: &RestaurantId) -> Result<Vec<SpecialPeriod>>;

    fn get_timezone(&self, _restaurant: &RestaurantId) -> Result<String> {
        Ok("UTC".to_string())
    }

    fn get_engine_config(&self, _restaurant: &RestaurantId) -> Result<EngineConfig> {
        Ok(EngineConfig::default())
    }

    /// Write `new` unless it double-books (or exceeds capacity without an
    /// override) at the moment of writing.
    fn create_reservation(
        &self,
        restaurant: &RestaurantId,
        new: NewReservation,
        now: NaiveDateTime,
    ) -> Result<CreateOutcome>;

    /// Move a reservation along its lifecycle.
    fn update_status(
        &self,
        restaurant: &RestaurantId,
        id: &ReservationId,
        status: ReservationStatus,
    ) -> Result<Reservation>;

    /// Apply an accepted resolution proposal. Idempotent.
    ///
    /// The moved reservation must still be active and land on a bookable
    /// assignment with enough seats and no overlapping booking.
    fn apply_resolution(
        &self,
        restaurant: &RestaurantId,
        proposal: &ResolutionProposal,
    ) -> Result<StoreApplyOutcome>;
}

/// In-process store keyed by restaurant. Each restaurant's book is guarded by
/// its map entry, which serialises writers for that restaurant.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    books: DashMap<RestaurantId, RestaurantSnapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_restaurant(&self, snapshot: RestaurantSnapshot) {
        self.books.insert(snapshot.restaurant_id.clone(), snapshot);
    }

    pub fn get_reservation(
        &self,
        restaurant: &RestaurantId,
        id: &ReservationId,
    ) -> Result<Reservation> {
        self.read(restaurant, |book| {
            book.reservations
                .iter()
                .find(|r| &r.id == id)
                .cloned()
                .ok_or_else(|| BookingError::ReservationNotFound(id.clone()))
        })?
    }

    pub fn reservation_count(&self, restaurant: &RestaurantId) -> Result<usize> {
        self.read(restaurant, |book| book.reservations.len())
    }

    fn read<T>(
        &self,
        restaurant: &RestaurantId,
        f: impl FnOnce(&RestaurantSnapshot) -> T,
    ) -> Result<T> {
        self.books
            .get(restaurant)
            .map(|book| f(&book))
            .ok_or_else(|| BookingError::RestaurantNotFound(restaurant.to_string()))
    }

    fn write(&self, restaurant: &RestaurantId) -> Result<RefMut<'_, RestaurantId, RestaurantSnapshot>> {
        self.books
            .get_mut(restaurant)
            .ok_or_else(|| BookingError::RestaurantNotFound(restaurant.to_string()))
    }
}

fn detection<'a>(book: &'a RestaurantSnapshot, index: &'a TableIndex) -> DetectionContext<'a> {
    DetectionContext {
        index,
        reservations: &book.reservations,
        turnaround_minutes: book.policy.turnaround_minutes,
        rush_threshold_ratio: book.config.rush_threshold_ratio,
    }
}

impl BookingStore for InMemoryStore {
    fn list_reservations(
        &self,
        restaurant: &RestaurantId,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>> {
        self.read(restaurant, |book| {
            book.reservations
                .iter()
                .filter(|r| r.date == date)
                .cloned()
                .collect()
        })
    }

    fn list_tables(&self, restaurant: &RestaurantId) -> Result<Vec<Table>> {
        self.read(restaurant, |book| book.tables.clone())
    }

    fn list_combined_tables(&self, restaurant: &RestaurantId) -> Result<Vec<CombinedTable>> {
        self.read(restaurant, |book| book.combined_tables.clone())
    }

    fn get_booking_policy(&self, restaurant: &RestaurantId) -> Result<BookingPolicy> {
        self.read(restaurant, |book| book.policy.clone())
    }

    fn get_opening_hours(&self, restaurant: &RestaurantId) -> Result<Vec<OpeningHours>> {
        self.read(restaurant, |book| book.opening_hours.clone())
    }

    fn get_special_periods(&self, restaurant: &RestaurantId) -> Result<Vec<SpecialPeriod>> {
        self.read(restaurant, |book| book.special_periods.clone())
    }

    fn get_timezone(&self, restaurant: &RestaurantId) -> Result<String> {
        self.read(restaurant, |book| book.timezone.clone())
    }

    fn get_engine_config(&self, restaurant: &RestaurantId) -> Result<EngineConfig> {
        self.read(restaurant, |book| book.config.clone())
    }

    fn create_reservation(
        &self,
        restaurant: &RestaurantId,
        new: NewReservation,
        now: NaiveDateTime,
    ) -> Result<CreateOutcome> {
        let window = TimeWindow::on(new.date, new.start_time, new.end_time)?;
        let mut book = self.write(restaurant)?;

        if new.guest_count == 0 {
            return Err(BookingError::InvalidGuestCount {
                count: 0,
                min: book.policy.min_guests,
                max: book.policy.max_guests,
            });
        }
        let index = TableIndex::build(&book.tables, &book.combined_tables)?;
        index.ensure_bookable(&new.assignment)?;

        let proposed = ProposedBooking {
            reservation_id: None,
            assignment: new.assignment.clone(),
            window,
            guest_count: new.guest_count,
        };
        let conflicts = detect_conflicts(&proposed, &detection(&book, &index));
        let blocked = conflicts.iter().any(|c| match c.kind {
            ConflictKind::DoubleBooking => true,
            ConflictKind::CapacityExceeded => !new.allow_capacity_override,
            ConflictKind::RushOverlap => false,
        });
        if blocked {
            warn!(
                restaurant = %restaurant,
                assignment = %new.assignment,
                window = %window,
                "reservation rejected at write time"
            );
            return Ok(CreateOutcome::Rejected { conflicts });
        }

        let reservation = Reservation {
            id: ReservationId::new(Uuid::new_v4().to_string()),
            assignment: new.assignment,
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            guest_count: new.guest_count,
            status: new.status,
            customer: new.customer,
            created_at: Some(now),
        };
        book.reservations.push(reservation.clone());
        info!(
            restaurant = %restaurant,
            reservation = %reservation.id,
            assignment = %reservation.assignment,
            window = %window,
            "reservation created"
        );
        Ok(CreateOutcome::Created { reservation })
    }

    fn update_status(
        &self,
        restaurant: &RestaurantId,
        id: &ReservationId,
        status: ReservationStatus,
    ) -> Result<Reservation> {
        let mut book = self.write(restaurant)?;
        let reservation = book
            .reservations
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| BookingError::ReservationNotFound(id.clone()))?;
        if !reservation.status.can_transition_to(status) {
            return Err(BookingError::InvalidTransition {
                from: reservation.status,
                to: status,
            });
        }
        reservation.status = status;
        info!(restaurant = %restaurant, reservation = %id, %status, "status updated");
        Ok(reservation.clone())
    }

    fn apply_resolution(
        &self,
        restaurant: &RestaurantId,
        proposal: &ResolutionProposal,
    ) -> Result<StoreApplyOutcome> {
        let id = proposal
            .reservation_id
            .as_ref()
            .ok_or(BookingError::UnsavedReservation)?;
        if proposal.is_manual() {
            return Err(BookingError::ManualReviewRequired);
        }

        let mut book = self.write(restaurant)?;
        let pos = book
            .reservations
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| BookingError::ReservationNotFound(id.clone()))?;
        let current = &book.reservations[pos];
        if !current.status.is_active() {
            return Err(BookingError::InactiveReservation {
                id: id.clone(),
                status: current.status,
            });
        }
        if is_reflected(current, &proposal.action) {
            return Ok(StoreApplyOutcome::AlreadyResolved);
        }

        let mut updated = current.clone();
        apply_proposal(&mut updated, proposal)?;

        let index = TableIndex::build(&book.tables, &book.combined_tables)?;
        index.ensure_bookable(&updated.assignment)?;
        let moved = ProposedBooking::from_reservation(&updated)?;

        // Seats are re-checked only on a table move; a time shift keeps the
        // current seating, overrides included.
        if updated.assignment != current.assignment {
            if let Some(conflict) = check_capacity(&moved, &index) {
                warn!(
                    restaurant = %restaurant,
                    reservation = %id,
                    action = %proposal.action,
                    "resolution would overfill the table"
                );
                return Ok(StoreApplyOutcome::Superseded {
                    conflicts: vec![conflict],
                });
            }
        }
        if let Some(conflict) = find_double_booking(&moved, &detection(&book, &index)) {
            warn!(
                restaurant = %restaurant,
                reservation = %id,
                action = %proposal.action,
                "resolution superseded by newer reservations"
            );
            return Ok(StoreApplyOutcome::Superseded {
                conflicts: vec![conflict],
            });
        }

        book.reservations[pos] = updated.clone();
        info!(
            restaurant = %restaurant,
            reservation = %id,
            action = %proposal.action,
            "resolution applied"
        );
        Ok(StoreApplyOutcome::Applied {
            reservation: updated,
        })
    }
}
