//! Error types for seating-engine operations.
//!
//! Conflicts are not errors: they are returned as values from the detector and
//! resolver. Everything here is a fail-fast rejection of the request itself.

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{ReservationId, ReservationStatus, TableAssignment};

/// A booking-policy violation raised by the availability rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("Restaurant is closed on {date} at the requested time")]
    RestaurantClosed { date: NaiveDate },

    #[error("Date {date} is more than {max_days} days in advance")]
    TooFarInAdvance { date: NaiveDate, max_days: u32 },

    #[error("At least {required_hours} hours of notice are required")]
    InsufficientNotice { required_hours: u32 },

    #[error("Same-day online booking closes {cut_off_hours} hours before the slot")]
    PastCutOff { cut_off_hours: u32 },

    #[error("Same-day bookings are disabled")]
    SameDayDisabled,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Invalid guest count {count}: allowed range is {min}..={max}")]
    InvalidGuestCount { count: u32, min: u32, max: u32 },

    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error("No table can seat {guests} guests")]
    NoSuitableTable { guests: u32 },

    #[error("Unknown table assignment: {0}")]
    UnknownAssignment(TableAssignment),

    #[error("Table assignment {0} is out of service")]
    InactiveAssignment(TableAssignment),

    #[error("Combined table {id} is inconsistent: {reason}")]
    InvalidCombinedTable { id: String, reason: String },

    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    #[error("Reservation {id} is {status} and can no longer change")]
    InactiveReservation {
        id: ReservationId,
        status: ReservationStatus,
    },

    #[error("Restaurant not found: {0}")]
    RestaurantNotFound(String),

    #[error("Cannot move reservation from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("Resolution requires manual staff review")]
    ManualReviewRequired,

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Proposal does not reference a stored reservation")]
    UnsavedReservation,
}

pub type Result<T> = std::result::Result<T, BookingError>;
