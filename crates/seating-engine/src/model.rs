//! Restaurant inventory, policy, and reservation records.
//!
//! These are the in-process data contracts exchanged with the persistence
//! layer. None of them carry behaviour beyond small accessors; the rules,
//! allocator, detector and resolver operate on them as plain values.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::window::TimeWindow;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(RestaurantId);
string_id!(TableId);
string_id!(CombinedTableId);
string_id!(ReservationId);
string_id!(
    /// Dining room or floor area a table belongs to.
    RoomId
);

/// A physical table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub number: u32,
    pub capacity: u32,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Two or more physical tables joined and booked as one unit.
///
/// `total_capacity` must equal the sum of member capacities; this is checked
/// when the [`TableIndex`](crate::inventory::TableIndex) is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedTable {
    pub id: CombinedTableId,
    pub name: String,
    pub member_table_ids: BTreeSet<TableId>,
    pub total_capacity: u32,
}

/// What a reservation occupies: a single table or a combined table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TableAssignment {
    Table(TableId),
    Combined(CombinedTableId),
}

impl fmt::Display for TableAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableAssignment::Table(id) => write!(f, "table:{id}"),
            TableAssignment::Combined(id) => write!(f, "combined:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl ReservationStatus {
    /// Only pending and confirmed reservations hold a table.
    pub fn is_active(self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Allowed lifecycle moves:
    /// `pending → confirmed`, any active state `→ cancelled`,
    /// `confirmed → completed`, `confirmed → no_show`.
    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, NoShow)
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
            ReservationStatus::NoShow => "no_show",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub assignment: TableAssignment,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub guest_count: u32,
    pub status: ReservationStatus,
    #[serde(default)]
    pub customer: CustomerInfo,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl Reservation {
    pub fn window(&self) -> Result<TimeWindow> {
        TimeWindow::on(self.date, self.start_time, self.end_time)
    }

    /// Whether this reservation blocks its table for its window.
    pub fn occupies_time(&self) -> bool {
        self.status.is_active()
    }
}

/// Weekly opening hours for one day of the week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    pub day_of_week: Weekday,
    pub is_open: bool,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}

/// Date-range override of the weekly hours (holidays, private events, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialPeriod {
    #[serde(default)]
    pub name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub open_time: Option<NaiveTime>,
    #[serde(default)]
    pub close_time: Option<NaiveTime>,
    /// Used to pick a winner when periods overlap: the newest one applies.
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl SpecialPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Per-restaurant booking policy. Read-only input to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingPolicy {
    pub min_guests: u32,
    pub max_guests: u32,
    pub default_duration_minutes: u32,
    pub turnaround_minutes: u32,
    pub min_advance_notice_hours: u32,
    pub max_advance_booking_days: u32,
    /// Indexed Monday-first. `None` or `Some(0)` means no same-day cut-off.
    pub cut_off_hours_by_day_of_week: [Option<u32>; 7],
    pub allow_same_day_bookings: bool,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            min_guests: 1,
            max_guests: 12,
            default_duration_minutes: 120,
            turnaround_minutes: 0,
            min_advance_notice_hours: 0,
            max_advance_booking_days: 90,
            cut_off_hours_by_day_of_week: [None; 7],
            allow_same_day_bookings: true,
        }
    }
}

impl BookingPolicy {
    pub fn cut_off_hours(&self, day: Weekday) -> Option<u32> {
        self.cut_off_hours_by_day_of_week[day.num_days_from_monday() as usize]
            .filter(|&hours| hours > 0)
    }
}

fn default_true() -> bool {
    true
}
