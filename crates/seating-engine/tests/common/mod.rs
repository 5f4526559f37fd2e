//! Shared fixtures for the integration tests.
//!
//! The reference restaurant: tables 1 and 2 seat four in the main room and
//! can be joined into an eight-top, table 3 is a two-top, table 4 a six-top on
//! the terrace. Open every day 12:00–23:00. Sixteen seats in total.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use seating_engine::{
    BookingPolicy, CombinedTable, CombinedTableId, CustomerInfo, EngineConfig, OpeningHours,
    Reservation, ReservationId, ReservationStatus, RestaurantId, RestaurantSnapshot, RoomId,
    Table, TableAssignment, TableId, TableIndex,
};

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Wednesday.
pub fn service_day() -> NaiveDate {
    d(2026, 3, 18)
}

/// A week before service, 10:00 restaurant time.
pub fn now_local() -> NaiveDateTime {
    d(2026, 3, 11).and_time(t(10, 0))
}

pub fn now_utc() -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&now_local())
}

pub fn table(id: &str, number: u32, capacity: u32, room: &str) -> Table {
    Table {
        id: TableId::from(id),
        number,
        capacity,
        room_id: Some(RoomId::from(room)),
        is_active: true,
    }
}

pub fn tables() -> Vec<Table> {
    vec![
        table("t1", 1, 4, "main"),
        table("t2", 2, 4, "main"),
        table("t3", 3, 2, "main"),
        table("t4", 4, 6, "terrace"),
    ]
}

pub fn combined() -> Vec<CombinedTable> {
    vec![CombinedTable {
        id: CombinedTableId::from("c12"),
        name: "Tables 1+2".to_string(),
        member_table_ids: [TableId::from("t1"), TableId::from("t2")].into_iter().collect(),
        total_capacity: 8,
    }]
}

pub fn index() -> TableIndex {
    TableIndex::build(&tables(), &combined()).unwrap()
}

pub fn at(id: &str) -> TableAssignment {
    TableAssignment::Table(TableId::from(id))
}

pub fn at_combined(id: &str) -> TableAssignment {
    TableAssignment::Combined(CombinedTableId::from(id))
}

pub fn all_week(open: NaiveTime, close: NaiveTime) -> Vec<OpeningHours> {
    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
    .into_iter()
    .map(|day| OpeningHours {
        day_of_week: day,
        is_open: true,
        open_time: open,
        close_time: close,
    })
    .collect()
}

pub fn policy() -> BookingPolicy {
    BookingPolicy {
        min_guests: 1,
        max_guests: 12,
        default_duration_minutes: 120,
        turnaround_minutes: 0,
        min_advance_notice_hours: 1,
        max_advance_booking_days: 60,
        cut_off_hours_by_day_of_week: [None; 7],
        allow_same_day_bookings: true,
    }
}

pub fn reservation(
    id: &str,
    assignment: TableAssignment,
    start: NaiveTime,
    end: NaiveTime,
    guests: u32,
    status: ReservationStatus,
) -> Reservation {
    Reservation {
        id: ReservationId::from(id),
        assignment,
        date: service_day(),
        start_time: start,
        end_time: end,
        guest_count: guests,
        status,
        customer: CustomerInfo {
            name: format!("Guest {id}"),
            ..CustomerInfo::default()
        },
        created_at: None,
    }
}

pub fn confirmed(id: &str, table_id: &str, start: NaiveTime, end: NaiveTime, guests: u32) -> Reservation {
    reservation(id, at(table_id), start, end, guests, ReservationStatus::Confirmed)
}

pub fn snapshot(reservations: Vec<Reservation>) -> RestaurantSnapshot {
    RestaurantSnapshot {
        restaurant_id: RestaurantId::from("bistro"),
        timezone: "UTC".to_string(),
        policy: policy(),
        opening_hours: all_week(t(12, 0), t(23, 0)),
        special_periods: Vec::new(),
        tables: tables(),
        combined_tables: combined(),
        reservations,
        config: EngineConfig::default(),
    }
}
