//! Free gaps on a single table's timeline.
//!
//! Collects the padded windows of every reservation blocking an assignment,
//! merges overlapping busy periods, then reports the gaps between them inside
//! the day's opening hours.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::inventory::TableIndex;
use crate::model::{Reservation, TableAssignment};
use crate::window::TimeWindow;

/// A free gap at one assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: i64,
}

/// Busy periods for `assignment` clipped to `bounds`, sorted and merged.
///
/// Each reservation is padded by `turnaround_minutes` on both sides, so the
/// gaps left over can take a new booking padded the same way only when they
/// are at least `duration + turnaround` long.
fn merge_busy_periods(
    index: &TableIndex,
    assignment: &TableAssignment,
    reservations: &[Reservation],
    bounds: &TimeWindow,
    turnaround_minutes: u32,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let blocking = index.blocking_assignments(assignment);

    let mut intervals: Vec<(NaiveDateTime, NaiveDateTime)> = reservations
        .iter()
        .filter(|r| r.occupies_time() && blocking.contains(&r.assignment))
        .filter_map(|r| r.window().ok())
        .map(|w| w.with_buffer(turnaround_minutes))
        .filter(|w| w.overlaps(bounds))
        .map(|w| (w.start.max(bounds.start), w.end.min(bounds.end)))
        .collect();

    intervals.sort_by_key(|&(start, end)| (start, end));

    let mut merged: Vec<(NaiveDateTime, NaiveDateTime)> = Vec::new();
    for (start, end) in intervals {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

/// Gaps at `assignment` within `bounds`, sorted by start.
pub fn find_free_windows(
    index: &TableIndex,
    assignment: &TableAssignment,
    reservations: &[Reservation],
    bounds: &TimeWindow,
    turnaround_minutes: u32,
) -> Vec<FreeWindow> {
    let merged = merge_busy_periods(index, assignment, reservations, bounds, turnaround_minutes);

    let mut free = Vec::new();
    let mut cursor = bounds.start;
    for (busy_start, busy_end) in &merged {
        if cursor < *busy_start {
            free.push(FreeWindow {
                start: cursor,
                end: *busy_start,
                duration_minutes: (*busy_start - cursor).num_minutes(),
            });
        }
        cursor = cursor.max(*busy_end);
    }
    if cursor < bounds.end {
        free.push(FreeWindow {
            start: cursor,
            end: bounds.end,
            duration_minutes: (bounds.end - cursor).num_minutes(),
        });
    }
    free
}

/// First gap of at least `min_duration_minutes`.
pub fn find_first_free_window(
    index: &TableIndex,
    assignment: &TableAssignment,
    reservations: &[Reservation],
    bounds: &TimeWindow,
    turnaround_minutes: u32,
    min_duration_minutes: i64,
) -> Option<FreeWindow> {
    find_free_windows(index, assignment, reservations, bounds, turnaround_minutes)
        .into_iter()
        .find(|w| w.duration_minutes >= min_duration_minutes)
}
