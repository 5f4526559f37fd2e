//! Half-open time windows on a single service day.
//!
//! A reservation always starts and ends on the same calendar date. Buffered
//! windows produced by [`TimeWindow::with_buffer`] may spill across midnight;
//! they are only ever used for overlap comparisons.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// `[start, end)` in restaurant-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Build a window on `date` from `start` to `end`.
    ///
    /// # Errors
    /// Returns `BookingError::InvalidTimeRange` if `end <= start`, which covers
    /// zero-length windows and windows that would cross midnight.
    pub fn on(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if end <= start {
            return Err(BookingError::InvalidTimeRange(format!(
                "{date}: end {end} must be after start {start}"
            )));
        }
        Ok(Self {
            start: date.and_time(start),
            end: date.and_time(end),
        })
    }

    /// Build a window of `duration_minutes` starting at `start` on `date`.
    pub fn starting_at(date: NaiveDate, start: NaiveTime, duration_minutes: u32) -> Result<Self> {
        let end = crate::rules::compute_end_time(start, duration_minutes)?;
        Self::on(date, start, end)
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start.time()
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end.time()
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Two windows overlap iff `a.start < b.end && b.start < a.end`.
    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Minutes shared by both windows, zero when they do not overlap.
    pub fn overlap_minutes(&self, other: &TimeWindow) -> i64 {
        if !self.overlaps(other) {
            return 0;
        }
        (self.end.min(other.end) - self.start.max(other.start)).num_minutes()
    }

    pub fn contains_instant(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }

    /// Expand both ends by `minutes`.
    pub fn with_buffer(&self, minutes: u32) -> TimeWindow {
        let pad = Duration::minutes(i64::from(minutes));
        TimeWindow {
            start: self.start - pad,
            end: self.end + pad,
        }
    }

    /// Move the whole window by `minutes` (negative moves earlier).
    ///
    /// # Errors
    /// Returns `BookingError::InvalidTimeRange` if the shifted window leaves the
    /// original service day.
    pub fn shifted(&self, minutes: i64) -> Result<TimeWindow> {
        let delta = Duration::minutes(minutes);
        let start = self.start + delta;
        let end = self.end + delta;
        if start.date() != self.date() || end.date() != self.date() {
            return Err(BookingError::InvalidTimeRange(format!(
                "shifting {minutes} minutes leaves {}",
                self.date()
            )));
        }
        Ok(TimeWindow { start, end })
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.date(),
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}
