//! Booking legality independent of table occupancy.
//!
//! Answers "could anything be booked at this date and time at all": opening
//! hours with special-period overrides, the advance-booking window, same-day
//! cut-offs and party-size limits. All inputs are passed in explicitly; the
//! rules never read ambient configuration.

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{BookingError, Result, RuleViolation};
use crate::model::{BookingPolicy, OpeningHours, SpecialPeriod};
use crate::window::TimeWindow;

/// Add `duration_minutes` to `start` without leaving the day.
///
/// # Errors
/// Returns `BookingError::InvalidTimeRange` for a zero duration or when the
/// end would fall on or past midnight.
pub fn compute_end_time(start: NaiveTime, duration_minutes: u32) -> Result<NaiveTime> {
    if duration_minutes == 0 {
        return Err(BookingError::InvalidTimeRange(
            "duration must be positive".to_string(),
        ));
    }
    let minutes_into_day = i64::from(start.num_seconds_from_midnight() / 60);
    if minutes_into_day + i64::from(duration_minutes) >= 24 * 60 {
        return Err(BookingError::InvalidTimeRange(format!(
            "{start} + {duration_minutes} minutes crosses midnight"
        )));
    }
    Ok(start + Duration::minutes(i64::from(duration_minutes)))
}

/// Policy view for one restaurant.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityRules<'a> {
    policy: &'a BookingPolicy,
    opening_hours: &'a [OpeningHours],
    special_periods: &'a [SpecialPeriod],
}

impl<'a> AvailabilityRules<'a> {
    pub fn new(
        policy: &'a BookingPolicy,
        opening_hours: &'a [OpeningHours],
        special_periods: &'a [SpecialPeriod],
    ) -> Self {
        Self {
            policy,
            opening_hours,
            special_periods,
        }
    }

    pub fn policy(&self) -> &'a BookingPolicy {
        self.policy
    }

    /// The special period governing `date`, if any.
    ///
    /// When several periods contain the date, the most recently created one
    /// wins. A period without a creation time loses to any dated one, and
    /// equal creation times fall back to list order with later entries winning.
    pub fn special_period_for(&self, date: NaiveDate) -> Option<&'a SpecialPeriod> {
        self.special_periods
            .iter()
            .enumerate()
            .filter(|(_, p)| p.contains(date))
            .max_by_key(|(idx, p)| (p.created_at, *idx))
            .map(|(_, p)| p)
    }

    /// Opening and closing time for `date`, or `None` when closed all day.
    pub fn opening_span(&self, date: NaiveDate) -> Option<(NaiveTime, NaiveTime)> {
        if let Some(period) = self.special_period_for(date) {
            if period.is_closed {
                return None;
            }
            if let (Some(open), Some(close)) = (period.open_time, period.close_time) {
                return (open < close).then_some((open, close));
            }
        }

        let day = date.weekday();
        self.opening_hours
            .iter()
            .rev()
            .find(|h| h.day_of_week == day)
            .filter(|h| h.is_open && h.open_time < h.close_time)
            .map(|h| (h.open_time, h.close_time))
    }

    pub fn is_restaurant_open(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.opening_span(date)
            .is_some_and(|(open, close)| open <= time && time < close)
    }

    /// Whether the entire window lies inside the day's opening hours.
    pub fn fits_opening_hours(&self, window: &TimeWindow) -> bool {
        self.opening_span(window.date()).is_some_and(|(open, close)| {
            open <= window.start_time() && window.end_time() <= close
        })
    }

    /// Date-level checks: too far ahead, same-day disabled, already past.
    pub fn check_booking_date(
        &self,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> std::result::Result<(), RuleViolation> {
        let today = now.date();
        let max_days = self.policy.max_advance_booking_days;
        let horizon = today
            .checked_add_days(Days::new(u64::from(max_days)))
            .unwrap_or(NaiveDate::MAX);
        if date > horizon {
            return Err(RuleViolation::TooFarInAdvance { date, max_days });
        }
        if date == today && !self.policy.allow_same_day_bookings {
            return Err(RuleViolation::SameDayDisabled);
        }
        if date < today {
            return Err(RuleViolation::InsufficientNotice {
                required_hours: self.policy.min_advance_notice_hours,
            });
        }
        Ok(())
    }

    /// Whether `(date, time)` may be booked at `now` (restaurant-local).
    pub fn is_within_booking_window(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        now: NaiveDateTime,
    ) -> std::result::Result<(), RuleViolation> {
        self.check_booking_date(date, now)?;

        let requested = date.and_time(time);
        let required_hours = self.policy.min_advance_notice_hours;
        if requested - now < Duration::hours(i64::from(required_hours)) {
            return Err(RuleViolation::InsufficientNotice { required_hours });
        }

        if date == now.date() {
            if let Some(cut_off_hours) = self.policy.cut_off_hours(date.weekday()) {
                if now > requested - Duration::hours(i64::from(cut_off_hours)) {
                    return Err(RuleViolation::PastCutOff { cut_off_hours });
                }
            }
        }

        Ok(())
    }

    pub fn is_guest_count_valid(&self, count: u32) -> bool {
        count >= 1 && self.policy.min_guests <= count && count <= self.policy.max_guests
    }

    pub fn validate_guest_count(&self, count: u32) -> Result<()> {
        if self.is_guest_count_valid(count) {
            Ok(())
        } else {
            Err(BookingError::InvalidGuestCount {
                count,
                min: self.policy.min_guests,
                max: self.policy.max_guests,
            })
        }
    }

    pub fn compute_end_time(&self, start: NaiveTime, duration_minutes: u32) -> Result<NaiveTime> {
        compute_end_time(start, duration_minutes)
    }

    /// Window of the policy's default duration starting at `start`.
    pub fn default_window(&self, date: NaiveDate, start: NaiveTime) -> Result<TimeWindow> {
        TimeWindow::starting_at(date, start, self.policy.default_duration_minutes)
    }
}
