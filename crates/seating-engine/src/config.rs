//! Tunable engine settings.
//!
//! Restaurant policy lives in [`BookingPolicy`](crate::model::BookingPolicy);
//! these knobs control how the allocator, detector and resolver behave and are
//! shared across restaurants.

use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seats a candidate table must have beyond the party size.
    pub empty_seats_buffer: u32,
    /// Share of total seating that, when concurrently booked, raises a rush warning.
    pub rush_threshold_ratio: f64,
    /// Minimum top-proposal confidence for automatic application.
    pub auto_resolve_threshold: f64,
    /// Automated proposals below this confidence are discarded.
    pub min_confidence: f64,
    /// Time-shift search radius, applied in both directions.
    pub shift_offsets_minutes: Vec<u32>,
    /// Step between offered start times.
    pub slot_interval_minutes: u32,
    /// Capacity difference under which an alternate table counts as comparable.
    pub comparable_capacity_delta: u32,
    /// Cap on proposals per strategy.
    pub max_alternatives: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            empty_seats_buffer: 0,
            rush_threshold_ratio: 0.8,
            auto_resolve_threshold: 0.85,
            min_confidence: 0.5,
            shift_offsets_minutes: vec![15, 30, 60],
            slot_interval_minutes: 15,
            comparable_capacity_delta: 2,
            max_alternatives: 3,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("rush_threshold_ratio", self.rush_threshold_ratio),
            ("auto_resolve_threshold", self.auto_resolve_threshold),
            ("min_confidence", self.min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BookingError::InvalidConfig(format!(
                    "{name} must be within 0..=1, got {value}"
                )));
            }
        }
        if self.slot_interval_minutes == 0 {
            return Err(BookingError::InvalidConfig(
                "slot_interval_minutes must be positive".to_string(),
            ));
        }
        if self.shift_offsets_minutes.contains(&0) {
            return Err(BookingError::InvalidConfig(
                "shift_offsets_minutes must not contain 0".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn max_shift_minutes(&self) -> u32 {
        self.shift_offsets_minutes.iter().copied().max().unwrap_or(0)
    }
}
