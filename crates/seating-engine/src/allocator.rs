//! Capacity-based candidate selection.
//!
//! Only capacity and activity are considered here; occupancy is the
//! detector's job. An empty result means no table could ever seat the party.

use serde::{Deserialize, Serialize};

use crate::inventory::TableIndex;
use crate::model::{RoomId, TableAssignment};

/// A table or combined table able to seat the party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub assignment: TableAssignment,
    pub capacity: u32,
    pub number: u32,
    pub room_id: Option<RoomId>,
}

/// Candidates with `capacity >= guest_count + empty_seats_buffer`, tightest
/// fit first, then by table number. On equal capacity and number a single
/// table sorts before a combined table.
pub fn find_candidate_tables(
    index: &TableIndex,
    guest_count: u32,
    empty_seats_buffer: u32,
) -> Vec<Candidate> {
    let required = guest_count.saturating_add(empty_seats_buffer);

    let singles = index
        .tables()
        .filter(|t| t.is_active && t.capacity >= required)
        .map(|t| TableAssignment::Table(t.id.clone()));
    let combined = index
        .combined_tables()
        .filter(|c| c.total_capacity >= required)
        .map(|c| TableAssignment::Combined(c.id.clone()))
        .filter(|a| index.is_active(a));

    let mut candidates: Vec<Candidate> = singles
        .chain(combined)
        .filter_map(|assignment| {
            let capacity = index.capacity_of(&assignment)?;
            Some(Candidate {
                number: index.number_of(&assignment),
                room_id: index.room_of(&assignment),
                capacity,
                assignment,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.capacity
            .cmp(&b.capacity)
            .then(a.number.cmp(&b.number))
            .then(a.assignment.cmp(&b.assignment))
    });
    candidates
}
