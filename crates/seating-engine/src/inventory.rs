//! Table inventory index.
//!
//! Combined tables couple their members: booking a combined table reserves
//! every member, and booking a member blocks every combined table that
//! contains it. The index keeps that coupling explicit in both directions
//! (`table → owning combined tables`, `combined table → members`).

use std::collections::{BTreeSet, HashMap};

use crate::error::{BookingError, Result};
use crate::model::{CombinedTable, CombinedTableId, RoomId, Table, TableAssignment, TableId};

#[derive(Debug, Clone, Default)]
pub struct TableIndex {
    tables: HashMap<TableId, Table>,
    combined: HashMap<CombinedTableId, CombinedTable>,
    owners: HashMap<TableId, BTreeSet<CombinedTableId>>,
}

impl TableIndex {
    /// Index the restaurant's tables and combined tables.
    ///
    /// # Errors
    /// Returns `BookingError::InvalidCombinedTable` if a combined table names
    /// an unknown member, has fewer than two members, or its `total_capacity`
    /// differs from the sum of its members (or that sum overflows).
    pub fn build(tables: &[Table], combined: &[CombinedTable]) -> Result<Self> {
        let tables: HashMap<TableId, Table> =
            tables.iter().map(|t| (t.id.clone(), t.clone())).collect();

        let mut owners: HashMap<TableId, BTreeSet<CombinedTableId>> = HashMap::new();
        let mut combined_map = HashMap::new();

        for group in combined {
            if group.member_table_ids.len() < 2 {
                return Err(BookingError::InvalidCombinedTable {
                    id: group.id.to_string(),
                    reason: "needs at least two member tables".to_string(),
                });
            }
            let mut sum = 0u32;
            for member in &group.member_table_ids {
                let table = tables.get(member).ok_or_else(|| BookingError::InvalidCombinedTable {
                    id: group.id.to_string(),
                    reason: format!("unknown member table {member}"),
                })?;
                sum = sum.checked_add(table.capacity).ok_or_else(|| {
                    BookingError::InvalidCombinedTable {
                        id: group.id.to_string(),
                        reason: "member capacities overflow".to_string(),
                    }
                })?;
                owners
                    .entry(member.clone())
                    .or_default()
                    .insert(group.id.clone());
            }
            if sum != group.total_capacity {
                return Err(BookingError::InvalidCombinedTable {
                    id: group.id.to_string(),
                    reason: format!(
                        "total capacity {} does not match member sum {}",
                        group.total_capacity, sum
                    ),
                });
            }
            combined_map.insert(group.id.clone(), group.clone());
        }

        Ok(Self {
            tables,
            combined: combined_map,
            owners,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn combined_tables(&self) -> impl Iterator<Item = &CombinedTable> {
        self.combined.values()
    }

    pub fn table(&self, id: &TableId) -> Option<&Table> {
        self.tables.get(id)
    }

    pub fn combined(&self, id: &CombinedTableId) -> Option<&CombinedTable> {
        self.combined.get(id)
    }

    pub fn contains(&self, assignment: &TableAssignment) -> bool {
        match assignment {
            TableAssignment::Table(id) => self.tables.contains_key(id),
            TableAssignment::Combined(id) => self.combined.contains_key(id),
        }
    }

    pub fn capacity_of(&self, assignment: &TableAssignment) -> Option<u32> {
        match assignment {
            TableAssignment::Table(id) => self.tables.get(id).map(|t| t.capacity),
            TableAssignment::Combined(id) => self.combined.get(id).map(|c| c.total_capacity),
        }
    }

    /// A combined table is active only while all of its members are.
    pub fn is_active(&self, assignment: &TableAssignment) -> bool {
        match assignment {
            TableAssignment::Table(id) => self.tables.get(id).is_some_and(|t| t.is_active),
            TableAssignment::Combined(id) => self.combined.get(id).is_some_and(|c| {
                c.member_table_ids
                    .iter()
                    .all(|m| self.tables.get(m).is_some_and(|t| t.is_active))
            }),
        }
    }

    /// Fails unless `assignment` exists and is in service.
    pub fn ensure_bookable(&self, assignment: &TableAssignment) -> Result<()> {
        if !self.contains(assignment) {
            return Err(BookingError::UnknownAssignment(assignment.clone()));
        }
        if !self.is_active(assignment) {
            return Err(BookingError::InactiveAssignment(assignment.clone()));
        }
        Ok(())
    }

    /// Table number used for deterministic ordering. Combined tables take
    /// their lowest member number.
    pub fn number_of(&self, assignment: &TableAssignment) -> u32 {
        match assignment {
            TableAssignment::Table(id) => self.tables.get(id).map_or(u32::MAX, |t| t.number),
            TableAssignment::Combined(id) => self
                .combined
                .get(id)
                .and_then(|c| {
                    c.member_table_ids
                        .iter()
                        .filter_map(|m| self.tables.get(m).map(|t| t.number))
                        .min()
                })
                .unwrap_or(u32::MAX),
        }
    }

    /// Room of a table, or of a combined table when all members share one.
    pub fn room_of(&self, assignment: &TableAssignment) -> Option<RoomId> {
        match assignment {
            TableAssignment::Table(id) => self.tables.get(id).and_then(|t| t.room_id.clone()),
            TableAssignment::Combined(id) => {
                let group = self.combined.get(id)?;
                let mut rooms = group
                    .member_table_ids
                    .iter()
                    .map(|m| self.tables.get(m).and_then(|t| t.room_id.clone()));
                let first = rooms.next()??;
                rooms
                    .all(|r| r.as_ref() == Some(&first))
                    .then_some(first)
            }
        }
    }

    /// Every assignment whose booking would block `assignment`: itself, the
    /// combined tables owning it (for a table), and for a combined table its
    /// members plus every combined table sharing a member.
    pub fn blocking_assignments(&self, assignment: &TableAssignment) -> BTreeSet<TableAssignment> {
        let mut blocking = BTreeSet::new();
        blocking.insert(assignment.clone());
        match assignment {
            TableAssignment::Table(id) => {
                if let Some(groups) = self.owners.get(id) {
                    blocking.extend(groups.iter().cloned().map(TableAssignment::Combined));
                }
            }
            TableAssignment::Combined(id) => {
                if let Some(group) = self.combined.get(id) {
                    for member in &group.member_table_ids {
                        blocking.insert(TableAssignment::Table(member.clone()));
                        if let Some(groups) = self.owners.get(member) {
                            blocking.extend(groups.iter().cloned().map(TableAssignment::Combined));
                        }
                    }
                }
            }
        }
        blocking
    }

    /// Seats across all active physical tables.
    pub fn total_seating_capacity(&self) -> u32 {
        self.tables
            .values()
            .filter(|t| t.is_active)
            .fold(0u32, |acc, t| acc.saturating_add(t.capacity))
    }

    pub fn largest_single_capacity(&self) -> u32 {
        self.tables
            .values()
            .filter(|t| t.is_active)
            .map(|t| t.capacity)
            .max()
            .unwrap_or(0)
    }
}
