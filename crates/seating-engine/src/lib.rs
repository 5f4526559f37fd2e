//! # seating-engine
//!
//! Deterministic table availability and reservation conflict resolution for
//! restaurants.
//!
//! The engine decides whether a proposed reservation (table, date, window,
//! party size) can be accepted, which existing reservations it collides with,
//! and how each collision could be resolved. It performs no I/O: every
//! function works on data handed to it, so checks can run speculatively for
//! previews and again inside the writer's transaction.
//!
//! ## Modules
//!
//! - [`window`] — half-open same-day time windows, overlap and buffer math
//! - [`rules`] — opening hours, special periods, notice, cut-offs, party size
//! - [`inventory`] — table / combined-table index with bidirectional coupling
//! - [`allocator`] — capacity-qualified candidate tables, tightest fit first
//! - [`conflict`] — double bookings, capacity violations, rush density
//! - [`resolver`] — ranked resolution proposals and auto-apply policy
//! - [`service`] — slot search and booking evaluation
//! - [`timeline`] — free gaps on a single table
//! - [`store`] — persistence seam and an in-memory store
//! - [`config`] — tunable engine settings
//! - [`error`] — error types

pub mod allocator;
pub mod config;
pub mod conflict;
pub mod error;
pub mod inventory;
pub mod model;
pub mod resolver;
pub mod rules;
pub mod service;
pub mod store;
pub mod timeline;
pub mod window;

pub use allocator::{find_candidate_tables, Candidate};
pub use config::EngineConfig;
pub use conflict::{
    detect_conflicts, Conflict, ConflictKind, DetectionContext, ProposedBooking, Severity,
};
pub use error::{BookingError, RuleViolation};
pub use inventory::TableIndex;
pub use model::*;
pub use resolver::{
    apply_proposal, propose_resolutions, ApplyOutcome, CustomerImpact, ResolutionAction,
    ResolutionPlan, ResolutionProposal,
};
pub use rules::AvailabilityRules;
pub use service::{
    AvailabilityService, AvailableSlot, BookingEvaluation, BookingOutcome, BookingRequest,
    RestaurantSnapshot,
};
pub use store::{BookingStore, CreateOutcome, InMemoryStore, NewReservation, StoreApplyOutcome};
pub use window::TimeWindow;
