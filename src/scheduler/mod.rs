//! Greedy packing engine and schedule statistics.
//!
//! # Algorithm
//!
//! [`ScheduleEngine`] packs students into time blocks with a
//! deterministic, greedy, first-fit-by-remaining-minutes heuristic,
//! grouping similar skill levels together. It is not optimal, but its
//! output is stable across reruns and append-only when students are
//! added late.
//!
//! # Statistics
//!
//! [`CompetitionStats`] derives block utilization, per-day counts, and
//! result tallies from a scheduled state.

mod engine;
mod stats;

pub use engine::{PlacementFailure, PlacementFailureReason, PlacementReport, ScheduleEngine};
pub use stats::{BlockLoad, CompetitionStats};
