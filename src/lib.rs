//! Scheduling and results engine for multi-day music festival competitions.
//!
//! Students register under a teacher, perform in judged time blocks, and
//! collect results over the festival weekend. This crate is the
//! operational core: it packs registered students into time blocks,
//! applies score updates as they arrive, derives trophy lists, and
//! persists the whole competition as one atomic snapshot.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Student`, `TimeBlock`, `Placement`,
//!   `CompetitionState`, and the closed enumerations for sections, days,
//!   skill levels, and results
//! - **`validation`**: Batch integrity checks over students and the
//!   block catalog
//! - **`scheduler`**: The greedy packing engine and schedule statistics
//! - **`results`**: Score updates and the derived trophy list
//! - **`store`**: Versioned, checksummed snapshot persistence with
//!   single-writer locking
//!
//! # Flow
//!
//! The engine runs once per competition to build the initial assignment;
//! afterwards every external call is one load-mutate-save cycle against
//! the snapshot store. After results are final, a second pass schedules
//! the command performance session for qualifying students.
//!
//! ```
//! use festival_schedule::models::{
//!     CompetitionState, DayPreference, SectionType, SkillLevel, Student, StudentId,
//! };
//! use festival_schedule::scheduler::ScheduleEngine;
//!
//! let mut state = CompetitionState::new("Spring Festival");
//! state
//!     .add_student(
//!         Student::new(
//!             StudentId::derive("Ada", "Lovelace", "2025-01-03T10:00:00Z"),
//!             "Ada",
//!             "Lovelace",
//!             SectionType::Traditional,
//!             DayPreference::Saturday,
//!             SkillLevel::new(5).unwrap(),
//!             15,
//!         )
//!         .with_song("Sonatina in C", "Clementi")
//!         .with_song("The Wild Horseman", "Schumann"),
//!     )
//!     .unwrap();
//!
//! let report = ScheduleEngine::new().schedule(&mut state);
//! // No blocks cataloged yet, so the student is reported, not dropped.
//! assert_eq!(report.failure_count(), 1);
//! ```

pub mod models;
pub mod results;
pub mod scheduler;
pub mod store;
pub mod validation;
