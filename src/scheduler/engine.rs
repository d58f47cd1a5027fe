//! Greedy time-block packing engine.
//!
//! # Algorithm
//!
//! 1. Partition unplaced students by requested day; `Command`-preference
//!    students are deferred to the command pass.
//! 2. Within a day, group by section and order by skill level, then by
//!    (last name, first name, id) so the pack order is fully
//!    deterministic.
//! 3. Pack each student into the first catalog-order block of matching
//!    day/section whose skill range contains the student and whose
//!    remaining minutes (and student-count headroom) fit.
//! 4. A later block replaces the current choice only when its remaining
//!    minutes are exactly equal and its roster's average skill level is
//!    strictly closer to the student's; an empty block counts as
//!    distance zero (a fresh cohort is perfectly tight).
//! 5. Students who fit nowhere are reported, never silently dropped.
//!
//! Re-running is append-only: placed students are never touched, and
//! their load stays visible to the packer through derived block load.
//!
//! # Complexity
//! O(n * b * n) worst case, since block load is derived per candidate
//! block. Competition sizes (hundreds of students, dozens of blocks)
//! keep this well below any practical budget.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::models::{
    CommandWindow, CompetitionState, DayPreference, FestivalDay, Placement, SectionType,
    SkillLevel, StudentId,
};

/// Why a student could not be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum PlacementFailureReason {
    /// No cataloged block hosts this day, section, and level at all.
    #[error("no block hosts this section and skill level on the requested day")]
    NoCompatibleBlock,
    /// Compatible blocks exist, but none has room left.
    #[error("needs {required_minutes} min; best compatible block has {best_remaining} min left")]
    InsufficientCapacity {
        required_minutes: u32,
        best_remaining: u32,
    },
}

/// A student the engine could not place, with enough context for an
/// operator to act on without consulting logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementFailure {
    pub student_id: StudentId,
    pub student_name: String,
    pub reason: PlacementFailureReason,
}

/// Outcome of one scheduling pass: who was placed, who was not and why.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementReport {
    /// Students placed by this pass, in pack order.
    pub placed: Vec<StudentId>,
    /// Students this pass could not place.
    pub failures: Vec<PlacementFailure>,
}

impl PlacementReport {
    /// Whether every considered student was placed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// Greedy packing engine for the main schedule and the command session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleEngine;

impl ScheduleEngine {
    /// Creates an engine.
    pub fn new() -> Self {
        Self
    }

    /// Builds the main schedule.
    ///
    /// Places every unplaced Saturday/Sunday student or records a
    /// [`PlacementFailure`]; already-placed students are never reshuffled.
    pub fn schedule(&self, state: &mut CompetitionState) -> PlacementReport {
        let order = main_pack_order(state);
        info!(
            "scheduling {} unplaced students for '{}'",
            order.len(),
            state.name()
        );

        let mut report = PlacementReport::default();
        for id in order {
            let Some(s) = state.student(&id) else { continue };
            let name = s.display_name();
            let section = s.section();
            let level = s.skill_level();
            let minutes = s.play_time_minutes();
            let day = match s.day_preference() {
                DayPreference::Saturday => FestivalDay::Saturday,
                DayPreference::Sunday => FestivalDay::Sunday,
                DayPreference::Command => continue,
            };

            match choose_block(state, day, Some(section), level, minutes, None) {
                Ok(placement) => {
                    debug!("placing {name} into block {}", placement.block_id);
                    if let Some(s) = state.student_mut(&id) {
                        if s.assign(placement).is_ok() {
                            report.placed.push(id);
                        }
                    }
                }
                Err(reason) => {
                    warn!("could not place {name}: {reason}");
                    report.failures.push(PlacementFailure {
                        student_id: id,
                        student_name: name,
                        reason,
                    });
                }
            }
        }
        report
    }

    /// Schedules the post-results command performance session.
    ///
    /// Considers students who registered with a `Command` day preference
    /// and students whose judged result qualifies (SD or S). Students
    /// with a preferred window are tried against matching-window blocks
    /// first, then against any command block. The command session mixes
    /// sections, so only the skill range and capacity bind.
    pub fn schedule_command(&self, state: &mut CompetitionState) -> PlacementReport {
        let order = command_pack_order(state);
        info!(
            "scheduling {} students into the command session for '{}'",
            order.len(),
            state.name()
        );

        let mut report = PlacementReport::default();
        for id in order {
            let Some(s) = state.student(&id) else { continue };
            let name = s.display_name();
            let level = s.skill_level();
            let minutes = s.play_time_minutes();
            let window = s.preferred_command_time();

            let choice = match window {
                Some(w) => {
                    choose_block(state, FestivalDay::Command, None, level, minutes, Some(w))
                        .or_else(|_| {
                            choose_block(state, FestivalDay::Command, None, level, minutes, None)
                        })
                }
                None => choose_block(state, FestivalDay::Command, None, level, minutes, None),
            };

            match choice {
                Ok(placement) => {
                    debug!("placing {name} into command block {}", placement.block_id);
                    if let Some(s) = state.student_mut(&id) {
                        if s.assign_command(placement).is_ok() {
                            report.placed.push(id);
                        }
                    }
                }
                Err(reason) => {
                    warn!("could not place {name} in the command session: {reason}");
                    report.failures.push(PlacementFailure {
                        student_id: id,
                        student_name: name,
                        reason,
                    });
                }
            }
        }
        report
    }
}

/// Deterministic pack order for the main schedule: unplaced students
/// grouped by (day, section), ordered by level, then name, then id.
fn main_pack_order(state: &CompetitionState) -> Vec<StudentId> {
    let mut entries: Vec<_> = state
        .unscheduled_students()
        .filter(|s| s.day_preference() != DayPreference::Command)
        .map(|s| {
            (
                s.day_preference(),
                s.section(),
                s.skill_level(),
                s.last_name().to_lowercase(),
                s.first_name().to_lowercase(),
                s.id().clone(),
            )
        })
        .collect();
    entries.sort();
    entries.into_iter().map(|e| e.5).collect()
}

/// Deterministic pack order for the command session: eligible students
/// with a window preference first (grouped by window), then the rest;
/// level and name break ties.
fn command_pack_order(state: &CompetitionState) -> Vec<StudentId> {
    let mut entries: Vec<_> = state
        .students()
        .filter(|s| s.command_placement().is_none())
        .filter(|s| {
            s.day_preference() == DayPreference::Command
                || s.result().is_some_and(|r| r.is_command_eligible())
        })
        .map(|s| {
            (
                s.preferred_command_time().is_none(),
                s.preferred_command_time(),
                s.skill_level(),
                s.last_name().to_lowercase(),
                s.first_name().to_lowercase(),
                s.id().clone(),
            )
        })
        .collect();
    entries.sort();
    entries.into_iter().map(|e| e.5).collect()
}

/// Selects a block for one student.
///
/// Scans the catalog in order, keeping the first block that fits; a
/// later block wins only on exactly equal remaining minutes with a
/// strictly closer average skill level. `section` of `None` accepts any
/// section (command session); `window` of `Some` restricts to
/// matching-window blocks.
fn choose_block(
    state: &CompetitionState,
    day: FestivalDay,
    section: Option<SectionType>,
    level: SkillLevel,
    required_minutes: u32,
    window: Option<CommandWindow>,
) -> Result<Placement, PlacementFailureReason> {
    let mut best: Option<(&crate::models::TimeBlock, u32, f64)> = None;
    let mut any_compatible = false;
    let mut best_remaining_seen: u32 = 0;

    for block in state.blocks() {
        if block.day != day {
            continue;
        }
        if section.is_some_and(|s| block.section != s) {
            continue;
        }
        if !block.accepts_level(level) {
            continue;
        }
        if window.is_some_and(|w| block.command_window != Some(w)) {
            continue;
        }

        any_compatible = true;
        let remaining = state.remaining_minutes(block);
        best_remaining_seen = best_remaining_seen.max(remaining);

        if remaining < required_minutes {
            continue;
        }
        if block
            .max_students
            .is_some_and(|max| state.block_roster(&block.id).len() as u32 >= max)
        {
            continue;
        }

        let distance = state
            .average_level(&block.id)
            .map(|avg| (avg - f64::from(level.value())).abs())
            .unwrap_or(0.0);

        let replace = match best {
            None => true,
            Some((_, best_remaining, best_distance)) => {
                remaining == best_remaining && distance < best_distance
            }
        };
        if replace {
            best = Some((block, remaining, distance));
        }
    }

    match best {
        Some((block, _, _)) => Ok(block.placement()),
        None if any_compatible => Err(PlacementFailureReason::InsufficientCapacity {
            required_minutes,
            best_remaining: best_remaining_seen,
        }),
        None => Err(PlacementFailureReason::NoCompatibleBlock),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockId, CompetitionResult, SectionType, Student, TimeBlock};
    use chrono::{NaiveDate, NaiveTime};

    fn level(v: u8) -> SkillLevel {
        SkillLevel::new(v).unwrap()
    }

    fn student(id: &str, day: DayPreference, lvl: u8, minutes: u32) -> Student {
        Student::new(
            StudentId::from_raw(id),
            "first",
            id,
            SectionType::Traditional,
            day,
            level(lvl),
            minutes,
        )
        .with_song("A", "B")
        .with_song("C", "D")
        .with_teacher("T", "t@example.com")
        .with_parent_email("p@example.com")
    }

    fn block(id: &str, day: FestivalDay, capacity: u32) -> TimeBlock {
        TimeBlock::new(
            id,
            day,
            NaiveDate::from_ymd_opt(2025, 3, 8).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )
        .with_room("Room 1", "Fine Arts Center")
        .with_capacity(capacity)
    }

    fn sid(id: &str) -> StudentId {
        StudentId::from_raw(id)
    }

    #[test]
    fn test_places_students_within_capacity() {
        let mut state = CompetitionState::new("Spring Festival");
        state.add_block(block("b1", FestivalDay::Saturday, 30)).unwrap();
        state.add_block(block("b2", FestivalDay::Saturday, 30)).unwrap();
        for i in 0..4 {
            state
                .add_student(student(&format!("s{i}"), DayPreference::Saturday, 5, 15))
                .unwrap();
        }

        let report = ScheduleEngine::new().schedule(&mut state);
        assert!(report.is_complete());
        assert_eq!(report.placed_count(), 4);

        for b in state.blocks() {
            assert!(state.block_load(&b.id) <= b.capacity_minutes);
        }
    }

    #[test]
    fn test_every_student_placed_or_reported() {
        let mut state = CompetitionState::new("Spring Festival");
        state.add_block(block("b1", FestivalDay::Saturday, 30)).unwrap();
        for i in 0..4 {
            state
                .add_student(student(&format!("s{i}"), DayPreference::Saturday, 5, 15))
                .unwrap();
        }

        let report = ScheduleEngine::new().schedule(&mut state);
        // 30 minutes fit two students of 15; the other two are reported
        assert_eq!(report.placed_count() + report.failure_count(), 4);
        assert_eq!(report.placed_count(), 2);

        let placed: Vec<_> = report.placed.iter().collect();
        for failure in &report.failures {
            assert!(!placed.contains(&&failure.student_id));
            assert!(state
                .student(&failure.student_id)
                .unwrap()
                .placement()
                .is_none());
        }
    }

    #[test]
    fn test_capacity_overflow_spills_to_second_block() {
        // A level-5 student needing 15 minutes against a 60-minute block
        // already holding 50 minutes must fail there and land in the
        // same-day block with 30 minutes free.
        let mut state = CompetitionState::new("Spring Festival");
        state.add_block(block("b1", FestivalDay::Saturday, 60)).unwrap();
        state.add_block(block("b2", FestivalDay::Saturday, 30)).unwrap();

        let filler = state.block(&BlockId::new("b1")).unwrap().placement();
        for i in 0..5 {
            let id = format!("filler{i}");
            state
                .add_student(student(&id, DayPreference::Saturday, 5, 10))
                .unwrap();
            state.student_mut(&sid(&id)).unwrap().assign(filler.clone()).unwrap();
        }
        assert_eq!(state.block_load(&BlockId::new("b1")), 50);

        state
            .add_student(student("late", DayPreference::Saturday, 5, 15))
            .unwrap();
        let report = ScheduleEngine::new().schedule(&mut state);

        assert!(report.is_complete());
        let placed = state.student(&sid("late")).unwrap().placement().unwrap();
        assert_eq!(placed.block_id, BlockId::new("b2"));
    }

    #[test]
    fn test_unplaceable_student_reported_with_reason() {
        let mut state = CompetitionState::new("Spring Festival");
        state.add_block(block("b1", FestivalDay::Saturday, 60)).unwrap();

        let filler = state.block(&BlockId::new("b1")).unwrap().placement();
        for i in 0..5 {
            let id = format!("filler{i}");
            state
                .add_student(student(&id, DayPreference::Saturday, 5, 10))
                .unwrap();
            state.student_mut(&sid(&id)).unwrap().assign(filler.clone()).unwrap();
        }

        state
            .add_student(student("late", DayPreference::Saturday, 5, 15))
            .unwrap();
        let report = ScheduleEngine::new().schedule(&mut state);

        assert_eq!(report.failure_count(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.student_id, sid("late"));
        assert_eq!(
            failure.reason,
            PlacementFailureReason::InsufficientCapacity {
                required_minutes: 15,
                best_remaining: 10
            }
        );
    }

    #[test]
    fn test_no_compatible_block() {
        let mut state = CompetitionState::new("Spring Festival");
        state.add_block(block("b1", FestivalDay::Saturday, 60)).unwrap();
        state
            .add_student(student("sunday-kid", DayPreference::Sunday, 5, 15))
            .unwrap();

        let report = ScheduleEngine::new().schedule(&mut state);
        assert_eq!(report.failures[0].reason, PlacementFailureReason::NoCompatibleBlock);
    }

    #[test]
    fn test_section_must_match() {
        let mut state = CompetitionState::new("Spring Festival");
        state
            .add_block(block("b1", FestivalDay::Saturday, 60).with_section(SectionType::Master))
            .unwrap();
        state
            .add_student(student("trad", DayPreference::Saturday, 5, 15))
            .unwrap();

        let report = ScheduleEngine::new().schedule(&mut state);
        assert_eq!(report.failures[0].reason, PlacementFailureReason::NoCompatibleBlock);
    }

    #[test]
    fn test_skill_range_must_contain_student() {
        let mut state = CompetitionState::new("Spring Festival");
        state
            .add_block(
                block("b1", FestivalDay::Saturday, 60).with_levels(level(0), level(3)),
            )
            .unwrap();
        state
            .add_student(student("adv", DayPreference::Saturday, 9, 15))
            .unwrap();

        let report = ScheduleEngine::new().schedule(&mut state);
        assert_eq!(report.failures[0].reason, PlacementFailureReason::NoCompatibleBlock);
    }

    #[test]
    fn test_first_fit_in_catalog_order() {
        let mut state = CompetitionState::new("Spring Festival");
        state.add_block(block("b1", FestivalDay::Saturday, 60)).unwrap();
        state.add_block(block("b2", FestivalDay::Saturday, 90)).unwrap();
        state
            .add_student(student("s1", DayPreference::Saturday, 5, 15))
            .unwrap();

        ScheduleEngine::new().schedule(&mut state);
        assert_eq!(
            state.student(&sid("s1")).unwrap().placement().unwrap().block_id,
            BlockId::new("b1")
        );
    }

    #[test]
    fn test_equal_remaining_tie_break_prefers_closer_cohort() {
        let mut state = CompetitionState::new("Spring Festival");
        state.add_block(block("b1", FestivalDay::Saturday, 60)).unwrap();
        state.add_block(block("b2", FestivalDay::Saturday, 60)).unwrap();

        // Seed both blocks to 10 used minutes: b1 with a level-1 cohort,
        // b2 with a level-5 cohort.
        state.add_student(student("low", DayPreference::Saturday, 1, 10)).unwrap();
        state.add_student(student("mid", DayPreference::Saturday, 5, 10)).unwrap();
        let p1 = state.block(&BlockId::new("b1")).unwrap().placement();
        let p2 = state.block(&BlockId::new("b2")).unwrap().placement();
        state.student_mut(&sid("low")).unwrap().assign(p1).unwrap();
        state.student_mut(&sid("mid")).unwrap().assign(p2).unwrap();

        state
            .add_student(student("new", DayPreference::Saturday, 5, 15))
            .unwrap();
        ScheduleEngine::new().schedule(&mut state);

        assert_eq!(
            state.student(&sid("new")).unwrap().placement().unwrap().block_id,
            BlockId::new("b2")
        );
    }

    #[test]
    fn test_rerun_is_append_only() {
        let mut state = CompetitionState::new("Spring Festival");
        state.add_block(block("b1", FestivalDay::Saturday, 60)).unwrap();
        state.add_block(block("b2", FestivalDay::Saturday, 60)).unwrap();
        for i in 0..3 {
            state
                .add_student(student(&format!("s{i}"), DayPreference::Saturday, 5, 10))
                .unwrap();
        }

        let engine = ScheduleEngine::new();
        engine.schedule(&mut state);
        let before: Vec<_> = state
            .students()
            .map(|s| (s.id().clone(), s.placement().cloned()))
            .collect();

        state
            .add_student(student("s-new", DayPreference::Saturday, 6, 10))
            .unwrap();
        let report = engine.schedule(&mut state);

        assert_eq!(report.placed, vec![sid("s-new")]);
        for (id, placement) in before {
            assert_eq!(state.student(&id).unwrap().placement().cloned(), placement);
        }
    }

    #[test]
    fn test_deterministic_across_runs() {
        let build = || {
            let mut state = CompetitionState::new("Spring Festival");
            state.add_block(block("b1", FestivalDay::Saturday, 45)).unwrap();
            state.add_block(block("b2", FestivalDay::Saturday, 45)).unwrap();
            for i in 0..6 {
                state
                    .add_student(student(
                        &format!("s{i}"),
                        DayPreference::Saturday,
                        (i % 3) as u8 + 3,
                        12,
                    ))
                    .unwrap();
            }
            state
        };

        let mut a = build();
        let mut b = build();
        ScheduleEngine::new().schedule(&mut a);
        ScheduleEngine::new().schedule(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_command_pass_places_qualifiers_and_command_preference() {
        let mut state = CompetitionState::new("Spring Festival");
        state.add_block(block("sat", FestivalDay::Saturday, 120)).unwrap();
        state.add_block(block("cmd", FestivalDay::Command, 60)).unwrap();

        state.add_student(student("winner", DayPreference::Saturday, 5, 10)).unwrap();
        state.add_student(student("also-ran", DayPreference::Saturday, 5, 10)).unwrap();
        state.add_student(student("returning", DayPreference::Command, 8, 10)).unwrap();

        let engine = ScheduleEngine::new();
        engine.schedule(&mut state);
        // Command-preference students are not touched by the main pass
        assert!(state.student(&sid("returning")).unwrap().placement().is_none());

        state
            .student_mut(&sid("winner"))
            .unwrap()
            .set_result(CompetitionResult::SuperiorWithDistinction);
        state
            .student_mut(&sid("also-ran"))
            .unwrap()
            .set_result(CompetitionResult::Excellent);

        let report = engine.schedule_command(&mut state);
        assert!(report.is_complete());

        assert!(state.student(&sid("winner")).unwrap().command_placement().is_some());
        assert!(state.student(&sid("returning")).unwrap().command_placement().is_some());
        assert!(state.student(&sid("also-ran")).unwrap().command_placement().is_none());
    }

    #[test]
    fn test_command_pass_honors_window_preference() {
        let mut state = CompetitionState::new("Spring Festival");
        state
            .add_block(
                block("cmd-am", FestivalDay::Command, 60)
                    .with_command_window(CommandWindow::Morning),
            )
            .unwrap();
        state
            .add_block(
                block("cmd-pm", FestivalDay::Command, 60)
                    .with_command_window(CommandWindow::Afternoon),
            )
            .unwrap();

        let mut s = student("returning", DayPreference::Command, 8, 10);
        s.set_preferred_command_time(CommandWindow::Afternoon);
        state.add_student(s).unwrap();

        ScheduleEngine::new().schedule_command(&mut state);
        assert_eq!(
            state
                .student(&sid("returning"))
                .unwrap()
                .command_placement()
                .unwrap()
                .block_id,
            BlockId::new("cmd-pm")
        );
    }

    #[test]
    fn test_command_pass_falls_back_when_window_full() {
        let mut state = CompetitionState::new("Spring Festival");
        state
            .add_block(
                block("cmd-am", FestivalDay::Command, 10)
                    .with_command_window(CommandWindow::Morning),
            )
            .unwrap();
        state
            .add_block(
                block("cmd-pm", FestivalDay::Command, 60)
                    .with_command_window(CommandWindow::Afternoon),
            )
            .unwrap();

        let mut a = student("first", DayPreference::Command, 8, 10);
        a.set_preferred_command_time(CommandWindow::Morning);
        let mut b = student("second", DayPreference::Command, 8, 10);
        b.set_preferred_command_time(CommandWindow::Morning);
        state.add_student(a).unwrap();
        state.add_student(b).unwrap();

        let report = ScheduleEngine::new().schedule_command(&mut state);
        assert!(report.is_complete());

        // One student takes the morning block; the overflow lands in the
        // afternoon block rather than failing.
        let rooms: Vec<_> = ["first", "second"]
            .iter()
            .map(|id| {
                state
                    .student(&sid(id))
                    .unwrap()
                    .command_placement()
                    .unwrap()
                    .block_id
                    .clone()
            })
            .collect();
        assert!(rooms.contains(&BlockId::new("cmd-am")));
        assert!(rooms.contains(&BlockId::new("cmd-pm")));
    }

    #[test]
    fn test_command_pass_reports_overflow() {
        let mut state = CompetitionState::new("Spring Festival");
        state.add_block(block("cmd", FestivalDay::Command, 10)).unwrap();

        state.add_student(student("a", DayPreference::Command, 5, 10)).unwrap();
        state.add_student(student("b", DayPreference::Command, 5, 10)).unwrap();

        let report = ScheduleEngine::new().schedule_command(&mut state);
        assert_eq!(report.placed_count(), 1);
        assert_eq!(report.failure_count(), 1);
    }
}
