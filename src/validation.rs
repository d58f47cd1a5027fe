//! Competition state validation.
//!
//! Checks the integrity of a [`CompetitionState`] before scheduling or
//! after decoding a snapshot. Detects:
//! - Missing required registration fields
//! - Repertoires with fewer than two songs
//! - Zero play times
//! - Duplicate or zero-capacity blocks, inverted skill ranges
//! - Placements referencing unknown blocks
//! - Blocks packed beyond their declared capacity
//!
//! All problems are collected and returned together; a single bad record
//! never hides the rest.

use crate::models::CompetitionState;
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description carrying the offending entity's id.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two blocks share the same id.
    DuplicateId,
    /// A required registration field is empty.
    MissingField,
    /// A student registered fewer than two songs.
    TooFewSongs,
    /// A student's total play time is zero.
    ZeroPlayTime,
    /// A block's minimum level exceeds its maximum.
    InvalidSkillRange,
    /// A block declares no play-time capacity.
    ZeroCapacity,
    /// A placement references a block absent from the catalog.
    UnknownBlockReference,
    /// A block's derived load exceeds its capacity.
    CapacityExceeded,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a competition state.
///
/// Checks:
/// 1. Student names, teacher name, and parent email are non-empty
/// 2. Every student registered at least two songs
/// 3. Every play time is nonzero
/// 4. No duplicate block ids
/// 5. Block skill ranges are not inverted, capacities are nonzero
/// 6. Every placement points at a cataloged block
/// 7. No block is loaded beyond its play-time capacity or student cap
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with every detected issue.
pub fn validate_state(state: &CompetitionState) -> ValidationResult {
    let mut errors = Vec::new();

    for student in state.students() {
        let id = student.id();

        if student.first_name().trim().is_empty() || student.last_name().trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingField,
                format!("student {id} has an empty name"),
            ));
        }
        if student.teacher_name().trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingField,
                format!("student {id} has no registering teacher"),
            ));
        }
        if student.parent_email().trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingField,
                format!("student {id} has no parent email"),
            ));
        }
        if student.songs().len() < 2 {
            errors.push(ValidationError::new(
                ValidationErrorKind::TooFewSongs,
                format!(
                    "student {id} registered {} song(s); two are required",
                    student.songs().len()
                ),
            ));
        }
        if student.play_time_minutes() == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroPlayTime,
                format!("student {id} has a zero play time"),
            ));
        }
    }

    let mut block_ids = HashSet::new();
    for block in state.blocks() {
        if !block_ids.insert(block.id.clone()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("duplicate block id: {}", block.id),
            ));
        }
        if block.min_level > block.max_level {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidSkillRange,
                format!(
                    "block {} accepts levels {}..{} (inverted range)",
                    block.id, block.min_level, block.max_level
                ),
            ));
        }
        if block.capacity_minutes == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroCapacity,
                format!("block {} declares no play-time capacity", block.id),
            ));
        }
    }

    for student in state.students() {
        for placement in [student.placement(), student.command_placement()]
            .into_iter()
            .flatten()
        {
            if !block_ids.contains(&placement.block_id) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownBlockReference,
                    format!(
                        "student {} is placed in unknown block {}",
                        student.id(),
                        placement.block_id
                    ),
                ));
            }
        }
    }

    for block in state.blocks() {
        let load = state.block_load(&block.id);
        if load > block.capacity_minutes {
            errors.push(ValidationError::new(
                ValidationErrorKind::CapacityExceeded,
                format!(
                    "block {} holds {load} minutes against a capacity of {}",
                    block.id, block.capacity_minutes
                ),
            ));
        }
        if let Some(max) = block.max_students {
            let count = state.block_roster(&block.id).len();
            if count as u32 > max {
                errors.push(ValidationError::new(
                    ValidationErrorKind::CapacityExceeded,
                    format!(
                        "block {} holds {count} students against a cap of {max}",
                        block.id
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BlockId, DayPreference, FestivalDay, SectionType, SkillLevel, Student, StudentId,
        TimeBlock,
    };
    use chrono::{NaiveDate, NaiveTime};

    fn level(v: u8) -> SkillLevel {
        SkillLevel::new(v).unwrap()
    }

    fn good_student(id: &str) -> Student {
        Student::new(
            StudentId::from_raw(id),
            "Ada",
            "Lovelace",
            SectionType::Traditional,
            DayPreference::Saturday,
            level(5),
            15,
        )
        .with_song("Sonatina in C", "Clementi")
        .with_song("The Wild Horseman", "Schumann")
        .with_teacher("Marie Curie", "marie@example.com")
        .with_parent_email("parent@example.com")
    }

    fn good_block(id: &str, capacity: u32) -> TimeBlock {
        TimeBlock::new(
            id,
            FestivalDay::Saturday,
            NaiveDate::from_ymd_opt(2025, 3, 8).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )
        .with_room("Room 104", "Fine Arts Center")
        .with_capacity(capacity)
        .with_levels(level(4), level(6))
    }

    #[test]
    fn test_valid_state() {
        let mut state = CompetitionState::new("Spring Festival");
        state.add_student(good_student("s1")).unwrap();
        state.add_block(good_block("b1", 60)).unwrap();
        assert!(validate_state(&state).is_ok());
    }

    #[test]
    fn test_missing_fields() {
        let mut state = CompetitionState::new("Spring Festival");
        let bare = Student::new(
            StudentId::from_raw("s1"),
            "",
            "Lovelace",
            SectionType::Traditional,
            DayPreference::Saturday,
            level(5),
            15,
        )
        .with_song("A", "B")
        .with_song("C", "D");
        state.add_student(bare).unwrap();

        let errors = validate_state(&state).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::MissingField && e.message.contains("name")));
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::MissingField && e.message.contains("teacher")));
    }

    #[test]
    fn test_too_few_songs() {
        let mut state = CompetitionState::new("Spring Festival");
        let one_song = Student::new(
            StudentId::from_raw("s1"),
            "Ada",
            "Lovelace",
            SectionType::Traditional,
            DayPreference::Saturday,
            level(5),
            15,
        )
        .with_song("Sonatina in C", "Clementi")
        .with_teacher("Marie Curie", "marie@example.com")
        .with_parent_email("parent@example.com");
        state.add_student(one_song).unwrap();

        let errors = validate_state(&state).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::TooFewSongs));
    }

    #[test]
    fn test_zero_play_time() {
        let mut state = CompetitionState::new("Spring Festival");
        let zero = Student::new(
            StudentId::from_raw("s1"),
            "Ada",
            "Lovelace",
            SectionType::Traditional,
            DayPreference::Saturday,
            level(5),
            0,
        )
        .with_song("A", "B")
        .with_song("C", "D")
        .with_teacher("Marie Curie", "marie@example.com")
        .with_parent_email("parent@example.com");
        state.add_student(zero).unwrap();

        let errors = validate_state(&state).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::ZeroPlayTime));
    }

    #[test]
    fn test_inverted_skill_range_and_zero_capacity() {
        let mut state = CompetitionState::new("Spring Festival");
        let bad = good_block("b1", 0).with_levels(level(8), level(3));
        state.add_block(bad).unwrap();

        let errors = validate_state(&state).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidSkillRange));
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::ZeroCapacity));
    }

    #[test]
    fn test_unknown_block_reference() {
        let mut state = CompetitionState::new("Spring Festival");
        state.add_block(good_block("b1", 60)).unwrap();
        state.add_student(good_student("s1")).unwrap();

        let phantom = good_block("ghost", 60).placement();
        state
            .student_mut(&StudentId::from_raw("s1"))
            .unwrap()
            .assign(phantom)
            .unwrap();

        let errors = validate_state(&state).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownBlockReference
                && e.message.contains("ghost")));
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut state = CompetitionState::new("Spring Festival");
        state.add_block(good_block("b1", 20)).unwrap();
        state.add_student(good_student("s1")).unwrap();
        state.add_student(good_student("s2")).unwrap();

        let placement = state.block(&BlockId::new("b1")).unwrap().placement();
        for id in ["s1", "s2"] {
            state
                .student_mut(&StudentId::from_raw(id))
                .unwrap()
                .assign(placement.clone())
                .unwrap();
        }

        // Two 15-minute students in a 20-minute block
        let errors = validate_state(&state).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::CapacityExceeded));
    }

    #[test]
    fn test_student_cap_exceeded() {
        let mut state = CompetitionState::new("Spring Festival");
        state
            .add_block(good_block("b1", 120).with_max_students(1))
            .unwrap();
        state.add_student(good_student("s1")).unwrap();
        state.add_student(good_student("s2")).unwrap();

        let placement = state.block(&BlockId::new("b1")).unwrap().placement();
        for id in ["s1", "s2"] {
            state
                .student_mut(&StudentId::from_raw(id))
                .unwrap()
                .assign(placement.clone())
                .unwrap();
        }

        let errors = validate_state(&state).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::CapacityExceeded
                && e.message.contains("cap of 1")));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut state = CompetitionState::new("Spring Festival");
        let bad_student = Student::new(
            StudentId::from_raw("s1"),
            "",
            "",
            SectionType::Master,
            DayPreference::Sunday,
            level(3),
            0,
        );
        state.add_student(bad_student).unwrap();
        state.add_block(good_block("b1", 0)).unwrap();

        let errors = validate_state(&state).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
