//! Competition state: the unit of persistence.
//!
//! Owns every [`Student`] and [`TimeBlock`] of one competition. Students
//! are keyed by their identity hash; blocks keep catalog order, which is
//! also the scheduling engine's scan order.
//!
//! Block load is always derived from the placements stored on students,
//! so capacity accounting can never drift from the roster: there is no
//! second copy of "used minutes" to keep in sync.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{BlockId, Student, StudentId, TimeBlock};

/// Attempt to register an entity under an id that is already taken.
#[derive(Debug, Clone, thiserror::Error)]
#[error("duplicate id: {0}")]
pub struct DuplicateEntry(pub String);

/// Full state of one competition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionState {
    name: String,
    students: BTreeMap<StudentId, Student>,
    blocks: Vec<TimeBlock>,
}

impl CompetitionState {
    /// Creates an empty competition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            students: BTreeMap::new(),
            blocks: Vec::new(),
        }
    }

    /// Competition name; selects the persisted snapshot.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a student. Rejects a second registration under the same id.
    pub fn add_student(&mut self, student: Student) -> Result<(), DuplicateEntry> {
        let id = student.id().clone();
        if self.students.contains_key(&id) {
            return Err(DuplicateEntry(id.to_string()));
        }
        self.students.insert(id, student);
        Ok(())
    }

    /// Adds a block to the catalog. Rejects duplicate block ids.
    pub fn add_block(&mut self, block: TimeBlock) -> Result<(), DuplicateEntry> {
        if self.blocks.iter().any(|b| b.id == block.id) {
            return Err(DuplicateEntry(block.id.to_string()));
        }
        self.blocks.push(block);
        Ok(())
    }

    pub fn student(&self, id: &StudentId) -> Option<&Student> {
        self.students.get(id)
    }

    pub fn student_mut(&mut self, id: &StudentId) -> Option<&mut Student> {
        self.students.get_mut(id)
    }

    /// All students, in id order.
    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    /// The block catalog, in catalog order.
    pub fn blocks(&self) -> &[TimeBlock] {
        &self.blocks
    }

    pub fn block(&self, id: &BlockId) -> Option<&TimeBlock> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    /// Students placed into the given block, by either the main or the
    /// command placement.
    pub fn block_roster(&self, id: &BlockId) -> Vec<&Student> {
        self.students
            .values()
            .filter(|s| {
                s.placement().is_some_and(|p| &p.block_id == id)
                    || s.command_placement().is_some_and(|p| &p.block_id == id)
            })
            .collect()
    }

    /// Cumulative play time (minutes) of students placed into a block.
    pub fn block_load(&self, id: &BlockId) -> u32 {
        self.block_roster(id)
            .iter()
            .map(|s| s.play_time_minutes())
            .sum()
    }

    /// Play-time minutes still free in a block.
    pub fn remaining_minutes(&self, block: &TimeBlock) -> u32 {
        block.capacity_minutes.saturating_sub(self.block_load(&block.id))
    }

    /// Mean skill level of a block's roster; `None` for an empty block.
    pub fn average_level(&self, id: &BlockId) -> Option<f64> {
        let roster = self.block_roster(id);
        if roster.is_empty() {
            return None;
        }
        let sum: u32 = roster.iter().map(|s| u32::from(s.skill_level().value())).sum();
        Some(f64::from(sum) / roster.len() as f64)
    }

    /// Students without a main-schedule placement, in id order.
    pub fn unscheduled_students(&self) -> impl Iterator<Item = &Student> {
        self.students.values().filter(|s| !s.is_scheduled())
    }
}
