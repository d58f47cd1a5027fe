//! Results and trophy engine.
//!
//! Applies post-performance score updates to a [`CompetitionState`] and
//! derives end-of-event artifacts from it.
//!
//! # Update semantics
//!
//! Updates are partial: fields absent from a [`ScoreUpdate`] leave the
//! student's current values untouched. Problems (unknown ids, bad song
//! indexes) are collected per entry in the [`ScoreUpdateReport`] and
//! never abort the rest of the batch. Applying the same batch twice
//! yields the same state as applying it once.
//!
//! # Trophy list
//!
//! [`compute_trophy_list`] is a pure function of the state: it groups
//! trophy-eligible students (SD or S) by section and level and sorts
//! each group by (last name, first name, id).

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{
    CommandSongError, CommandWindow, CompetitionResult, CompetitionState, SectionType, SkillLevel,
    StudentId,
};

/// One partial score update from the results feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    /// Judged result.
    pub result: Option<CompetitionResult>,
    /// Index into the student's repertoire for the command performance.
    pub command_song_index: Option<usize>,
    /// Preferred command-performance window.
    pub preferred_command_time: Option<CommandWindow>,
}

impl ScoreUpdate {
    /// Creates an empty (no-op) update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the judged result.
    pub fn with_result(mut self, result: CompetitionResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Selects the command-performance song by repertoire index.
    pub fn with_command_song(mut self, index: usize) -> Self {
        self.command_song_index = Some(index);
        self
    }

    /// Sets the preferred command-performance window.
    pub fn with_preferred_time(mut self, window: CommandWindow) -> Self {
        self.preferred_command_time = Some(window);
        self
    }
}

/// Why one update entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum UpdateRejectionReason {
    /// The id matches no registered student.
    #[error("no student with this id is registered")]
    UnknownStudent,
    /// The command song index does not point at a registered song.
    #[error("song index {index} is out of range for {song_count} registered songs")]
    SongIndexOutOfRange { index: usize, song_count: usize },
    /// A command song was selected for a student whose result does not qualify.
    #[error("student's result does not qualify for the command performance")]
    NotCommandEligible,
}

/// One rejected update entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedUpdate {
    pub student_id: StudentId,
    pub reason: UpdateRejectionReason,
}

/// Outcome of one update batch.
///
/// An entry lands in `applied` only when every field it carried applied
/// cleanly; otherwise it lands in `rejected` with the first problem
/// found. Fields before the problem are still applied: partial update
/// semantics hold per field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreUpdateReport {
    pub applied: Vec<StudentId>,
    pub rejected: Vec<RejectedUpdate>,
}

impl ScoreUpdateReport {
    /// Whether every entry in the batch applied cleanly.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Applies a batch of partial score updates.
///
/// Entries are applied in id order. Unknown ids are reported, not
/// silently ignored, and do not affect other entries in the same call.
pub fn update_scores(
    state: &mut CompetitionState,
    updates: &BTreeMap<StudentId, ScoreUpdate>,
) -> ScoreUpdateReport {
    info!(
        "applying {} score update(s) to '{}'",
        updates.len(),
        state.name()
    );

    let mut report = ScoreUpdateReport::default();
    for (id, update) in updates {
        let Some(student) = state.student_mut(id) else {
            warn!("score update for unknown student {id}");
            report.rejected.push(RejectedUpdate {
                student_id: id.clone(),
                reason: UpdateRejectionReason::UnknownStudent,
            });
            continue;
        };

        if let Some(result) = update.result {
            student.set_result(result);
        }
        if let Some(window) = update.preferred_command_time {
            student.set_preferred_command_time(window);
        }

        let mut rejection = None;
        if let Some(index) = update.command_song_index {
            rejection = match student.select_command_song(index) {
                Ok(()) => None,
                Err(CommandSongError::NotEligible) => Some(UpdateRejectionReason::NotCommandEligible),
                Err(CommandSongError::IndexOutOfRange { index, song_count }) => {
                    Some(UpdateRejectionReason::SongIndexOutOfRange { index, song_count })
                }
            };
        }

        match rejection {
            None => report.applied.push(id.clone()),
            Some(reason) => {
                warn!("score update for {id} rejected: {reason}");
                report.rejected.push(RejectedUpdate {
                    student_id: id.clone(),
                    reason,
                });
            }
        }
    }
    report
}

/// One trophy-list row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrophyEntry {
    pub student_id: StudentId,
    pub name: String,
    pub teacher: String,
    pub result: CompetitionResult,
}

/// Trophy-eligible students of one (section, level) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrophyGroup {
    pub section: SectionType,
    pub level: SkillLevel,
    pub entries: Vec<TrophyEntry>,
}

/// The derived trophy list, grouped by section and level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrophyList {
    pub groups: Vec<TrophyGroup>,
}

impl TrophyList {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total eligible students across all groups.
    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }
}

/// Computes the trophy list.
///
/// Pure: re-derivable at any time from the current state, with no side
/// effects. Groups are ordered by (section, level); entries within a
/// group by (last name, first name, id).
pub fn compute_trophy_list(state: &CompetitionState) -> TrophyList {
    let mut grouped: BTreeMap<(SectionType, SkillLevel), Vec<TrophyEntry>> = BTreeMap::new();

    let mut eligible: Vec<_> = state
        .students()
        .filter_map(|s| {
            s.result()
                .filter(|r| r.is_trophy_eligible())
                .map(|r| (s, r))
        })
        .collect();
    eligible.sort_by_key(|(s, _)| {
        (
            s.last_name().to_lowercase(),
            s.first_name().to_lowercase(),
            s.id().clone(),
        )
    });

    for (student, result) in eligible {
        grouped
            .entry((student.section(), student.skill_level()))
            .or_default()
            .push(TrophyEntry {
                student_id: student.id().clone(),
                name: student.display_name(),
                teacher: student.teacher_name().to_string(),
                result,
            });
    }

    TrophyList {
        groups: grouped
            .into_iter()
            .map(|((section, level), entries)| TrophyGroup {
                section,
                level,
                entries,
            })
            .collect(),
    }
}
