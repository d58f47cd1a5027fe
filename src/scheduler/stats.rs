//! Schedule quality metrics.
//!
//! Computes standard indicators from a competition state after (or
//! during) scheduling:
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Scheduled / unscheduled | Students with / without a main placement |
//! | Block load | Cumulative placed minutes per block |
//! | Utilization | load / capacity per block |
//! | Day counts | Placed students per festival day |
//! | Result tallies | Students per letter code, once scores arrive |

use std::collections::BTreeMap;

use crate::models::{BlockId, CompetitionState, FestivalDay};

/// Load summary for one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLoad {
    pub block_id: BlockId,
    pub day: FestivalDay,
    /// Cumulative placed play time (minutes).
    pub used_minutes: u32,
    pub capacity_minutes: u32,
    pub student_count: usize,
    /// used / capacity, 0.0 for a zero-capacity block.
    pub utilization: f64,
}

/// Aggregate schedule indicators for one competition.
#[derive(Debug, Clone, Default)]
pub struct CompetitionStats {
    pub total_students: usize,
    /// Students with a main-schedule placement.
    pub scheduled: usize,
    /// Students still waiting on the main schedule.
    pub unscheduled: usize,
    /// Per-block loads, in catalog order.
    pub block_loads: Vec<BlockLoad>,
    /// Placed students per day (main placements only).
    pub students_per_day: BTreeMap<FestivalDay, usize>,
    /// Students per result letter code, for scored students.
    pub result_counts: BTreeMap<&'static str, usize>,
}

impl CompetitionStats {
    /// Computes statistics from the current state.
    pub fn calculate(state: &CompetitionState) -> Self {
        let total_students = state.student_count();
        let scheduled = state.students().filter(|s| s.is_scheduled()).count();

        let block_loads = state
            .blocks()
            .iter()
            .map(|block| {
                let used = state.block_load(&block.id);
                let count = state.block_roster(&block.id).len();
                let utilization = if block.capacity_minutes == 0 {
                    0.0
                } else {
                    f64::from(used) / f64::from(block.capacity_minutes)
                };
                BlockLoad {
                    block_id: block.id.clone(),
                    day: block.day,
                    used_minutes: used,
                    capacity_minutes: block.capacity_minutes,
                    student_count: count,
                    utilization,
                }
            })
            .collect();

        let mut students_per_day = BTreeMap::new();
        for student in state.students() {
            if let Some(placement) = student.placement() {
                *students_per_day.entry(placement.day).or_insert(0) += 1;
            }
        }

        let mut result_counts = BTreeMap::new();
        for student in state.students() {
            if let Some(result) = student.result() {
                *result_counts.entry(result.code()).or_insert(0) += 1;
            }
        }

        Self {
            total_students,
            scheduled,
            unscheduled: total_students - scheduled,
            block_loads,
            students_per_day,
            result_counts,
        }
    }
}
