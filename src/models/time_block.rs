//! Time block (performance session) model.
//!
//! A time block is one judged session: a day, start time, room, and
//! location, with capacity expressed as maximum cumulative play-time
//! minutes and an optional student-count cap. Each block declares which
//! section it hosts and the skill range it accepts, so the scheduling
//! engine can keep cohorts musically coherent.
//!
//! Blocks do not track their own roster; the placement lives on the
//! student, and [`CompetitionState`](super::CompetitionState) derives
//! block load from those back-references.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{CommandWindow, SectionType, SkillLevel};

/// Unique identifier for a time block within a competition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Creates a block id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Competition day a block belongs to.
///
/// `Command` marks blocks reserved for the post-results command
/// performance session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FestivalDay {
    Saturday,
    Sunday,
    Command,
}

impl FestivalDay {
    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
            Self::Command => "Command",
        }
    }
}

/// A student's assigned slot: the block's coordinates, copied onto the
/// student when the scheduling engine places them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub block_id: BlockId,
    pub day: FestivalDay,
    pub start_time: NaiveTime,
    pub room: String,
    pub location: String,
    pub date: NaiveDate,
}

/// A schedulable performance session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlock {
    /// Unique block identifier.
    pub id: BlockId,
    /// Competition day.
    pub day: FestivalDay,
    /// Concrete calendar date of the session.
    pub date: NaiveDate,
    /// Session start time.
    pub start_time: NaiveTime,
    /// Room name/number.
    pub room: String,
    /// Venue.
    pub location: String,
    /// Maximum cumulative play time of placed students (minutes).
    pub capacity_minutes: u32,
    /// Optional cap on the number of placed students.
    pub max_students: Option<u32>,
    /// Section hosted by this block.
    pub section: SectionType,
    /// Lowest accepted skill level.
    pub min_level: SkillLevel,
    /// Highest accepted skill level.
    pub max_level: SkillLevel,
    /// Window tag for command-day blocks.
    pub command_window: Option<CommandWindow>,
}

impl TimeBlock {
    /// Creates a block with the full skill range and no capacity.
    ///
    /// Capacity must be set via [`with_capacity`](Self::with_capacity);
    /// validation rejects zero-capacity blocks.
    pub fn new(
        id: impl Into<String>,
        day: FestivalDay,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Self {
        Self {
            id: BlockId::new(id),
            day,
            date,
            start_time,
            room: String::new(),
            location: String::new(),
            capacity_minutes: 0,
            max_students: None,
            section: SectionType::Traditional,
            min_level: SkillLevel::MIN,
            max_level: SkillLevel::MAX,
            command_window: None,
        }
    }

    /// Sets the room and location.
    pub fn with_room(mut self, room: impl Into<String>, location: impl Into<String>) -> Self {
        self.room = room.into();
        self.location = location.into();
        self
    }

    /// Sets the play-time capacity in minutes.
    pub fn with_capacity(mut self, minutes: u32) -> Self {
        self.capacity_minutes = minutes;
        self
    }

    /// Caps the number of students.
    pub fn with_max_students(mut self, max: u32) -> Self {
        self.max_students = Some(max);
        self
    }

    /// Sets the hosted section.
    pub fn with_section(mut self, section: SectionType) -> Self {
        self.section = section;
        self
    }

    /// Restricts the accepted skill range.
    pub fn with_levels(mut self, min: SkillLevel, max: SkillLevel) -> Self {
        self.min_level = min;
        self.max_level = max;
        self
    }

    /// Tags a command-day block with its window.
    pub fn with_command_window(mut self, window: CommandWindow) -> Self {
        self.command_window = Some(window);
        self
    }

    /// Whether the block's skill range contains the given level.
    pub fn accepts_level(&self, level: SkillLevel) -> bool {
        self.min_level <= level && level <= self.max_level
    }

    /// Whether the block hosts the given section at the given level.
    pub fn accepts(&self, section: SectionType, level: SkillLevel) -> bool {
        self.section == section && self.accepts_level(level)
    }

    /// The placement handed to a student scheduled into this block.
    pub fn placement(&self) -> Placement {
        Placement {
            block_id: self.id.clone(),
            day: self.day,
            start_time: self.start_time,
            room: self.room.clone(),
            location: self.location.clone(),
            date: self.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(v: u8) -> SkillLevel {
        SkillLevel::new(v).unwrap()
    }

    fn sample_block() -> TimeBlock {
        TimeBlock::new(
            "SAT-A1",
            FestivalDay::Saturday,
            NaiveDate::from_ymd_opt(2025, 3, 8).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        )
        .with_room("Room 104", "Fine Arts Center")
        .with_capacity(60)
        .with_section(SectionType::Traditional)
        .with_levels(level(4), level(6))
    }

    #[test]
    fn test_block_builder() {
        let b = sample_block();
        assert_eq!(b.id.as_str(), "SAT-A1");
        assert_eq!(b.day, FestivalDay::Saturday);
        assert_eq!(b.capacity_minutes, 60);
        assert_eq!(b.max_students, None);
        assert_eq!(b.room, "Room 104");
        assert_eq!(b.section, SectionType::Traditional);
    }

    #[test]
    fn test_accepts_level_range() {
        let b = sample_block();
        assert!(b.accepts_level(level(4)));
        assert!(b.accepts_level(level(5)));
        assert!(b.accepts_level(level(6)));
        assert!(!b.accepts_level(level(3)));
        assert!(!b.accepts_level(level(7)));
    }

    #[test]
    fn test_accepts_section_and_level() {
        let b = sample_block();
        assert!(b.accepts(SectionType::Traditional, level(5)));
        assert!(!b.accepts(SectionType::Master, level(5)));
        assert!(!b.accepts(SectionType::Traditional, level(11)));
    }

    #[test]
    fn test_placement_copies_coordinates() {
        let b = sample_block();
        let p = b.placement();
        assert_eq!(p.block_id, b.id);
        assert_eq!(p.day, FestivalDay::Saturday);
        assert_eq!(p.room, "Room 104");
        assert_eq!(p.location, "Fine Arts Center");
        assert_eq!(p.date, b.date);
        assert_eq!(p.start_time, b.start_time);
    }

    #[test]
    fn test_default_range_accepts_everything() {
        let b = TimeBlock::new(
            "X",
            FestivalDay::Sunday,
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
            NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
        );
        assert!(b.accepts_level(level(0)));
        assert!(b.accepts_level(level(11)));
    }

    #[test]
    fn test_command_window_tag() {
        let b = TimeBlock::new(
            "CMD-1",
            FestivalDay::Command,
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )
        .with_command_window(CommandWindow::Morning);
        assert_eq!(b.command_window, Some(CommandWindow::Morning));
    }
}
