//! Student (competitor) model.
//!
//! A student is one registered competitor: immutable registration
//! attributes (name, section, day preference, skill level, repertoire)
//! plus the mutable fields written later by the scheduling engine
//! (placement) and the results engine (score, command performance).
//!
//! # Identity
//!
//! Students are keyed by [`StudentId`], a SHA-256 hash of the name and
//! the registration timestamp supplied by the registration feed. The
//! feed derives the id with [`StudentId::derive`] so that score updates
//! arriving later key to the same record.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::Placement;

/// Stable identity hash for a student.
///
/// Derived from first name, last name, and the registration timestamp;
/// two registrations of the same name at different times get distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Derives the identity hash from registration data.
    ///
    /// Name components are trimmed and lowercased before hashing so that
    /// whitespace and capitalization differences in the feed do not
    /// produce divergent ids. The timestamp is hashed verbatim.
    pub fn derive(first_name: &str, last_name: &str, registered_at: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(first_name.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(last_name.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(registered_at.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps an id already derived by the registration feed.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The hex-encoded hash.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Skill level, 0 through 11.
///
/// Constructed fallibly; a value outside the range is rejected at the
/// boundary rather than carried as an unchecked integer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub struct SkillLevel(u8);

impl SkillLevel {
    /// Lowest valid level.
    pub const MIN: SkillLevel = SkillLevel(0);
    /// Highest valid level.
    pub const MAX: SkillLevel = SkillLevel(11);

    /// Creates a level, rejecting values above [`SkillLevel::MAX`].
    pub fn new(level: u8) -> Option<Self> {
        (level <= Self::MAX.0).then_some(Self(level))
    }

    /// The raw level value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Absolute distance between two levels.
    pub fn distance(self, other: SkillLevel) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl TryFrom<u8> for SkillLevel {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
            .ok_or_else(|| format!("skill level {level} is out of range 0..={}", Self::MAX))
    }
}

impl From<SkillLevel> for u8 {
    fn from(level: SkillLevel) -> u8 {
        level.0
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Competition format category a student registers under.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SectionType {
    /// Masterclass format.
    Master,
    /// Traditional judged format.
    Traditional,
    /// Performs for comments only; never scored against the rating scale.
    NonCompetitive,
}

impl SectionType {
    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Master => "Masterclass",
            Self::Traditional => "Traditional",
            Self::NonCompetitive => "Non-Competitive",
        }
    }
}

/// Requested competition day.
///
/// `Command` means the student registered for the command performance
/// session only; such students are skipped by the main scheduling pass
/// and placed by the command pass.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum DayPreference {
    Saturday,
    Sunday,
    Command,
}

impl DayPreference {
    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
            Self::Command => "Command",
        }
    }
}

/// Judged outcome of a performance.
///
/// Serialized as the operator-facing letter codes so snapshots and the
/// score feed share one vocabulary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CompetitionResult {
    /// Superior with Distinction.
    #[serde(rename = "SD")]
    SuperiorWithDistinction,
    /// Superior.
    #[serde(rename = "S")]
    Superior,
    /// Excellent.
    #[serde(rename = "E")]
    Excellent,
    /// Not applicable (e.g. judged outside the rating scale).
    #[serde(rename = "NA")]
    NotApplicable,
    /// Non-competitive entry.
    #[serde(rename = "NC")]
    NonCompetitive,
    /// Withdrawn before performing.
    #[serde(rename = "W")]
    Withdrawn,
}

impl CompetitionResult {
    /// The letter code used on score sheets.
    pub fn code(self) -> &'static str {
        match self {
            Self::SuperiorWithDistinction => "SD",
            Self::Superior => "S",
            Self::Excellent => "E",
            Self::NotApplicable => "NA",
            Self::NonCompetitive => "NC",
            Self::Withdrawn => "W",
        }
    }

    /// Whether this result qualifies the student for the command performance.
    pub fn is_command_eligible(self) -> bool {
        matches!(self, Self::SuperiorWithDistinction | Self::Superior)
    }

    /// Whether this result qualifies the student for the trophy list.
    pub fn is_trophy_eligible(self) -> bool {
        matches!(self, Self::SuperiorWithDistinction | Self::Superior)
    }
}

impl fmt::Display for CompetitionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Preferred slot of day for a command performance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CommandWindow {
    Morning,
    Afternoon,
    Evening,
}

/// One repertoire entry: a song title and its composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    pub composer: String,
}

impl Song {
    /// Creates a song entry.
    pub fn new(title: impl Into<String>, composer: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            composer: composer.into(),
        }
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title, self.composer)
    }
}

/// Attempt to place an already-placed student.
#[derive(Debug, Clone, thiserror::Error)]
#[error("student {0} is already scheduled")]
pub struct AlreadyScheduled(pub StudentId);

/// Rejected command-performance song selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandSongError {
    /// The student's result is not in the command-eligible set.
    #[error("student's result does not qualify for the command performance")]
    NotEligible,
    /// The index does not point at a registered song.
    #[error("song index {index} is out of range for {song_count} registered songs")]
    IndexOutOfRange { index: usize, song_count: usize },
}

/// A registered competitor.
///
/// Registration attributes are set at construction (via the builder) and
/// never change; scheduling and scoring fields are written later through
/// the checked setters. The placement invariant (not yet scheduled, or
/// scheduled to exactly one time block) holds structurally because the
/// placement is a single `Option`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    id: StudentId,
    first_name: String,
    last_name: String,
    songs: Vec<Song>,
    section: SectionType,
    day_preference: DayPreference,
    skill_level: SkillLevel,
    play_time_minutes: u32,
    teacher_name: String,
    teacher_email: String,
    parent_email: String,
    birthdate: Option<NaiveDate>,
    placement: Option<Placement>,
    competition_result: Option<CompetitionResult>,
    command_song: Option<Song>,
    preferred_command_time: Option<CommandWindow>,
    command_placement: Option<Placement>,
}

impl Student {
    /// Creates a student with the required registration attributes.
    pub fn new(
        id: StudentId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        section: SectionType,
        day_preference: DayPreference,
        skill_level: SkillLevel,
        play_time_minutes: u32,
    ) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            songs: Vec::new(),
            section,
            day_preference,
            skill_level,
            play_time_minutes,
            teacher_name: String::new(),
            teacher_email: String::new(),
            parent_email: String::new(),
            birthdate: None,
            placement: None,
            competition_result: None,
            command_song: None,
            preferred_command_time: None,
            command_placement: None,
        }
    }

    /// Appends a song to the repertoire (order is preserved).
    pub fn with_song(mut self, title: impl Into<String>, composer: impl Into<String>) -> Self {
        self.songs.push(Song::new(title, composer));
        self
    }

    /// Sets the registering teacher.
    pub fn with_teacher(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.teacher_name = name.into();
        self.teacher_email = email.into();
        self
    }

    /// Sets the parent contact email.
    pub fn with_parent_email(mut self, email: impl Into<String>) -> Self {
        self.parent_email = email.into();
        self
    }

    /// Sets the birthdate.
    pub fn with_birthdate(mut self, birthdate: NaiveDate) -> Self {
        self.birthdate = Some(birthdate);
        self
    }

    /// Sets the preferred command-performance window at registration time.
    pub fn with_preferred_command_time(mut self, window: CommandWindow) -> Self {
        self.preferred_command_time = Some(window);
        self
    }

    pub fn id(&self) -> &StudentId {
        &self.id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// "First Last", as registered.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Title-cased name for operator-facing output.
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            title_case(&self.first_name),
            title_case(&self.last_name)
        )
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn section(&self) -> SectionType {
        self.section
    }

    pub fn day_preference(&self) -> DayPreference {
        self.day_preference
    }

    pub fn skill_level(&self) -> SkillLevel {
        self.skill_level
    }

    pub fn play_time_minutes(&self) -> u32 {
        self.play_time_minutes
    }

    pub fn teacher_name(&self) -> &str {
        &self.teacher_name
    }

    pub fn teacher_email(&self) -> &str {
        &self.teacher_email
    }

    pub fn parent_email(&self) -> &str {
        &self.parent_email
    }

    pub fn birthdate(&self) -> Option<NaiveDate> {
        self.birthdate
    }

    /// Age in whole years on the given date.
    ///
    /// Pure: the caller supplies "today", and nothing is cached. The year
    /// difference decrements when today's month precedes the birth month,
    /// or is the same month with today's day before the birth day.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let birth = self.birthdate?;
        let mut age = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        Some(age.max(0) as u32)
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    pub fn is_scheduled(&self) -> bool {
        self.placement.is_some()
    }

    /// Records the main-schedule placement. Set exactly once.
    pub fn assign(&mut self, placement: Placement) -> Result<(), AlreadyScheduled> {
        if self.placement.is_some() {
            return Err(AlreadyScheduled(self.id.clone()));
        }
        self.placement = Some(placement);
        Ok(())
    }

    pub fn result(&self) -> Option<CompetitionResult> {
        self.competition_result
    }

    /// Records the judged result.
    ///
    /// Moving to a result outside the command-eligible set clears any
    /// previously selected command song, keeping the invariant that
    /// command fields exist only for eligible students.
    pub fn set_result(&mut self, result: CompetitionResult) {
        self.competition_result = Some(result);
        if !result.is_command_eligible() {
            self.command_song = None;
        }
    }

    pub fn command_song(&self) -> Option<&Song> {
        self.command_song.as_ref()
    }

    /// Selects the command-performance song by index into the repertoire.
    ///
    /// Resolved to a concrete [`Song`] immediately, so later edits to the
    /// repertoire cannot silently repoint the selection. Requires a
    /// command-eligible result.
    pub fn select_command_song(&mut self, index: usize) -> Result<(), CommandSongError> {
        if !self.competition_result.is_some_and(CompetitionResult::is_command_eligible) {
            return Err(CommandSongError::NotEligible);
        }
        let song = self
            .songs
            .get(index)
            .ok_or(CommandSongError::IndexOutOfRange {
                index,
                song_count: self.songs.len(),
            })?;
        self.command_song = Some(song.clone());
        Ok(())
    }

    pub fn preferred_command_time(&self) -> Option<CommandWindow> {
        self.preferred_command_time
    }

    pub fn set_preferred_command_time(&mut self, window: CommandWindow) {
        self.preferred_command_time = Some(window);
    }

    pub fn command_placement(&self) -> Option<&Placement> {
        self.command_placement.as_ref()
    }

    /// Records the command-session placement. Set exactly once.
    pub fn assign_command(&mut self, placement: Placement) -> Result<(), AlreadyScheduled> {
        if self.command_placement.is_some() {
            return Err(AlreadyScheduled(self.id.clone()));
        }
        self.command_placement = Some(placement);
        Ok(())
    }

    /// One-sentence performance notice for the notification email.
    ///
    /// Songs are joined with the usual list conjunction: "A by B" for one
    /// song, "A by B and C by D" for two, "A by B, C by D, and E by F"
    /// for three or more. Returns `None` until the student is scheduled.
    pub fn notification_sentence(&self) -> Option<String> {
        let placement = self.placement.as_ref()?;
        Some(format!(
            "{} will be playing {} on {} ({}) at {} in {}.",
            self.display_name(),
            join_songs(&self.songs),
            placement.day.label(),
            placement.date,
            placement.start_time.format("%-I:%M %p"),
            placement.room,
        ))
    }

    /// Structured summary for tabular display and document generation.
    pub fn summary(&self) -> StudentSummary {
        StudentSummary {
            name: self.display_name(),
            teacher: self.teacher_name.clone(),
            section: self.section,
            skill_level: self.skill_level,
            play_time_minutes: self.play_time_minutes,
            songs: self.songs.clone(),
        }
    }
}

/// Per-student summary row for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub name: String,
    pub teacher: String,
    pub section: SectionType,
    pub skill_level: SkillLevel,
    pub play_time_minutes: u32,
    pub songs: Vec<Song>,
}

/// Joins songs with comma/conjunction handling for 1, 2, or more entries.
fn join_songs(songs: &[Song]) -> String {
    match songs {
        [] => String::new(),
        [only] => only.to_string(),
        [first, second] => format!("{first} and {second}"),
        [head @ .., last] => {
            let mut joined = String::new();
            for song in head {
                joined.push_str(&song.to_string());
                joined.push_str(", ");
            }
            joined.push_str("and ");
            joined.push_str(&last.to_string());
            joined
        }
    }
}

/// Uppercases the first letter of each whitespace-separated word.
fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
