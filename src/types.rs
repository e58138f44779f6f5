//! Core data types for the Laurel achievement engine
//!
//! This module defines the fundamental data structures shared across the
//! engine: user identifiers, the statistics snapshot read from the platform,
//! persisted award records, and the trigger event vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique identifier for platform users
///
/// Wraps the externally assigned user id string to avoid mixing it with
/// achievement identifiers elsewhere in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CEFR proficiency tiers, ordered from lowest to highest
///
/// Comparison is by ordinal position: `B1` is above `A2` regardless of how
/// the tiers are rendered. A user with no level set sits below `A1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LevelTier {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl LevelTier {
    pub const ALL: [LevelTier; 6] = [
        LevelTier::A1,
        LevelTier::A2,
        LevelTier::B1,
        LevelTier::B2,
        LevelTier::C1,
        LevelTier::C2,
    ];

    /// Zero-based position on the tier scale
    pub fn ordinal(&self) -> u32 {
        *self as u32
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A1" => Some(LevelTier::A1),
            "A2" => Some(LevelTier::A2),
            "B1" => Some(LevelTier::B1),
            "B2" => Some(LevelTier::B2),
            "C1" => Some(LevelTier::C1),
            "C2" => Some(LevelTier::C2),
            _ => None,
        }
    }
}

impl std::fmt::Display for LevelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LevelTier::A1 => "A1",
            LevelTier::A2 => "A2",
            LevelTier::B1 => "B1",
            LevelTier::B2 => "B2",
            LevelTier::C1 => "C1",
            LevelTier::C2 => "C2",
        };
        write!(f, "{}", s)
    }
}

/// External event kinds that prompt re-evaluation
///
/// The event-producing side of the platform reports these after persisting
/// the underlying stat change. Unknown event names are handled at the string
/// boundary: [`TriggerKind::from_event_name`] returns `None` and the caller
/// treats the event as a no-op rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    SessionCompleted,
    CustomLessonCreated,
    LevelChanged,
}

impl TriggerKind {
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "session_completed" => Some(TriggerKind::SessionCompleted),
            "custom_lesson_created" => Some(TriggerKind::CustomLessonCreated),
            "level_changed" => Some(TriggerKind::LevelChanged),
            _ => None,
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            TriggerKind::SessionCompleted => "session_completed",
            TriggerKind::CustomLessonCreated => "custom_lesson_created",
            TriggerKind::LevelChanged => "level_changed",
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

/// Snapshot of a user's accumulated practice statistics
///
/// Owned and mutated by the rest of the platform; the engine only reads it.
/// Practice time is tracked in seconds even though time-based achievements
/// are defined in minutes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStatsSnapshot {
    pub sessions_completed: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_stars: u32,
    /// Consecutive perfect-score sessions
    pub perfect_streak: u32,
    pub practice_seconds: u64,
    /// Distinct scenario ids the user has completed at least once
    pub scenarios_completed: BTreeSet<String>,
    pub lessons_authored: u32,
    pub level: Option<LevelTier>,
}

impl UserStatsSnapshot {
    /// Best streak ever reached, regardless of whether the current one has
    /// since reset to zero.
    pub fn best_streak(&self) -> u32 {
        self.current_streak.max(self.longest_streak)
    }

    pub fn practice_minutes(&self) -> u32 {
        (self.practice_seconds / 60) as u32
    }
}

/// A single awarded achievement, persisted append-only per user
///
/// Display fields are denormalized at award time so rendering a trophy case
/// never needs a catalog join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedAchievement {
    pub achievement_id: String,
    pub name: String,
    pub description: String,
    pub category: crate::catalog::AchievementCategory,
    pub icon: String,
    pub earned_at: DateTime<Utc>,
}

/// Pointer to the most recently earned achievement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestAward {
    pub achievement_id: String,
    pub earned_at: DateTime<Utc>,
}

/// Per-user summary of earned achievements
///
/// `count` always equals the cardinality of `earned_ids`; the storage layer
/// recomputes both from the earned rows inside the award transaction, so the
/// two cannot drift.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AchievementSummary {
    pub earned_ids: BTreeSet<String>,
    pub count: u32,
    pub latest: Option<LatestAward>,
}
