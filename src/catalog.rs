//! Achievement catalog: definitions, criteria, and grouped accessors
//!
//! The catalog is compiled into the binary and loaded once into an immutable
//! in-memory structure. Nothing here is ever queried per-request from the
//! database; runtime code only iterates and looks up. Validation happens at
//! first load and is fatal; an inconsistent catalog must never reach
//! request handling.
//!
//! Identifiers are stable for the lifetime of the product. A criterion is
//! only ever tightened by shipping a new identifier, never by editing an
//! existing one, because earned rows reference ids forever.

use crate::error::{LaurelError, Result};
use crate::types::LevelTier;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Display category an achievement belongs to
///
/// Declaration order is display order: consistency, excellence, time,
/// explorer, level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    Consistency,
    Excellence,
    Time,
    Explorer,
    Level,
}

impl AchievementCategory {
    pub const ALL: [AchievementCategory; 5] = [
        AchievementCategory::Consistency,
        AchievementCategory::Excellence,
        AchievementCategory::Time,
        AchievementCategory::Explorer,
        AchievementCategory::Level,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementCategory::Consistency => "consistency",
            AchievementCategory::Excellence => "excellence",
            AchievementCategory::Time => "time",
            AchievementCategory::Explorer => "explorer",
            AchievementCategory::Level => "level",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "consistency" => Some(AchievementCategory::Consistency),
            "excellence" => Some(AchievementCategory::Excellence),
            "time" => Some(AchievementCategory::Time),
            "explorer" => Some(AchievementCategory::Explorer),
            "level" => Some(AchievementCategory::Level),
            _ => None,
        }
    }
}

impl std::fmt::Display for AchievementCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counter-backed criterion kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    SessionsCompleted,
    /// Streak criteria credit the best streak ever reached, so a lapsed
    /// streak never retracts a milestone the user once hit.
    StreakDays,
    TotalStars,
    PerfectSessions,
    PracticeMinutes,
    ScenariosCompleted,
    LessonsAuthored,
}

/// The rule that determines when an achievement is met
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Criteria {
    /// A counter reaching an integer threshold
    Count { kind: CounterKind, threshold: u32 },
    /// A CEFR tier reached, compared by ordinal position
    LevelReached { tier: LevelTier },
}

/// One catalog entry: display metadata plus award criteria
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementDefinition {
    /// Globally unique, stable identifier
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: AchievementCategory,
    /// Position within the category for display and tie-breaking
    pub sort_order: u32,
    pub icon: &'static str,
    pub criteria: Criteria,
}

/// Immutable, validated collection of achievement definitions
///
/// Iteration order is category order, then sort order within category.
pub struct Catalog {
    definitions: Vec<AchievementDefinition>,
    by_id: HashMap<&'static str, usize>,
}

impl Catalog {
    /// Build a catalog from raw definitions, validating integrity
    ///
    /// Fails on empty or duplicate ids and on zero thresholds (progress
    /// targets must be at least 1).
    pub fn new(mut definitions: Vec<AchievementDefinition>) -> Result<Self> {
        definitions.sort_by_key(|d| (d.category, d.sort_order, d.id));

        let mut by_id = HashMap::with_capacity(definitions.len());
        for (idx, def) in definitions.iter().enumerate() {
            if def.id.is_empty() {
                return Err(LaurelError::Catalog(format!(
                    "achievement '{}' has an empty id",
                    def.name
                )));
            }
            if by_id.insert(def.id, idx).is_some() {
                return Err(LaurelError::Catalog(format!(
                    "duplicate achievement id '{}'",
                    def.id
                )));
            }
            if let Criteria::Count { threshold, .. } = def.criteria {
                if threshold == 0 {
                    return Err(LaurelError::Catalog(format!(
                        "achievement '{}' has a zero threshold",
                        def.id
                    )));
                }
            }
        }

        Ok(Self { definitions, by_id })
    }

    /// The catalog shipped with the platform
    ///
    /// Validated on first access; an invalid built-in catalog aborts the
    /// process before any request is served.
    pub fn builtin() -> &'static Catalog {
        static BUILTIN: Lazy<Catalog> = Lazy::new(|| {
            Catalog::new(builtin_definitions()).expect("built-in achievement catalog is invalid")
        });
        &BUILTIN
    }

    /// All definitions in display order
    pub fn iter(&self) -> impl Iterator<Item = &AchievementDefinition> {
        self.definitions.iter()
    }

    pub fn get(&self, id: &str) -> Option<&AchievementDefinition> {
        self.by_id.get(id).map(|&idx| &self.definitions[idx])
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions grouped by category, ordered within each group
    pub fn by_category(&self) -> BTreeMap<AchievementCategory, Vec<&AchievementDefinition>> {
        let mut grouped: BTreeMap<AchievementCategory, Vec<&AchievementDefinition>> =
            BTreeMap::new();
        for def in &self.definitions {
            grouped.entry(def.category).or_default().push(def);
        }
        grouped
    }
}

fn count(kind: CounterKind, threshold: u32) -> Criteria {
    Criteria::Count { kind, threshold }
}

fn builtin_definitions() -> Vec<AchievementDefinition> {
    use AchievementCategory::*;
    use CounterKind::*;

    let def = |id, name, description, category, sort_order, icon, criteria| AchievementDefinition {
        id,
        name,
        description,
        category,
        sort_order,
        icon,
        criteria,
    };

    vec![
        // Consistency: showing up, and keeping the habit alive
        def(
            "first_session",
            "First Steps",
            "Complete your first practice session",
            Consistency,
            1,
            "🌱",
            count(SessionsCompleted, 1),
        ),
        def(
            "sessions_10",
            "Getting Into It",
            "Complete 10 practice sessions",
            Consistency,
            2,
            "👟",
            count(SessionsCompleted, 10),
        ),
        def(
            "sessions_50",
            "Dedicated Learner",
            "Complete 50 practice sessions",
            Consistency,
            3,
            "📚",
            count(SessionsCompleted, 50),
        ),
        def(
            "sessions_100",
            "Century Club",
            "Complete 100 practice sessions",
            Consistency,
            4,
            "💯",
            count(SessionsCompleted, 100),
        ),
        def(
            "streak_3",
            "Three-Day Spark",
            "Practice 3 days in a row",
            Consistency,
            5,
            "✨",
            count(StreakDays, 3),
        ),
        def(
            "streak_7",
            "Week-Long Streak",
            "Practice 7 days in a row",
            Consistency,
            6,
            "🔥",
            count(StreakDays, 7),
        ),
        def(
            "streak_30",
            "Monthly Habit",
            "Practice 30 days in a row",
            Consistency,
            7,
            "🗓️",
            count(StreakDays, 30),
        ),
        // Excellence: quality of practice, not just quantity
        def(
            "stars_50",
            "Rising Star",
            "Earn 50 stars across all sessions",
            Excellence,
            1,
            "⭐",
            count(TotalStars, 50),
        ),
        def(
            "stars_250",
            "Star Collector",
            "Earn 250 stars across all sessions",
            Excellence,
            2,
            "🌟",
            count(TotalStars, 250),
        ),
        def(
            "stars_1000",
            "Star Champion",
            "Earn 1000 stars across all sessions",
            Excellence,
            3,
            "🏆",
            count(TotalStars, 1000),
        ),
        def(
            "perfect_3",
            "Hat Trick",
            "Score a perfect session 3 times in a row",
            Excellence,
            4,
            "🎩",
            count(PerfectSessions, 3),
        ),
        def(
            "perfect_10",
            "Perfectionist",
            "Score a perfect session 10 times in a row",
            Excellence,
            5,
            "💎",
            count(PerfectSessions, 10),
        ),
        // Time: accumulated practice minutes
        def(
            "minutes_60",
            "First Hour",
            "Practice for a total of one hour",
            Time,
            1,
            "⏱️",
            count(PracticeMinutes, 60),
        ),
        def(
            "minutes_600",
            "Ten Hours In",
            "Practice for a total of ten hours",
            Time,
            2,
            "⏳",
            count(PracticeMinutes, 600),
        ),
        def(
            "minutes_3000",
            "Marathon Learner",
            "Practice for a total of fifty hours",
            Time,
            3,
            "🏃",
            count(PracticeMinutes, 3000),
        ),
        // Explorer: breadth of scenarios and authored content
        def(
            "scenarios_5",
            "Curious Explorer",
            "Try 5 different conversation scenarios",
            Explorer,
            1,
            "🧭",
            count(ScenariosCompleted, 5),
        ),
        def(
            "scenarios_15",
            "Globetrotter",
            "Try 15 different conversation scenarios",
            Explorer,
            2,
            "🌍",
            count(ScenariosCompleted, 15),
        ),
        def(
            "lessons_1",
            "Lesson Author",
            "Create your first custom lesson",
            Explorer,
            3,
            "✏️",
            count(LessonsAuthored, 1),
        ),
        def(
            "lessons_5",
            "Curriculum Builder",
            "Create 5 custom lessons",
            Explorer,
            4,
            "🧱",
            count(LessonsAuthored, 5),
        ),
        // Level: CEFR milestones
        def(
            "level_a2",
            "Elementary Unlocked",
            "Reach level A2",
            Level,
            1,
            "🥉",
            Criteria::LevelReached { tier: LevelTier::A2 },
        ),
        def(
            "level_b1",
            "Conversational",
            "Reach level B1",
            Level,
            2,
            "🥈",
            Criteria::LevelReached { tier: LevelTier::B1 },
        ),
        def(
            "level_b2",
            "Fluent Footing",
            "Reach level B2",
            Level,
            3,
            "🥇",
            Criteria::LevelReached { tier: LevelTier::B2 },
        ),
        def(
            "level_c1",
            "Advanced Speaker",
            "Reach level C1",
            Level,
            4,
            "🎖️",
            Criteria::LevelReached { tier: LevelTier::C1 },
        ),
        def(
            "level_c2",
            "Mastery",
            "Reach level C2",
            Level,
            5,
            "👑",
            Criteria::LevelReached { tier: LevelTier::C2 },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin();
        assert!(!catalog.is_empty());
        assert_eq!(catalog.len(), 24);
    }

    #[test]
    fn test_builtin_ids_are_unique() {
        let catalog = Catalog::builtin();
        let mut seen = std::collections::HashSet::new();
        for def in catalog.iter() {
            assert!(seen.insert(def.id), "duplicate id {}", def.id);
        }
    }

    #[test]
    fn test_iteration_is_category_then_sort_order() {
        let catalog = Catalog::builtin();
        let keys: Vec<_> = catalog.iter().map(|d| (d.category, d.sort_order)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_by_category_covers_every_definition() {
        let catalog = Catalog::builtin();
        let grouped = catalog.by_category();
        let total: usize = grouped.values().map(|v| v.len()).sum();
        assert_eq!(total, catalog.len());
        assert_eq!(grouped[&AchievementCategory::Level].len(), 5);
    }

    #[test]
    fn test_every_counter_kind_has_a_definition() {
        use CounterKind::*;
        let catalog = Catalog::builtin();
        for kind in [
            SessionsCompleted,
            StreakDays,
            TotalStars,
            PerfectSessions,
            PracticeMinutes,
            ScenariosCompleted,
            LessonsAuthored,
        ] {
            assert!(
                catalog
                    .iter()
                    .any(|d| matches!(d.criteria, Criteria::Count { kind: k, .. } if k == kind)),
                "no definition for {:?}",
                kind
            );
        }
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let defs = vec![
            AchievementDefinition {
                id: "dup",
                name: "One",
                description: "",
                category: AchievementCategory::Time,
                sort_order: 1,
                icon: "⏱️",
                criteria: count(CounterKind::PracticeMinutes, 60),
            },
            AchievementDefinition {
                id: "dup",
                name: "Two",
                description: "",
                category: AchievementCategory::Time,
                sort_order: 2,
                icon: "⏳",
                criteria: count(CounterKind::PracticeMinutes, 600),
            },
        ];
        assert!(matches!(Catalog::new(defs), Err(LaurelError::Catalog(_))));
    }

    #[test]
    fn test_zero_threshold_is_rejected() {
        let defs = vec![AchievementDefinition {
            id: "zero",
            name: "Zero",
            description: "",
            category: AchievementCategory::Time,
            sort_order: 1,
            icon: "0️⃣",
            criteria: count(CounterKind::PracticeMinutes, 0),
        }];
        assert!(matches!(Catalog::new(defs), Err(LaurelError::Catalog(_))));
    }

    #[test]
    fn test_lookup_by_id() {
        let catalog = Catalog::builtin();
        let def = catalog.get("streak_7").unwrap();
        assert_eq!(def.category, AchievementCategory::Consistency);
        assert!(matches!(
            def.criteria,
            Criteria::Count {
                kind: CounterKind::StreakDays,
                threshold: 7
            }
        ));
        assert!(catalog.get("no_such_badge").is_none());
    }
}
