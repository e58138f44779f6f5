//! Trigger routing: which achievements are worth re-checking for an event
//!
//! Evaluating the full catalog on every event would be correct but wasteful;
//! each trigger kind narrows to the definitions its underlying stat change
//! can actually affect. The retroactive backfill path deliberately bypasses
//! this and evaluates catalog-wide.

use crate::catalog::{AchievementCategory, AchievementDefinition, Catalog, CounterKind, Criteria};
use crate::types::TriggerKind;

/// Catalog entries worth (re-)evaluating for a trigger, in catalog order
pub fn candidates<'a>(catalog: &'a Catalog, trigger: TriggerKind) -> Vec<&'a AchievementDefinition> {
    catalog
        .iter()
        .filter(|def| routes_to(def, trigger))
        .collect()
}

fn routes_to(def: &AchievementDefinition, trigger: TriggerKind) -> bool {
    let is_lesson_criteria = matches!(
        def.criteria,
        Criteria::Count {
            kind: CounterKind::LessonsAuthored,
            ..
        }
    );

    match trigger {
        // A session can move every counter except authored lessons, which
        // only change on their own trigger.
        TriggerKind::SessionCompleted => {
            def.category != AchievementCategory::Level && !is_lesson_criteria
        }
        TriggerKind::CustomLessonCreated => is_lesson_criteria,
        TriggerKind::LevelChanged => def.category == AchievementCategory::Level,
    }
}
