//! Laurel - Achievement Evaluation and Awarding Engine
//!
//! Laurel decides, from a user's accumulated practice statistics, which
//! milestone achievements have been unlocked, awards them exactly once under
//! concurrent triggers, computes partial progress for unearned achievements,
//! and retroactively backfills awards that were missed (for example when the
//! catalog grew after the user's stats already qualified).
//!
//! # Architecture
//!
//! - **Types**: ids, stats snapshot, persisted award records
//! - **Catalog**: immutable in-process achievement definitions
//! - **Evaluator**: pure criteria checks and progress arithmetic
//! - **Router**: trigger kind → candidate subset
//! - **Storage**: libsql backend with optimistic award commits
//! - **Engine**: award transactions, progress reporting, backfill
//!
//! # Example
//!
//! ```ignore
//! use laurel_core::{AchievementEngine, LaurelConfig, LibsqlStore, TriggerKind, UserId};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LaurelConfig::load()?;
//!     let store = Arc::new(LibsqlStore::new_local(&config.database.path).await?);
//!     let engine = AchievementEngine::new(store, config.awards);
//!
//!     // After the platform persists a finished session:
//!     let result = engine
//!         .award(&UserId::from("user-42"), TriggerKind::SessionCompleted)
//!         .await?;
//!     for def in result.newly_earned {
//!         println!("unlocked: {} {}", def.icon, def.name);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod router;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use catalog::{AchievementCategory, AchievementDefinition, Catalog, CounterKind, Criteria};
pub use config::{AwardConfig, DatabaseConfig, LaurelConfig};
pub use engine::{AchievementEngine, AwardResult, ProgressEntry};
pub use error::{LaurelError, Result};
pub use storage::libsql::{ConnectionMode, LibsqlStore};
pub use storage::{AchievementStore, CommitOutcome, UserView};
pub use types::{
    AchievementSummary, EarnedAchievement, LatestAward, LevelTier, TriggerKind, UserId,
    UserStatsSnapshot,
};
