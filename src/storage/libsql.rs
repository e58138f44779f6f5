//! LibSQL storage backend
//!
//! Persists user statistics, earned achievements, and per-user summaries.
//! The award commit runs inside a single transaction guarded by an
//! optimistic version check on the summary row; the `(user_id,
//! achievement_id)` primary key on earned rows is the structural backstop
//! that an achievement is stored at most once per user.

use crate::catalog::AchievementCategory;
use crate::error::{LaurelError, Result};
use crate::storage::{AchievementStore, CommitOutcome, UserView};
use crate::types::{
    AchievementSummary, EarnedAchievement, LatestAward, UserId, UserStatsSnapshot,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Builder, Connection};
use std::collections::BTreeSet;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Embedded schema, applied idempotently at startup
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user_stats (
    user_id TEXT PRIMARY KEY NOT NULL,
    sessions_completed INTEGER NOT NULL DEFAULT 0,
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    total_stars INTEGER NOT NULL DEFAULT 0,
    perfect_streak INTEGER NOT NULL DEFAULT 0,
    practice_seconds INTEGER NOT NULL DEFAULT 0,
    scenarios_completed TEXT NOT NULL DEFAULT '[]',
    lessons_authored INTEGER NOT NULL DEFAULT 0,
    level TEXT,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS achievement_summaries (
    user_id TEXT PRIMARY KEY NOT NULL,
    earned_ids TEXT NOT NULL DEFAULT '[]',
    earned_count INTEGER NOT NULL DEFAULT 0,
    latest_id TEXT,
    latest_earned_at TEXT,
    version INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS earned_achievements (
    user_id TEXT NOT NULL,
    achievement_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    icon TEXT NOT NULL,
    earned_at TEXT NOT NULL,
    PRIMARY KEY (user_id, achievement_id)
);

CREATE INDEX IF NOT EXISTS idx_earned_by_user_time
    ON earned_achievements(user_id, earned_at);
"#;

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// In-memory database (for testing)
    InMemory,
}

/// LibSQL storage backend
///
/// All operations run on one connection behind an async mutex, so
/// transactions never interleave on the handle. Concurrent award attempts
/// are still detected through the summary version check rather than lock
/// ordering, and the mutex also keeps an in-memory database coherent, where
/// every connection must be the same connection.
pub struct LibsqlStore {
    conn: Connection,
    op_lock: Mutex<()>,
}

impl LibsqlStore {
    /// Open (and if requested, create) a database and apply the schema
    pub async fn new_with_mode(mode: ConnectionMode, create_if_missing: bool) -> Result<Self> {
        info!("Connecting to LibSQL database: {:?}", mode);

        let db = match &mode {
            ConnectionMode::Local(path) => {
                let file = std::path::Path::new(path);
                if !file.exists() && !create_if_missing {
                    return Err(LaurelError::Database(format!(
                        "Database file not found at '{}'. Run 'laurel init' first.",
                        path
                    )));
                }
                if create_if_missing {
                    if let Some(parent) = file.parent() {
                        if !parent.as_os_str().is_empty() {
                            std::fs::create_dir_all(parent).map_err(|e| {
                                LaurelError::Database(format!(
                                    "Failed to create database directory {}: {}",
                                    parent.display(),
                                    e
                                ))
                            })?;
                        }
                    }
                }
                Builder::new_local(path).build().await.map_err(|e| {
                    LaurelError::Database(format!("Failed to open local database: {}", e))
                })?
            }
            ConnectionMode::InMemory => {
                Builder::new_local(":memory:").build().await.map_err(|e| {
                    LaurelError::Database(format!("Failed to create in-memory database: {}", e))
                })?
            }
        };

        let conn = db
            .connect()
            .map_err(|e| LaurelError::Database(format!("Failed to get connection: {}", e)))?;

        let store = Self {
            conn,
            op_lock: Mutex::new(()),
        };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open a local database file, creating it if missing
    pub async fn new_local(path: &str) -> Result<Self> {
        Self::new_with_mode(ConnectionMode::Local(path.to_string()), true).await
    }

    /// Open a fresh in-memory database
    pub async fn new_in_memory() -> Result<Self> {
        Self::new_with_mode(ConnectionMode::InMemory, true).await
    }

    async fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA).await?;
        debug!("Achievement schema applied");
        Ok(())
    }

    /// Ingestion-side write: create or replace a user's stats snapshot
    ///
    /// The engine itself never calls this; the platform's stat pipeline
    /// (and tests) own stats mutation.
    pub async fn upsert_stats(&self, user: &UserId, stats: &UserStatsSnapshot) -> Result<()> {
        let _guard = self.op_lock.lock().await;
        self.conn
            .execute(
                r#"
                INSERT INTO user_stats (
                    user_id, sessions_completed, current_streak, longest_streak,
                    total_stars, perfect_streak, practice_seconds,
                    scenarios_completed, lessons_authored, level, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(user_id) DO UPDATE SET
                    sessions_completed = excluded.sessions_completed,
                    current_streak = excluded.current_streak,
                    longest_streak = excluded.longest_streak,
                    total_stars = excluded.total_stars,
                    perfect_streak = excluded.perfect_streak,
                    practice_seconds = excluded.practice_seconds,
                    scenarios_completed = excluded.scenarios_completed,
                    lessons_authored = excluded.lessons_authored,
                    level = excluded.level,
                    updated_at = excluded.updated_at
                "#,
                params![
                    user.as_str(),
                    stats.sessions_completed as i64,
                    stats.current_streak as i64,
                    stats.longest_streak as i64,
                    stats.total_stars as i64,
                    stats.perfect_streak as i64,
                    stats.practice_seconds as i64,
                    serde_json::to_string(&stats.scenarios_completed)?,
                    stats.lessons_authored as i64,
                    stats.level.map(|l| l.to_string()),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await?;
        Ok(())
    }

    fn row_to_stats(row: &libsql::Row) -> Result<UserStatsSnapshot> {
        let sessions_completed: i64 = row.get(0)?;
        let current_streak: i64 = row.get(1)?;
        let longest_streak: i64 = row.get(2)?;
        let total_stars: i64 = row.get(3)?;
        let perfect_streak: i64 = row.get(4)?;
        let practice_seconds: i64 = row.get(5)?;
        let scenarios_json: String = row.get(6)?;
        let lessons_authored: i64 = row.get(7)?;
        let level: Option<String> = row.get(8)?;

        Ok(UserStatsSnapshot {
            sessions_completed: sessions_completed as u32,
            current_streak: current_streak as u32,
            longest_streak: longest_streak as u32,
            total_stars: total_stars as u32,
            perfect_streak: perfect_streak as u32,
            practice_seconds: practice_seconds as u64,
            scenarios_completed: serde_json::from_str(&scenarios_json)?,
            lessons_authored: lessons_authored as u32,
            level: level.as_deref().and_then(crate::types::LevelTier::parse),
        })
    }

    fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| LaurelError::Other(format!("Invalid timestamp '{}': {}", raw, e)))
    }

    /// Busy/locked failures are contention, not corruption; callers treat
    /// them like a version conflict and retry from a fresh read.
    fn is_contention(err: &libsql::Error) -> bool {
        let msg = err.to_string().to_lowercase();
        msg.contains("busy") || msg.contains("locked")
    }

    /// Split a statement result into value / contention / hard failure
    #[allow(clippy::result_unit_err)]
    fn step<T>(result: std::result::Result<T, libsql::Error>) -> Result<std::result::Result<T, ()>> {
        match result {
            Ok(value) => Ok(Ok(value)),
            Err(e) if Self::is_contention(&e) => Ok(Err(())),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl AchievementStore for LibsqlStore {
    async fn load_user_view(&self, user: &UserId) -> Result<Option<UserView>> {
        debug!("Loading achievement view for user {}", user);

        let _guard = self.op_lock.lock().await;
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT sessions_completed, current_streak, longest_streak,
                       total_stars, perfect_streak, practice_seconds,
                       scenarios_completed, lessons_authored, level
                FROM user_stats WHERE user_id = ?
                "#,
                params![user.as_str()],
            )
            .await?;

        let stats = match rows.next().await? {
            Some(row) => Self::row_to_stats(&row)?,
            None => return Ok(None),
        };

        let mut rows = self
            .conn
            .query(
                r#"
                SELECT earned_ids, earned_count, latest_id, latest_earned_at, version
                FROM achievement_summaries WHERE user_id = ?
                "#,
                params![user.as_str()],
            )
            .await?;

        let (summary, version) = match rows.next().await? {
            Some(row) => {
                let earned_json: String = row.get(0)?;
                let earned_count: i64 = row.get(1)?;
                let latest_id: Option<String> = row.get(2)?;
                let latest_earned_at: Option<String> = row.get(3)?;
                let version: i64 = row.get(4)?;

                let latest = match (latest_id, latest_earned_at) {
                    (Some(achievement_id), Some(raw)) => Some(LatestAward {
                        achievement_id,
                        earned_at: Self::parse_timestamp(&raw)?,
                    }),
                    _ => None,
                };

                let summary = AchievementSummary {
                    earned_ids: serde_json::from_str(&earned_json)?,
                    count: earned_count as u32,
                    latest,
                };
                (summary, version)
            }
            // Summary is created lazily on first award.
            None => (AchievementSummary::default(), 0),
        };

        Ok(Some(UserView {
            stats,
            summary,
            version,
        }))
    }

    async fn list_earned(&self, user: &UserId) -> Result<Vec<EarnedAchievement>> {
        let _guard = self.op_lock.lock().await;
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT achievement_id, name, description, category, icon, earned_at
                FROM earned_achievements
                WHERE user_id = ?
                ORDER BY earned_at ASC, achievement_id ASC
                "#,
                params![user.as_str()],
            )
            .await?;

        let mut earned = Vec::new();
        while let Some(row) = rows.next().await? {
            let achievement_id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let description: String = row.get(2)?;
            let category_str: String = row.get(3)?;
            let icon: String = row.get(4)?;
            let earned_at_str: String = row.get(5)?;

            let category = match AchievementCategory::parse(&category_str) {
                Some(category) => category,
                None => {
                    warn!(
                        "Skipping earned row '{}' with unknown category '{}'",
                        achievement_id, category_str
                    );
                    continue;
                }
            };

            earned.push(EarnedAchievement {
                achievement_id,
                name,
                description,
                category,
                icon,
                earned_at: Self::parse_timestamp(&earned_at_str)?,
            });
        }

        Ok(earned)
    }

    async fn commit_awards(
        &self,
        user: &UserId,
        expected_version: i64,
        staged: &[EarnedAchievement],
    ) -> Result<CommitOutcome> {
        if staged.is_empty() {
            return Ok(CommitOutcome::Committed);
        }

        // Held across the whole transaction so no other statement can land
        // on the connection mid-flight.
        let _guard = self.op_lock.lock().await;
        let tx = match self.conn.transaction().await {
            Ok(tx) => tx,
            Err(e) if Self::is_contention(&e) => return Ok(CommitOutcome::Conflict),
            Err(e) => return Err(e.into()),
        };

        // Version check: the summary must not have moved since the caller
        // read its view.
        let mut rows = match Self::step(
            tx.query(
                "SELECT version FROM achievement_summaries WHERE user_id = ?",
                params![user.as_str()],
            )
            .await,
        )? {
            Ok(rows) => rows,
            Err(()) => {
                let _ = tx.rollback().await;
                return Ok(CommitOutcome::Conflict);
            }
        };
        let current_version: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        if current_version != expected_version {
            debug!(
                "Award conflict for user {}: version {} != expected {}",
                user, current_version, expected_version
            );
            let _ = tx.rollback().await;
            return Ok(CommitOutcome::Conflict);
        }

        for award in staged {
            let result = tx
                .execute(
                    r#"
                    INSERT INTO earned_achievements (
                        user_id, achievement_id, name, description,
                        category, icon, earned_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                    params![
                        user.as_str(),
                        award.achievement_id.clone(),
                        award.name.clone(),
                        award.description.clone(),
                        award.category.as_str(),
                        award.icon.clone(),
                        award.earned_at.to_rfc3339(),
                    ],
                )
                .await;
            match result {
                Ok(_) => {}
                // A unique-key hit means a concurrent award slipped in.
                Err(e)
                    if Self::is_contention(&e)
                        || e.to_string().to_lowercase().contains("unique") =>
                {
                    let _ = tx.rollback().await;
                    return Ok(CommitOutcome::Conflict);
                }
                Err(e) => {
                    let _ = tx.rollback().await;
                    return Err(e.into());
                }
            }
        }

        // Recompute the earned set and count from the rows themselves, so
        // the summary cannot drift from the append-only record.
        let mut rows = match Self::step(
            tx.query(
                "SELECT achievement_id FROM earned_achievements WHERE user_id = ?",
                params![user.as_str()],
            )
            .await,
        )? {
            Ok(rows) => rows,
            Err(()) => {
                let _ = tx.rollback().await;
                return Ok(CommitOutcome::Conflict);
            }
        };
        let mut earned_ids: BTreeSet<String> = BTreeSet::new();
        while let Some(row) = rows.next().await? {
            earned_ids.insert(row.get::<String>(0)?);
        }

        let latest = &staged[staged.len() - 1];
        let upsert = tx
            .execute(
                r#"
                INSERT INTO achievement_summaries (
                    user_id, earned_ids, earned_count, latest_id, latest_earned_at, version
                ) VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(user_id) DO UPDATE SET
                    earned_ids = excluded.earned_ids,
                    earned_count = excluded.earned_count,
                    latest_id = excluded.latest_id,
                    latest_earned_at = excluded.latest_earned_at,
                    version = excluded.version
                "#,
                params![
                    user.as_str(),
                    serde_json::to_string(&earned_ids)?,
                    earned_ids.len() as i64,
                    latest.achievement_id.clone(),
                    latest.earned_at.to_rfc3339(),
                    expected_version + 1,
                ],
            )
            .await;
        if let Err(()) = Self::step(upsert)? {
            let _ = tx.rollback().await;
            return Ok(CommitOutcome::Conflict);
        }

        match tx.commit().await {
            Ok(()) => {
                info!(
                    "Awarded {} achievement(s) to user {}",
                    staged.len(),
                    user
                );
                Ok(CommitOutcome::Committed)
            }
            Err(e) if Self::is_contention(&e) => Ok(CommitOutcome::Conflict),
            Err(e) => Err(e.into()),
        }
    }
}
