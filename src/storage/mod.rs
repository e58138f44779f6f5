//! Storage layer for the Laurel achievement engine
//!
//! Provides the abstraction the engine awards through, plus the libsql
//! implementation. Stats are read-only here except for the ingestion-side
//! `upsert_stats` on the concrete backend; award records and summaries are
//! only ever written through [`AchievementStore::commit_awards`].

pub mod libsql;
pub mod test_utils;

mod libsql_award_tests;

use crate::error::Result;
use crate::types::{AchievementSummary, EarnedAchievement, UserId, UserStatsSnapshot};
use async_trait::async_trait;

/// One user's stats and achievement state, read together
#[derive(Debug, Clone)]
pub struct UserView {
    pub stats: UserStatsSnapshot,
    pub summary: AchievementSummary,
    /// Optimistic-concurrency token for the summary record
    pub version: i64,
}

/// Result of attempting to commit staged awards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// A concurrent writer advanced the user's summary since it was read;
    /// the caller must re-read fresh state and retry
    Conflict,
}

/// Storage backend trait defining all operations the engine needs
#[async_trait]
pub trait AchievementStore: Send + Sync {
    /// Read a user's stats snapshot together with their achievement summary
    /// and its version. Returns `None` when the user has no stats record.
    async fn load_user_view(&self, user: &UserId) -> Result<Option<UserView>>;

    /// All earned rows for a user, oldest first
    async fn list_earned(&self, user: &UserId) -> Result<Vec<EarnedAchievement>>;

    /// Atomically persist staged award rows and the updated summary
    ///
    /// The write only commits if the summary version still equals
    /// `expected_version`; anything else reports [`CommitOutcome::Conflict`]
    /// and leaves the store untouched. The summary's earned-id set and count
    /// are recomputed from the earned rows within the same transaction.
    async fn commit_awards(
        &self,
        user: &UserId,
        expected_version: i64,
        staged: &[EarnedAchievement],
    ) -> Result<CommitOutcome>;
}
