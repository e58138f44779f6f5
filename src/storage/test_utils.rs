//! Test utilities for storage initialization
//!
//! Provides in-memory store construction and stat seeding so tests never
//! depend on the filesystem.

use crate::error::Result;
use crate::storage::libsql::LibsqlStore;
use crate::types::{UserId, UserStatsSnapshot};
use std::sync::Arc;

/// Create an in-memory store with the schema pre-applied
pub async fn create_test_store() -> Result<Arc<LibsqlStore>> {
    Ok(Arc::new(LibsqlStore::new_in_memory().await?))
}

/// Write a stats snapshot for a user, as the platform's stat pipeline would
pub async fn seed_stats(
    store: &LibsqlStore,
    user: &UserId,
    stats: &UserStatsSnapshot,
) -> Result<()> {
    store.upsert_stats(user, stats).await
}
