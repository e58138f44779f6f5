//! Configuration for the Laurel engine
//!
//! Layered loading: built-in defaults, then an optional `laurel.toml` in the
//! working directory, then `LAUREL_`-prefixed environment variables
//! (e.g. `LAUREL_AWARDS__MAX_TXN_RETRIES=10`).

use crate::error::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaurelConfig {
    pub database: DatabaseConfig,
    pub awards: AwardConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the local database file
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "laurel.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AwardConfig {
    /// Commit attempts per award call before the conflict is surfaced
    pub max_txn_retries: u32,
    /// Linear backoff step between conflicting attempts, in milliseconds
    pub retry_backoff_ms: u64,
    /// Maximum concurrent background backfill tasks
    pub backfill_concurrency: usize,
}

impl Default for AwardConfig {
    fn default() -> Self {
        Self {
            max_txn_retries: 5,
            retry_backoff_ms: 25,
            backfill_concurrency: 4,
        }
    }
}

impl LaurelConfig {
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("laurel").required(false))
            .add_source(config::Environment::with_prefix("LAUREL").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LaurelConfig::default();
        assert_eq!(config.database.path, "laurel.db");
        assert_eq!(config.awards.max_txn_retries, 5);
        assert_eq!(config.awards.backfill_concurrency, 4);
        assert!(config.awards.retry_backoff_ms > 0);
    }
}
