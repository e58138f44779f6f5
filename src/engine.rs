//! Achievement engine: awarding and progress reporting
//!
//! The award path runs an optimistic read-evaluate-commit loop against the
//! store; the reporting path is read-only but opportunistically schedules a
//! best-effort backfill award for achievements whose criteria are already
//! met but not yet recorded. Reporting must stay available even when the
//! write path is unhealthy, so backfill failures are logged and swallowed.

use crate::catalog::{AchievementCategory, AchievementDefinition, Catalog};
use crate::config::AwardConfig;
use crate::error::{LaurelError, Result};
use crate::evaluator;
use crate::router;
use crate::storage::{AchievementStore, CommitOutcome};
use crate::types::{EarnedAchievement, TriggerKind, UserId, UserStatsSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Outcome of one award pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct AwardResult {
    /// Definitions that were newly persisted as earned by this call
    pub newly_earned: Vec<AchievementDefinition>,
    /// Ids among the evaluated candidates that were already earned
    pub already_earned: Vec<String>,
}

/// One catalog entry's progress, as rendered by the achievement view
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEntry {
    pub definition: AchievementDefinition,
    pub earned: bool,
    pub earned_at: Option<DateTime<Utc>>,
    pub current: u32,
    pub target: u32,
    pub progress_percent: u8,
}

/// The achievement evaluation and awarding engine
///
/// Cheap to clone; clones share the store and the backfill concurrency
/// budget.
#[derive(Clone)]
pub struct AchievementEngine {
    store: Arc<dyn AchievementStore>,
    catalog: &'static Catalog,
    config: AwardConfig,
    backfill_permits: Arc<Semaphore>,
}

impl AchievementEngine {
    pub fn new(store: Arc<dyn AchievementStore>, config: AwardConfig) -> Self {
        let backfill_permits = Arc::new(Semaphore::new(config.backfill_concurrency));
        Self {
            store,
            catalog: Catalog::builtin(),
            config,
            backfill_permits,
        }
    }

    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    /// Static catalog accessor for grouped display
    pub fn by_category(&self) -> BTreeMap<AchievementCategory, Vec<&'static AchievementDefinition>> {
        self.catalog.by_category()
    }

    /// Evaluate and award for a typed trigger
    ///
    /// Called by the event-producing side immediately after it persists the
    /// underlying stat change. Blocks until the award commits or the retry
    /// budget is exhausted.
    pub async fn award(&self, user: &UserId, trigger: TriggerKind) -> Result<AwardResult> {
        let candidates = router::candidates(self.catalog, trigger);
        debug!(
            "Trigger {} routed {} candidate(s) for user {}",
            trigger,
            candidates.len(),
            user
        );
        self.award_candidates(user, &candidates).await
    }

    /// Evaluate and award for a raw event name
    ///
    /// Unknown event names are a deliberate no-op, not an error: the event
    /// vocabulary can grow before this service learns the new kinds.
    pub async fn handle_event(&self, user: &UserId, event_name: &str) -> Result<AwardResult> {
        match TriggerKind::from_event_name(event_name) {
            Some(trigger) => self.award(user, trigger).await,
            None => {
                debug!("Ignoring unknown trigger event '{}'", event_name);
                Ok(AwardResult::default())
            }
        }
    }

    /// Progress for every catalog entry, ordered by category then sort order
    ///
    /// Read-only. An achievement whose criteria are met but which has no
    /// persisted award yet is reported as earned immediately (without a
    /// timestamp) and queued for background backfill; the persisted record
    /// appears by the next successful backfill at the latest.
    pub async fn report(&self, user: &UserId) -> Result<Vec<ProgressEntry>> {
        let view = self.store.load_user_view(user).await?;

        let Some(view) = view else {
            debug!("User {} has no stats yet; reporting zero progress", user);
            let stats = UserStatsSnapshot::default();
            return Ok(self
                .catalog
                .iter()
                .map(|def| Self::entry(def, &stats, false, None))
                .collect());
        };

        let earned_rows = self.store.list_earned(user).await?;
        let earned_at: HashMap<&str, DateTime<Utc>> = earned_rows
            .iter()
            .map(|e| (e.achievement_id.as_str(), e.earned_at))
            .collect();

        let mut entries = Vec::with_capacity(self.catalog.len());
        let mut backfill: Vec<&'static AchievementDefinition> = Vec::new();
        for def in self.catalog.iter() {
            let persisted = view.summary.earned_ids.contains(def.id);
            let met = evaluator::meets(&def.criteria, &view.stats);
            if met && !persisted {
                backfill.push(def);
            }
            entries.push(Self::entry(
                def,
                &view.stats,
                persisted || met,
                earned_at.get(def.id).copied(),
            ));
        }

        if !backfill.is_empty() {
            self.spawn_backfill(user.clone(), backfill);
        }

        Ok(entries)
    }

    /// Optimistic award loop over an explicit candidate set
    ///
    /// Every attempt re-reads fresh state; stale reads are never reused
    /// across retries. Both commit conflicts and transient lock contention
    /// burn one attempt from the same bounded budget.
    async fn award_candidates(
        &self,
        user: &UserId,
        candidates: &[&'static AchievementDefinition],
    ) -> Result<AwardResult> {
        let mut attempt: u32 = 0;
        loop {
            match self.try_award(user, candidates).await {
                Ok(Some(result)) => return Ok(result),
                Ok(None) => {}
                Err(e) if e.is_contention() => {}
                Err(e) => return Err(e),
            }

            attempt += 1;
            if attempt >= self.config.max_txn_retries {
                return Err(LaurelError::ConflictRetriesExhausted(attempt));
            }
            debug!(
                "Award conflict for user {} (attempt {}), retrying",
                user, attempt
            );
            tokio::time::sleep(Duration::from_millis(
                self.config.retry_backoff_ms * u64::from(attempt),
            ))
            .await;
        }
    }

    /// One award attempt: fresh read, evaluate, commit. `None` on conflict.
    ///
    /// The membership check against `earned_ids` is what makes repeated
    /// calls with unchanged stats structurally idempotent.
    async fn try_award(
        &self,
        user: &UserId,
        candidates: &[&'static AchievementDefinition],
    ) -> Result<Option<AwardResult>> {
        let Some(view) = self.store.load_user_view(user).await? else {
            debug!("User {} has no stats record; nothing to award", user);
            return Ok(Some(AwardResult::default()));
        };

        let now = Utc::now();
        let mut newly_earned = Vec::new();
        let mut already_earned = Vec::new();
        let mut staged = Vec::new();
        for def in candidates {
            if view.summary.earned_ids.contains(def.id) {
                already_earned.push(def.id.to_string());
                continue;
            }
            if evaluator::meets(&def.criteria, &view.stats) {
                staged.push(EarnedAchievement {
                    achievement_id: def.id.to_string(),
                    name: def.name.to_string(),
                    description: def.description.to_string(),
                    category: def.category,
                    icon: def.icon.to_string(),
                    earned_at: now,
                });
                newly_earned.push((*def).clone());
            }
        }

        if staged.is_empty() {
            return Ok(Some(AwardResult {
                newly_earned,
                already_earned,
            }));
        }

        match self.store.commit_awards(user, view.version, &staged).await? {
            CommitOutcome::Committed => {
                info!(
                    "User {} earned: {}",
                    user,
                    newly_earned
                        .iter()
                        .map(|d| d.id)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                Ok(Some(AwardResult {
                    newly_earned,
                    already_earned,
                }))
            }
            CommitOutcome::Conflict => Ok(None),
        }
    }

    /// Dispatch a fire-and-forget backfill award, bounded by the permit pool
    ///
    /// Not retried beyond this single attempt: a candidate that fails to
    /// persist is still missing from `earned_ids`, so the next report
    /// derives it again.
    fn spawn_backfill(&self, user: UserId, candidates: Vec<&'static AchievementDefinition>) {
        let permit = match Arc::clone(&self.backfill_permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                debug!(
                    "Skipping backfill for user {}: concurrency limit reached",
                    user
                );
                return;
            }
        };

        let engine = self.clone();
        tokio::spawn(async move {
            let _permit = permit;
            debug!(
                "Backfilling {} candidate(s) for user {}",
                candidates.len(),
                user
            );
            match engine.award_candidates(&user, &candidates).await {
                Ok(result) if !result.newly_earned.is_empty() => {
                    info!(
                        "Backfilled {} achievement(s) for user {}",
                        result.newly_earned.len(),
                        user
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Backfill for user {} failed: {}", user, e);
                }
            }
        });
    }

    fn entry(
        def: &AchievementDefinition,
        stats: &UserStatsSnapshot,
        earned: bool,
        earned_at: Option<DateTime<Utc>>,
    ) -> ProgressEntry {
        let progress = evaluator::progress(&def.criteria, stats);
        ProgressEntry {
            definition: def.clone(),
            earned,
            earned_at,
            current: progress.current,
            target: progress.target,
            progress_percent: progress.percent(),
        }
    }
}
