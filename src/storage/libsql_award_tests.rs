//! Tests for award persistence in LibsqlStore
//!
//! These verify the storage contract in isolation from the engine:
//! - Missing users read as None
//! - Commit writes rows and a consistent summary
//! - Version mismatches and duplicate rows report a conflict
//! - Earned rows survive with their denormalized display fields

#[cfg(test)]
mod award_persistence_tests {
    use crate::catalog::Catalog;
    use crate::storage::test_utils::{create_test_store, seed_stats};
    use crate::storage::{AchievementStore, CommitOutcome};
    use crate::types::{EarnedAchievement, UserId, UserStatsSnapshot};
    use chrono::Utc;

    fn staged_from_catalog(id: &str) -> EarnedAchievement {
        let def = Catalog::builtin().get(id).expect("unknown catalog id");
        EarnedAchievement {
            achievement_id: def.id.to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            category: def.category,
            icon: def.icon.to_string(),
            earned_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_missing_user_reads_as_none() {
        let store = create_test_store().await.unwrap();
        let view = store.load_user_view(&UserId::from("ghost")).await.unwrap();
        assert!(view.is_none());
    }

    #[tokio::test]
    async fn test_seeded_user_has_empty_summary() {
        let store = create_test_store().await.unwrap();
        let user = UserId::from("u1");
        seed_stats(&store, &user, &UserStatsSnapshot::default())
            .await
            .unwrap();

        let view = store.load_user_view(&user).await.unwrap().unwrap();
        assert_eq!(view.version, 0);
        assert!(view.summary.earned_ids.is_empty());
        assert_eq!(view.summary.count, 0);
        assert!(view.summary.latest.is_none());
    }

    #[tokio::test]
    async fn test_commit_writes_rows_and_summary() {
        let store = create_test_store().await.unwrap();
        let user = UserId::from("u1");
        seed_stats(&store, &user, &UserStatsSnapshot::default())
            .await
            .unwrap();

        let staged = vec![
            staged_from_catalog("first_session"),
            staged_from_catalog("streak_3"),
        ];
        let outcome = store.commit_awards(&user, 0, &staged).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);

        let view = store.load_user_view(&user).await.unwrap().unwrap();
        assert_eq!(view.version, 1);
        assert_eq!(view.summary.count, 2);
        assert!(view.summary.earned_ids.contains("first_session"));
        assert!(view.summary.earned_ids.contains("streak_3"));
        let latest = view.summary.latest.unwrap();
        assert_eq!(latest.achievement_id, "streak_3");

        let earned = store.list_earned(&user).await.unwrap();
        assert_eq!(earned.len(), 2);
        let first = earned
            .iter()
            .find(|e| e.achievement_id == "first_session")
            .unwrap();
        assert_eq!(first.name, "First Steps");
        assert_eq!(first.icon, "🌱");
    }

    #[tokio::test]
    async fn test_stale_version_conflicts_without_writing() {
        let store = create_test_store().await.unwrap();
        let user = UserId::from("u1");
        seed_stats(&store, &user, &UserStatsSnapshot::default())
            .await
            .unwrap();

        let first = vec![staged_from_catalog("first_session")];
        assert_eq!(
            store.commit_awards(&user, 0, &first).await.unwrap(),
            CommitOutcome::Committed
        );

        // A second writer that read version 0 must be rejected wholesale.
        let stale = vec![staged_from_catalog("streak_3")];
        assert_eq!(
            store.commit_awards(&user, 0, &stale).await.unwrap(),
            CommitOutcome::Conflict
        );

        let view = store.load_user_view(&user).await.unwrap().unwrap();
        assert_eq!(view.summary.count, 1);
        assert!(!view.summary.earned_ids.contains("streak_3"));
        assert_eq!(store.list_earned(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_award_row_conflicts() {
        let store = create_test_store().await.unwrap();
        let user = UserId::from("u1");
        seed_stats(&store, &user, &UserStatsSnapshot::default())
            .await
            .unwrap();

        let staged = vec![staged_from_catalog("first_session")];
        assert_eq!(
            store.commit_awards(&user, 0, &staged).await.unwrap(),
            CommitOutcome::Committed
        );
        // Same achievement again at the now-current version: the primary key
        // refuses the row even though the version check passes.
        assert_eq!(
            store.commit_awards(&user, 1, &staged).await.unwrap(),
            CommitOutcome::Conflict
        );
        assert_eq!(store.list_earned(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_stage_is_a_no_op() {
        let store = create_test_store().await.unwrap();
        let user = UserId::from("u1");
        seed_stats(&store, &user, &UserStatsSnapshot::default())
            .await
            .unwrap();

        assert_eq!(
            store.commit_awards(&user, 0, &[]).await.unwrap(),
            CommitOutcome::Committed
        );
        let view = store.load_user_view(&user).await.unwrap().unwrap();
        assert_eq!(view.version, 0);
    }

    #[tokio::test]
    async fn test_awards_survive_reopen_of_local_database() {
        use crate::storage::libsql::{ConnectionMode, LibsqlStore};

        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("achievements.db")
            .to_str()
            .unwrap()
            .to_string();
        let user = UserId::from("u1");

        {
            let store = LibsqlStore::new_with_mode(ConnectionMode::Local(db_path.clone()), true)
                .await
                .unwrap();
            seed_stats(&store, &user, &UserStatsSnapshot::default())
                .await
                .unwrap();
            let staged = vec![staged_from_catalog("first_session")];
            assert_eq!(
                store.commit_awards(&user, 0, &staged).await.unwrap(),
                CommitOutcome::Committed
            );
        }

        let reopened = LibsqlStore::new_with_mode(ConnectionMode::Local(db_path), false)
            .await
            .unwrap();
        let view = reopened.load_user_view(&user).await.unwrap().unwrap();
        assert_eq!(view.summary.count, 1);
        assert!(view.summary.earned_ids.contains("first_session"));
    }

    #[tokio::test]
    async fn test_stats_round_trip() {
        let store = create_test_store().await.unwrap();
        let user = UserId::from("u1");
        let mut stats = UserStatsSnapshot {
            sessions_completed: 12,
            current_streak: 2,
            longest_streak: 9,
            total_stars: 140,
            perfect_streak: 1,
            practice_seconds: 7260,
            lessons_authored: 3,
            level: Some(crate::types::LevelTier::B1),
            ..Default::default()
        };
        stats.scenarios_completed.insert("cafe".to_string());
        stats.scenarios_completed.insert("airport".to_string());

        seed_stats(&store, &user, &stats).await.unwrap();
        let view = store.load_user_view(&user).await.unwrap().unwrap();
        assert_eq!(view.stats, stats);
    }
}
