//! Laurel - achievement engine operational CLI
//!
//! Thin wrapper over the library for local operation: initialize a database,
//! inspect the catalog, seed stats, run award passes, and print progress
//! reports. The platform itself consumes the library API directly.

use clap::{Parser, Subcommand};
use laurel_core::{
    AchievementEngine, Catalog, LaurelConfig, LevelTier, LibsqlStore, UserId, UserStatsSnapshot,
};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "laurel", version, about = "Achievement evaluation and awarding engine")]
struct Cli {
    /// Database file path (overrides the config file)
    #[arg(long, global = true, env = "LAUREL_DB_PATH")]
    db_path: Option<String>,

    /// Log verbosity: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database file and apply the schema
    Init,
    /// Print the achievement catalog grouped by category
    Catalog {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show a user's progress for every achievement
    Report {
        user: String,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run one award pass for a trigger event
    Award {
        user: String,
        /// Event name: session_completed, custom_lesson_created, level_changed
        event: String,
    },
    /// Write a user's stats snapshot (local testing)
    Seed {
        user: String,
        #[arg(long, default_value_t = 0)]
        sessions: u32,
        #[arg(long, default_value_t = 0)]
        current_streak: u32,
        #[arg(long, default_value_t = 0)]
        longest_streak: u32,
        #[arg(long, default_value_t = 0)]
        stars: u32,
        #[arg(long, default_value_t = 0)]
        perfect: u32,
        #[arg(long, default_value_t = 0)]
        seconds: u64,
        /// Repeatable: distinct scenario ids completed
        #[arg(long = "scenario")]
        scenarios: Vec<String>,
        #[arg(long, default_value_t = 0)]
        lessons: u32,
        /// CEFR level: A1, A2, B1, B2, C1, C2
        #[arg(long)]
        level: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("laurel={0},laurel_core={0}", cli.log_level))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Laurel v{} starting", env!("CARGO_PKG_VERSION"));

    let config = LaurelConfig::load()?;
    let db_path = cli.db_path.unwrap_or_else(|| config.database.path.clone());

    match cli.command {
        Commands::Init => {
            LibsqlStore::new_local(&db_path).await?;
            println!("Initialized achievement database at {}", db_path);
            Ok(())
        }
        Commands::Catalog { json } => {
            let catalog = Catalog::builtin();
            if json {
                let grouped = catalog.by_category();
                println!("{}", serde_json::to_string_pretty(&grouped)?);
            } else {
                for (category, defs) in catalog.by_category() {
                    println!("{}", category);
                    for def in defs {
                        println!("  {} {} [{}]: {}", def.icon, def.name, def.id, def.description);
                    }
                }
            }
            Ok(())
        }
        Commands::Report { user, json } => {
            let engine = open_engine(&db_path, &config).await?;
            let entries = engine.report(&UserId::new(user)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    let marker = if entry.earned { "✓" } else { " " };
                    println!(
                        "[{}] {} {}: {}/{} ({}%)",
                        marker,
                        entry.definition.icon,
                        entry.definition.name,
                        entry.current,
                        entry.target,
                        entry.progress_percent
                    );
                }
            }
            // The report may have kicked off a backfill; give it a moment to
            // land before the process exits.
            tokio::time::sleep(std::time::Duration::from_millis(250)).await;
            Ok(())
        }
        Commands::Award { user, event } => {
            let engine = open_engine(&db_path, &config).await?;
            let result = engine.handle_event(&UserId::new(user), &event).await?;
            if result.newly_earned.is_empty() {
                println!("No new achievements.");
            } else {
                for def in &result.newly_earned {
                    println!("Unlocked: {} {} - {}", def.icon, def.name, def.description);
                }
            }
            if !result.already_earned.is_empty() {
                println!("Already earned: {}", result.already_earned.join(", "));
            }
            Ok(())
        }
        Commands::Seed {
            user,
            sessions,
            current_streak,
            longest_streak,
            stars,
            perfect,
            seconds,
            scenarios,
            lessons,
            level,
        } => {
            let level = match level {
                Some(raw) => Some(
                    LevelTier::parse(&raw)
                        .ok_or_else(|| anyhow::anyhow!("Invalid CEFR level '{}'", raw))?,
                ),
                None => None,
            };
            let stats = UserStatsSnapshot {
                sessions_completed: sessions,
                current_streak,
                longest_streak,
                total_stars: stars,
                perfect_streak: perfect,
                practice_seconds: seconds,
                scenarios_completed: scenarios.into_iter().collect(),
                lessons_authored: lessons,
                level,
            };
            let store = LibsqlStore::new_local(&db_path).await?;
            store.upsert_stats(&UserId::new(user), &stats).await?;
            println!("Stats written.");
            Ok(())
        }
    }
}

async fn open_engine(db_path: &str, config: &LaurelConfig) -> anyhow::Result<AchievementEngine> {
    let store = Arc::new(LibsqlStore::new_local(db_path).await?);
    Ok(AchievementEngine::new(store, config.awards.clone()))
}
