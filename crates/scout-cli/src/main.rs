use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use scout_core::JobCatalog;
use scout_learning::accuracy::AccuracyLog;
use scout_learning::deadlines::{deadline_report, deadline_stats};
use scout_learning::preferences::PreferenceEngine;
use scout_learning::queries::QueryTracker;
use scout_learning::strategy::StrategyEngine;
use scout_storage::DocumentStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Job Scout preference-learning loop", long_about = None)]
struct Cli {
    /// Directory holding the learning documents
    #[arg(long, env = "SCOUT_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Path to the job catalog file; defaults to <data-dir>/job_tracker.json
    #[arg(long, env = "SCOUT_CATALOG")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full learning pass over the catalog
    Learn,
    /// Show the accuracy summary and weekly trend
    Accuracy,
    /// Query performance tooling
    Queries {
        #[command(subcommand)]
        action: QueryCommands,
    },
    /// Show the current search/filter strategy
    Strategy,
    /// Scan liked/maybe jobs for application deadlines
    Deadlines {
        #[arg(long, default_value_t = 7)]
        warn_days: i64,
    },
}

#[derive(Subcommand)]
enum QueryCommands {
    /// Render the query performance report
    Report,
    /// List keep/drop/review suggestions
    Suggest,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let store = DocumentStore::new(&cli.data_dir);
    let catalog_path = cli
        .catalog
        .clone()
        .unwrap_or_else(|| cli.data_dir.join("job_tracker.json"));

    match cli.command {
        Commands::Learn => {
            let catalog = load_catalog(&catalog_path)?;
            let now = Utc::now();

            let mut log = AccuracyLog::open(store.clone());
            let session = log.record_session(&catalog, now)?;
            match &session {
                Some(session) => println!(
                    "Session recorded: {} reviewed, precision {:.0}%",
                    session.total_reviewed,
                    session.precision * 100.0
                ),
                None => println!("No reviewed jobs yet - nothing recorded"),
            }

            let mut engine = PreferenceEngine::open(store.clone());
            let report = engine.learn_from_feedback(&catalog, now)?;
            println!(
                "Learned {} positive and {} negative patterns ({})",
                report.patterns_found, report.negative_patterns_found, report.metrics.message
            );
            println!(
                "Recommended strictness: {}",
                report.recommended_strictness
            );

            let mut strategy = StrategyEngine::open(store.clone());
            let decisions = strategy.decide(engine.preferences(), now)?;
            if decisions.is_empty() {
                println!("Strategy unchanged");
            } else {
                for decision in &decisions {
                    println!("Decision: {}", decision.impact);
                }
            }

            let mut tracker = QueryTracker::open(store);
            let generated = tracker.generate_queries(
                &engine.preferences().discovered_patterns.differential_signals,
                now,
            )?;
            if !generated.is_empty() {
                println!("Generated {} candidate queries:", generated.len());
                for query in &generated {
                    println!("  {query}");
                }
            }
        }
        Commands::Accuracy => {
            let log = AccuracyLog::open(store);
            let summary = log.summary();
            println!(
                "Reviewed {} jobs across {} sessions",
                summary.total_jobs_reviewed, summary.sessions_recorded
            );
            println!(
                "Overall precision: {:.0}%",
                summary.overall_precision * 100.0
            );
            println!("Trend: {} - {}", summary.trend, summary.trend_message);
        }
        Commands::Queries { action } => {
            let tracker = QueryTracker::open(store);
            match action {
                QueryCommands::Report => println!("{}", tracker.report()),
                QueryCommands::Suggest => {
                    let suggestions = tracker.suggest_adjustments();
                    if suggestions.is_empty() {
                        println!("No suggestions yet - need more feedback per query");
                    }
                    for suggestion in suggestions {
                        println!(
                            "[{}] {} ({}): {}",
                            suggestion.priority.as_str().to_uppercase(),
                            suggestion.action,
                            suggestion.stats,
                            suggestion.query
                        );
                    }
                }
            }
        }
        Commands::Strategy => {
            let engine = StrategyEngine::open(store);
            println!("{}", engine.summary());
            let pending = engine.pending_recommendations();
            if !pending.is_empty() {
                println!("\nPENDING RECOMMENDATIONS:");
                for recommendation in pending {
                    println!("  - {}: {}", recommendation.title, recommendation.detail);
                }
            }
        }
        Commands::Deadlines { warn_days } => {
            let catalog = load_catalog(&catalog_path)?;
            let today = Utc::now().date_naive();
            println!("{}", deadline_report(&catalog, today, warn_days));
            let stats = deadline_stats(&catalog, today);
            println!(
                "\nTracking {} jobs, {} with deadlines ({} critical, {} urgent)",
                stats.total_tracked, stats.with_deadlines, stats.critical, stats.urgent
            );
        }
    }

    Ok(())
}

fn load_catalog(path: &Path) -> Result<JobCatalog> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read job catalog at {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse job catalog at {}", path.display()))
}
