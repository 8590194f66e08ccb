//! End-to-end pass over the whole learning loop: a reviewed catalog flows
//! through session recording, preference learning, strategy decisions and
//! query synthesis, with every document persisted to a real directory and
//! reloaded.

use chrono::{DateTime, TimeZone, Utc};
use scout_core::{JobCatalog, JobRecord, JobStatus, SearchBreadth, StrictnessLevel};
use scout_learning::accuracy::{AccuracyLog, TrendLabel};
use scout_learning::preferences::PreferenceEngine;
use scout_learning::queries::QueryTracker;
use scout_learning::strategy::StrategyEngine;
use scout_storage::{DocumentStore, LoadSource};
use std::collections::HashMap;
use tempfile::TempDir;

fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, day, 10, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn job(title: &str, company: &str, status: JobStatus) -> JobRecord {
    JobRecord {
        title: title.to_string(),
        status,
        company: Some(company.to_string()),
        location: Some("UK".to_string()),
        city: Some("London".to_string()),
        job_type: Some("Industry".to_string()),
        description: Some("Machine learning role using Python".to_string()),
        ai_summary: Some("Graduate-friendly ML position".to_string()),
        deadline: None,
        extra: HashMap::new(),
    }
}

/// 3 liked clinical roles at one company, 17 disliked sales roles: very
/// low precision with clear differential signals either way.
fn reviewed_catalog() -> JobCatalog {
    let mut catalog = JobCatalog::new();
    for index in 0..3 {
        catalog.insert(
            format!("https://boards.example/clinical/{index}"),
            job(
                "Graduate Clinical Research Engineer",
                "Acme Health",
                JobStatus::Liked,
            ),
        );
    }
    for index in 0..17 {
        catalog.insert(
            format!("https://boards.example/sales/{index}"),
            job("Senior Sales Executive", "Spamco", JobStatus::Disliked),
        );
    }
    catalog
}

#[test]
fn full_loop_produces_consistent_artifacts() {
    let dir = TempDir::new().expect("temp dir");
    let store = DocumentStore::new(dir.path());
    let catalog = reviewed_catalog();
    let now = ts(7);

    let mut log = AccuracyLog::open(store.clone());
    let session = log
        .record_session(&catalog, now)
        .expect("record session")
        .expect("session appended");
    assert_eq!(session.total_reviewed, 20);
    assert_eq!(session.precision, 0.15);

    let mut engine = PreferenceEngine::open(store.clone());
    let report = engine.learn_from_feedback(&catalog, now).expect("learn");
    assert!(report.patterns_found > 0);
    assert_eq!(report.recommended_strictness, StrictnessLevel::Strict);
    assert!(engine.dynamic_notes().contains("STRONGLY PREFERRED"));

    let mut strategy = StrategyEngine::open(store.clone());
    let decisions = strategy.decide(engine.preferences(), now).expect("decide");
    // Strictness, query focus, company focus and breadth all move.
    assert_eq!(decisions.len(), 4);
    assert_eq!(
        strategy.current_strategy().strictness_level,
        StrictnessLevel::Strict
    );
    assert_eq!(
        strategy.current_strategy().search_breadth,
        SearchBreadth::Narrow
    );
    assert!(!strategy.current_strategy().query_focus.is_empty());
    assert!(strategy.current_strategy().query_focus.len() <= 5);
    assert_eq!(
        strategy.current_strategy().company_priorities,
        vec!["acme health"]
    );

    let mut tracker = QueryTracker::open(store.clone());
    let generated = tracker
        .generate_queries(
            &engine.preferences().discovered_patterns.differential_signals,
            now,
        )
        .expect("generate");
    assert!(!generated.is_empty());
    assert!(generated.iter().any(|query| query.contains("site:greenhouse.io")));

    // Every artifact is on disk and reloads to the same state.
    for file in [
        "accuracy_history.json",
        "learned_preferences.json",
        "strategy_state.json",
        "query_performance.json",
    ] {
        assert!(dir.path().join(file).exists(), "{file} missing");
    }

    let reloaded_engine = PreferenceEngine::open(store.clone());
    assert_eq!(reloaded_engine.load_source(), LoadSource::Loaded);
    assert_eq!(reloaded_engine.preferences(), engine.preferences());

    let reloaded_strategy = StrategyEngine::open(store.clone());
    assert_eq!(
        reloaded_strategy.current_strategy(),
        strategy.current_strategy()
    );

    // A second identical pass settles: no new decisions, no new queries.
    let mut engine = PreferenceEngine::open(store.clone());
    engine
        .learn_from_feedback(&catalog, ts(8))
        .expect("relearn");
    let mut strategy = StrategyEngine::open(store.clone());
    let decisions = strategy.decide(engine.preferences(), ts(8)).expect("decide");
    assert!(decisions.is_empty());

    let mut tracker = QueryTracker::open(store);
    let before = tracker.performance().generated_queries.len();
    tracker
        .generate_queries(
            &engine.preferences().discovered_patterns.differential_signals,
            ts(8),
        )
        .expect("regenerate");
    assert_eq!(tracker.performance().generated_queries.len(), before);
}

#[test]
fn sessions_accumulate_into_a_trend() {
    let dir = TempDir::new().expect("temp dir");
    let store = DocumentStore::new(dir.path());

    let mut weak = JobCatalog::new();
    for index in 0..2 {
        weak.insert(
            format!("https://boards.example/liked/{index}"),
            job("ML Engineer", "Acme", JobStatus::Liked),
        );
    }
    for index in 0..2 {
        weak.insert(
            format!("https://boards.example/disliked/{index}"),
            job("Sales Lead", "Spamco", JobStatus::Disliked),
        );
    }

    let mut strong = JobCatalog::new();
    for index in 0..4 {
        strong.insert(
            format!("https://boards.example/liked/{index}"),
            job("ML Engineer", "Acme", JobStatus::Liked),
        );
    }
    strong.insert(
        "https://boards.example/disliked/0".to_string(),
        job("Sales Lead", "Spamco", JobStatus::Disliked),
    );

    // One session per week: two weak weeks, then two strong ones.
    let mut log = AccuracyLog::open(store.clone());
    log.record_session(&weak, ts(3)).expect("week 1");
    log.record_session(&weak, ts(10)).expect("week 2");
    log.record_session(&strong, ts(17)).expect("week 3");
    log.record_session(&strong, ts(24)).expect("week 4");

    let report = log.trend();
    assert_eq!(report.trend, TrendLabel::Improving);
    assert_eq!(report.periods.len(), 4);

    let reopened = AccuracyLog::open(store);
    assert_eq!(reopened.summary().sessions_recorded, 4);
    assert_eq!(reopened.trend().trend, TrendLabel::Improving);
}
