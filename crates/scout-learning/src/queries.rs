//! Search-query performance ledger.
//!
//! Tracks how many jobs each distinct query produced and how those jobs
//! were ultimately rated, derives an effectiveness score per query, turns
//! the scores into keep/drop suggestions, and synthesizes new candidate
//! queries from the differential signals.

use chrono::{DateTime, Utc};
use scout_core::feedback::{format_percent, round3, DifferentialSignals};
use scout_core::JobStatus;
use scout_storage::{Document, DocumentStore, LoadSource, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Query text is truncated to this many characters when building the
/// ledger key; long provenance strings would otherwise explode the map.
pub const MAX_KEY_QUERY_CHARS: usize = 100;

/// Feedback signals required before a query earns any suggestion.
pub const MIN_FEEDBACK_FOR_SUGGESTION: u32 = 3;

/// Effectiveness tiers for suggestions.
pub const EFFECTIVENESS_DROP: f64 = 0.15;
pub const EFFECTIVENESS_REVIEW: f64 = 0.3;
pub const EFFECTIVENESS_KEEP: f64 = 0.5;
pub const EFFECTIVENESS_EXPAND: f64 = 0.6;
pub const MIN_FEEDBACK_FOR_EXPAND: u32 = 5;

/// Synthesis caps and templates.
const MAX_KEYWORDS_FOR_SYNTHESIS: usize = 5;
const MAX_COMPANIES_FOR_SYNTHESIS: usize = 3;
const SYNTHESIS_MIN_RATIO: f64 = 2.0;
const JOB_BOARD_DOMAINS: &[&str] = &["greenhouse.io", "lever.co"];
const QUERY_REGION: &str = "UK";
const QUERY_AUDIENCE: &str = "graduate";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryPerformance {
    pub version: String,
    #[serde(default)]
    pub queries: BTreeMap<String, QueryStats>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub generated_queries: Vec<String>,
}

impl Default for QueryPerformance {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            queries: BTreeMap::new(),
            last_updated: None,
            generated_queries: Vec::new(),
        }
    }
}

impl Document for QueryPerformance {
    const FILE_NAME: &'static str = "query_performance.json";
    const VERSION: &'static str = "1.0";

    fn version(&self) -> &str {
        &self.version
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryStats {
    pub query: String,
    pub source: String,
    pub total_jobs_found: u32,
    pub jobs_liked: u32,
    pub jobs_disliked: u32,
    pub jobs_maybe: u32,
    pub run_count: u32,
    pub first_run: String,
    #[serde(default)]
    pub last_run: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryEffectiveness {
    pub query: String,
    pub source: String,
    pub effectiveness: f64,
    pub total_jobs: u32,
    pub liked: u32,
    pub disliked: u32,
    pub maybe: u32,
    pub run_count: u32,
    pub feedback_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryAction {
    Drop,
    Review,
    Expand,
    Keep,
}

impl QueryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryAction::Drop => "drop",
            QueryAction::Review => "review",
            QueryAction::Expand => "expand",
            QueryAction::Keep => "keep",
        }
    }
}

impl fmt::Display for QueryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

impl SuggestionPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionPriority::High => "high",
            SuggestionPriority::Medium => "medium",
            SuggestionPriority::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySuggestion {
    pub query: String,
    pub action: QueryAction,
    pub reason: String,
    pub stats: String,
    pub priority: SuggestionPriority,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryLedgerSummary {
    pub total_queries_tracked: usize,
    pub queries_with_feedback: usize,
    pub high_performers: usize,
    pub low_performers: usize,
    pub suggestions: usize,
    pub generated_queries: usize,
}

pub struct QueryTracker {
    store: DocumentStore,
    performance: QueryPerformance,
    source: LoadSource,
}

impl QueryTracker {
    pub fn open(store: DocumentStore) -> Self {
        let outcome = store.load::<QueryPerformance>();
        Self {
            store,
            performance: outcome.document,
            source: outcome.source,
        }
    }

    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    pub fn performance(&self) -> &QueryPerformance {
        &self.performance
    }

    /// Record that a search run for `query` returned `jobs_found` jobs.
    pub fn record_result(
        &mut self,
        query: &str,
        jobs_found: u32,
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let key = ledger_key(source, query);
        let entry = self
            .performance
            .queries
            .entry(key)
            .or_insert_with(|| QueryStats {
                query: query.to_string(),
                source: source.to_string(),
                total_jobs_found: 0,
                jobs_liked: 0,
                jobs_disliked: 0,
                jobs_maybe: 0,
                run_count: 0,
                first_run: now.to_rfc3339(),
                last_run: None,
            });

        entry.total_jobs_found += jobs_found;
        entry.run_count += 1;
        entry.last_run = Some(now.to_rfc3339());

        self.save(now)
    }

    /// Attribute a triage outcome back to the query that surfaced the job.
    /// The first stored record (in key order) whose query text contains
    /// `source_query` is credited; an empty or unmatched provenance string
    /// is a silent no-op.
    pub fn record_outcome(
        &mut self,
        job_url: &str,
        source_query: Option<&str>,
        status: &JobStatus,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let source_query = match source_query {
            Some(query) if !query.trim().is_empty() => query,
            _ => return Ok(()),
        };

        let matched = self
            .performance
            .queries
            .values_mut()
            .find(|stats| stats.query.contains(source_query));
        let Some(stats) = matched else {
            tracing::debug!(job_url, source_query, "no tracked query matches outcome");
            return Ok(());
        };

        match status {
            JobStatus::Liked => stats.jobs_liked += 1,
            JobStatus::Disliked => stats.jobs_disliked += 1,
            JobStatus::Maybe => stats.jobs_maybe += 1,
            _ => return Ok(()),
        }

        self.save(now)
    }

    /// All tracked queries ranked by effectiveness. Queries with feedback
    /// always sort ahead of those without; ties break on the score.
    pub fn effectiveness(&self) -> Vec<QueryEffectiveness> {
        let mut results: Vec<QueryEffectiveness> = self
            .performance
            .queries
            .values()
            .map(|stats| {
                let feedback_count = stats.jobs_liked + stats.jobs_disliked;
                let effectiveness = if feedback_count > 0 {
                    f64::from(stats.jobs_liked) / f64::from(feedback_count)
                } else if stats.total_jobs_found > 0 {
                    // No feedback yet but the query does produce jobs.
                    0.5
                } else {
                    0.0
                };

                QueryEffectiveness {
                    query: stats.query.clone(),
                    source: stats.source.clone(),
                    effectiveness: round3(effectiveness),
                    total_jobs: stats.total_jobs_found,
                    liked: stats.jobs_liked,
                    disliked: stats.jobs_disliked,
                    maybe: stats.jobs_maybe,
                    run_count: stats.run_count,
                    feedback_count,
                }
            })
            .collect();

        results.sort_by(|left, right| {
            (right.feedback_count > 0)
                .cmp(&(left.feedback_count > 0))
                .then(right.effectiveness.total_cmp(&left.effectiveness))
        });
        results
    }

    /// Keep/drop/review/expand suggestions, high priority first. Queries
    /// with fewer than MIN_FEEDBACK_FOR_SUGGESTION signals never appear.
    pub fn suggest_adjustments(&self) -> Vec<QuerySuggestion> {
        let mut suggestions = Vec::new();

        for entry in self.effectiveness() {
            let feedback = entry.liked + entry.disliked;
            if feedback < MIN_FEEDBACK_FOR_SUGGESTION {
                continue;
            }

            let stats = format!("{} liked vs {} disliked", entry.liked, entry.disliked);
            let percent = format_percent(entry.effectiveness);

            if entry.effectiveness < EFFECTIVENESS_DROP {
                suggestions.push(QuerySuggestion {
                    query: entry.query,
                    action: QueryAction::Drop,
                    reason: format!("Very low effectiveness ({percent})"),
                    stats,
                    priority: SuggestionPriority::High,
                });
            } else if entry.effectiveness < EFFECTIVENESS_REVIEW {
                suggestions.push(QuerySuggestion {
                    query: entry.query,
                    action: QueryAction::Review,
                    reason: format!("Low effectiveness ({percent})"),
                    stats,
                    priority: SuggestionPriority::Medium,
                });
            } else if entry.effectiveness > EFFECTIVENESS_EXPAND
                && feedback >= MIN_FEEDBACK_FOR_EXPAND
            {
                suggestions.push(QuerySuggestion {
                    query: entry.query,
                    action: QueryAction::Expand,
                    reason: format!("High effectiveness ({percent})"),
                    stats,
                    priority: SuggestionPriority::High,
                });
            } else if entry.effectiveness > EFFECTIVENESS_KEEP {
                suggestions.push(QuerySuggestion {
                    query: entry.query,
                    action: QueryAction::Keep,
                    reason: format!("Good effectiveness ({percent})"),
                    stats,
                    priority: SuggestionPriority::Low,
                });
            }
        }

        suggestions.sort_by_key(|suggestion| suggestion.priority != SuggestionPriority::High);
        suggestions
    }

    /// Synthesize candidate queries from the differential signals and
    /// append the new ones to the persisted generated list. Idempotent:
    /// already-known strings are not appended again.
    pub fn generate_queries(
        &mut self,
        differentials: &DifferentialSignals,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let mut new_queries = Vec::new();

        for signal in differentials
            .strong_positives
            .iter()
            .filter(|signal| signal.ratio > SYNTHESIS_MIN_RATIO)
            .take(MAX_KEYWORDS_FOR_SYNTHESIS)
        {
            let keyword = &signal.keyword;
            new_queries.push(format!("\"{keyword}\" {QUERY_REGION} job {QUERY_AUDIENCE}"));
            for domain in JOB_BOARD_DOMAINS {
                new_queries.push(format!("site:{domain} \"{keyword}\" {QUERY_REGION}"));
            }
        }

        for signal in differentials
            .liked_companies
            .iter()
            .take(MAX_COMPANIES_FOR_SYNTHESIS)
        {
            let company = &signal.company;
            let domain_guess = company.replace(' ', "");
            new_queries.push(format!("site:{domain_guess}.com careers"));
            new_queries.push(format!(
                "\"{company}\" careers {QUERY_AUDIENCE} {QUERY_REGION}"
            ));
        }

        for query in &new_queries {
            if !self.performance.generated_queries.contains(query) {
                self.performance.generated_queries.push(query.clone());
            }
        }
        if !new_queries.is_empty() {
            self.save(now)?;
        }

        Ok(new_queries)
    }

    pub fn summary(&self) -> QueryLedgerSummary {
        let effectiveness = self.effectiveness();
        let suggestions = self.suggest_adjustments();

        let high_performers = effectiveness
            .iter()
            .filter(|entry| {
                entry.effectiveness > EFFECTIVENESS_KEEP
                    && entry.feedback_count >= MIN_FEEDBACK_FOR_SUGGESTION
            })
            .count();
        let low_performers = effectiveness
            .iter()
            .filter(|entry| {
                entry.effectiveness < EFFECTIVENESS_REVIEW
                    && entry.feedback_count >= MIN_FEEDBACK_FOR_SUGGESTION
            })
            .count();

        QueryLedgerSummary {
            total_queries_tracked: self.performance.queries.len(),
            queries_with_feedback: effectiveness
                .iter()
                .filter(|entry| entry.feedback_count > 0)
                .count(),
            high_performers,
            low_performers,
            suggestions: suggestions.len(),
            generated_queries: self.performance.generated_queries.len(),
        }
    }

    /// Human-readable performance report for any display surface.
    pub fn report(&self) -> String {
        let effectiveness = self.effectiveness();
        let suggestions = self.suggest_adjustments();
        let rule = "=".repeat(50);

        let mut lines = vec!["QUERY PERFORMANCE REPORT".to_string(), rule.clone()];

        let top: Vec<&QueryEffectiveness> = effectiveness
            .iter()
            .filter(|entry| {
                entry.effectiveness > EFFECTIVENESS_KEEP
                    && entry.feedback_count >= MIN_FEEDBACK_FOR_SUGGESTION
            })
            .take(5)
            .collect();
        if !top.is_empty() {
            lines.push("\nTOP PERFORMING QUERIES:".to_string());
            for entry in top {
                lines.push(format!(
                    "  [{}] {}...",
                    format_percent(entry.effectiveness),
                    truncate(&entry.query, 50)
                ));
                lines.push(format!(
                    "       {} liked, {} disliked",
                    entry.liked, entry.disliked
                ));
            }
        }

        let bottom: Vec<&QueryEffectiveness> = effectiveness
            .iter()
            .filter(|entry| {
                entry.effectiveness < EFFECTIVENESS_REVIEW
                    && entry.feedback_count >= MIN_FEEDBACK_FOR_SUGGESTION
            })
            .take(5)
            .collect();
        if !bottom.is_empty() {
            lines.push("\nLOW PERFORMING QUERIES:".to_string());
            for entry in bottom {
                lines.push(format!(
                    "  [{}] {}...",
                    format_percent(entry.effectiveness),
                    truncate(&entry.query, 50)
                ));
                lines.push("       Consider removing or modifying".to_string());
            }
        }

        if !suggestions.is_empty() {
            lines.push("\nRECOMMENDATIONS:".to_string());
            for suggestion in suggestions.iter().take(5) {
                lines.push(format!(
                    "  [{}] {}...",
                    suggestion.action.as_str().to_uppercase(),
                    truncate(&suggestion.query, 40)
                ));
                lines.push(format!("       {}", suggestion.reason));
            }
        }

        lines.push(format!("\n{rule}"));
        lines.join("\n")
    }

    fn save(&mut self, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.performance.last_updated = Some(now.to_rfc3339());
        self.store.save(&self.performance)
    }
}

fn ledger_key(source: &str, query: &str) -> String {
    format!("{source}:{}", truncate(query, MAX_KEY_QUERY_CHARS))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use scout_core::feedback::{CompanySignal, KeywordSignal};
    use tempfile::TempDir;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    fn open_tracker(dir: &TempDir) -> QueryTracker {
        QueryTracker::open(DocumentStore::new(dir.path()))
    }

    fn seed_feedback(tracker: &mut QueryTracker, query: &str, liked: u32, disliked: u32) {
        tracker
            .record_result(query, liked + disliked, "google", ts())
            .expect("record result");
        for _ in 0..liked {
            tracker
                .record_outcome("https://jobs.example/x", Some(query), &JobStatus::Liked, ts())
                .expect("outcome");
        }
        for _ in 0..disliked {
            tracker
                .record_outcome(
                    "https://jobs.example/x",
                    Some(query),
                    &JobStatus::Disliked,
                    ts(),
                )
                .expect("outcome");
        }
    }

    #[test]
    fn record_result_upserts_and_stamps_runs() {
        let dir = TempDir::new().expect("temp dir");
        let mut tracker = open_tracker(&dir);

        tracker
            .record_result("ml graduate jobs", 7, "google", ts())
            .expect("first run");
        tracker
            .record_result("ml graduate jobs", 3, "google", ts())
            .expect("second run");

        let stats = tracker
            .performance()
            .queries
            .get("google:ml graduate jobs")
            .expect("tracked");
        assert_eq!(stats.total_jobs_found, 10);
        assert_eq!(stats.run_count, 2);
        assert!(stats.last_run.is_some());
    }

    #[test]
    fn ledger_key_truncates_long_queries() {
        let long_query = "x".repeat(300);
        let key = ledger_key("scraper", &long_query);
        assert_eq!(key.len(), "scraper:".len() + MAX_KEY_QUERY_CHARS);
    }

    #[test]
    fn outcome_matches_by_substring() {
        let dir = TempDir::new().expect("temp dir");
        let mut tracker = open_tracker(&dir);
        tracker
            .record_result("graduate machine learning engineer UK", 5, "google", ts())
            .expect("record");

        tracker
            .record_outcome(
                "https://jobs.example/1",
                Some("machine learning"),
                &JobStatus::Liked,
                ts(),
            )
            .expect("outcome");

        let stats = tracker
            .performance()
            .queries
            .values()
            .next()
            .expect("one query");
        assert_eq!(stats.jobs_liked, 1);
    }

    #[test]
    fn unmatched_or_missing_provenance_is_a_no_op() {
        let dir = TempDir::new().expect("temp dir");
        let mut tracker = open_tracker(&dir);
        tracker
            .record_result("ml jobs", 5, "google", ts())
            .expect("record");

        tracker
            .record_outcome("https://jobs.example/1", None, &JobStatus::Liked, ts())
            .expect("no provenance");
        tracker
            .record_outcome(
                "https://jobs.example/1",
                Some("quantum chemistry"),
                &JobStatus::Liked,
                ts(),
            )
            .expect("unmatched");

        let stats = tracker
            .performance()
            .queries
            .values()
            .next()
            .expect("one query");
        assert_eq!(stats.jobs_liked, 0);
    }

    #[test]
    fn effectiveness_scores_follow_the_feedback() {
        let dir = TempDir::new().expect("temp dir");
        let mut tracker = open_tracker(&dir);

        seed_feedback(&mut tracker, "good query", 3, 1);
        tracker
            .record_result("unrated query", 10, "google", ts())
            .expect("record");
        tracker
            .record_result("dead query", 0, "google", ts())
            .expect("record");

        let ranked = tracker.effectiveness();
        assert_eq!(ranked[0].query, "good query");
        assert_eq!(ranked[0].effectiveness, 0.75);
        assert_eq!(ranked[1].query, "unrated query");
        assert_eq!(ranked[1].effectiveness, 0.5);
        assert_eq!(ranked[2].query, "dead query");
        assert_eq!(ranked[2].effectiveness, 0.0);
    }

    #[test]
    fn no_suggestions_below_the_feedback_floor() {
        let dir = TempDir::new().expect("temp dir");
        let mut tracker = open_tracker(&dir);
        // 2 signals, both disliked: extreme score but not enough data.
        seed_feedback(&mut tracker, "sparse query", 0, 2);

        assert!(tracker.suggest_adjustments().is_empty());
    }

    #[test]
    fn suggestion_tiers_and_ordering() {
        let dir = TempDir::new().expect("temp dir");
        let mut tracker = open_tracker(&dir);

        seed_feedback(&mut tracker, "drop me", 0, 4);
        seed_feedback(&mut tracker, "review me", 1, 3);
        seed_feedback(&mut tracker, "expand me", 5, 1);
        seed_feedback(&mut tracker, "keep me", 2, 1);

        let suggestions = tracker.suggest_adjustments();
        assert_eq!(suggestions.len(), 4);
        // High-priority suggestions lead.
        assert_eq!(suggestions[0].priority, SuggestionPriority::High);
        assert_eq!(suggestions[1].priority, SuggestionPriority::High);

        let action_for = |query: &str| {
            suggestions
                .iter()
                .find(|suggestion| suggestion.query == query)
                .map(|suggestion| suggestion.action)
                .expect("suggestion present")
        };
        assert_eq!(action_for("drop me"), QueryAction::Drop);
        assert_eq!(action_for("review me"), QueryAction::Review);
        assert_eq!(action_for("expand me"), QueryAction::Expand);
        assert_eq!(action_for("keep me"), QueryAction::Keep);
    }

    #[test]
    fn generated_queries_are_deduplicated() {
        let dir = TempDir::new().expect("temp dir");
        let mut tracker = open_tracker(&dir);

        let differentials = DifferentialSignals {
            strong_positives: vec![KeywordSignal {
                keyword: "clinical".to_string(),
                liked_count: 5,
                disliked_count: 1,
                ratio: 5.0,
            }],
            liked_companies: vec![CompanySignal {
                company: "acme health".to_string(),
                liked_count: 3,
                disliked_count: 0,
            }],
            ..DifferentialSignals::default()
        };

        let first = tracker
            .generate_queries(&differentials, ts())
            .expect("generate");
        assert_eq!(first.len(), 5);
        assert!(first.contains(&"\"clinical\" UK job graduate".to_string()));
        assert!(first.contains(&"site:greenhouse.io \"clinical\" UK".to_string()));
        assert!(first.contains(&"site:lever.co \"clinical\" UK".to_string()));
        assert!(first.contains(&"site:acmehealth.com careers".to_string()));
        assert!(first.contains(&"\"acme health\" careers graduate UK".to_string()));

        tracker
            .generate_queries(&differentials, ts())
            .expect("generate again");
        assert_eq!(tracker.performance().generated_queries.len(), 5);
    }

    #[test]
    fn weak_ratios_generate_nothing() {
        let dir = TempDir::new().expect("temp dir");
        let mut tracker = open_tracker(&dir);

        let differentials = DifferentialSignals {
            strong_positives: vec![KeywordSignal {
                keyword: "platform".to_string(),
                liked_count: 2,
                disliked_count: 1,
                ratio: 2.0,
            }],
            ..DifferentialSignals::default()
        };

        let generated = tracker
            .generate_queries(&differentials, ts())
            .expect("generate");
        assert!(generated.is_empty());
        assert!(tracker.performance().generated_queries.is_empty());
    }

    #[test]
    fn summary_and_report_reflect_the_ledger() {
        let dir = TempDir::new().expect("temp dir");
        let mut tracker = open_tracker(&dir);
        seed_feedback(&mut tracker, "expand me", 5, 1);
        seed_feedback(&mut tracker, "drop me", 0, 4);

        let summary = tracker.summary();
        assert_eq!(summary.total_queries_tracked, 2);
        assert_eq!(summary.queries_with_feedback, 2);
        assert_eq!(summary.high_performers, 1);
        assert_eq!(summary.low_performers, 1);

        let report = tracker.report();
        assert!(report.contains("QUERY PERFORMANCE REPORT"));
        assert!(report.contains("TOP PERFORMING QUERIES"));
        assert!(report.contains("LOW PERFORMING QUERIES"));
        assert!(report.contains("RECOMMENDATIONS"));
    }

    #[test]
    fn ledger_round_trips_through_disk() {
        let dir = TempDir::new().expect("temp dir");
        let mut tracker = open_tracker(&dir);
        seed_feedback(&mut tracker, "good query", 3, 1);
        let saved = tracker.performance().clone();

        let reopened = open_tracker(&dir);
        assert_eq!(reopened.load_source(), LoadSource::Loaded);
        assert_eq!(reopened.performance(), &saved);
    }
}
