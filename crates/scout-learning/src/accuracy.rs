//! Session-by-session accuracy history and the weekly trend derived from
//! it. One record is appended per review session; the history is trimmed
//! to the newest 50 sessions and regrouped into at most 12 weekly buckets
//! on every append.

use chrono::{DateTime, Utc};
use scout_core::feedback::{format_percent, round3};
use scout_core::JobCatalog;
use scout_storage::{Document, DocumentStore, LoadSource, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::signals::accuracy_metrics;

pub const MAX_SESSIONS: usize = 50;
pub const MAX_WEEKLY_BUCKETS: usize = 12;

/// Recent-vs-older mean accuracy must move by more than this to count as
/// a trend change.
pub const TREND_THRESHOLD: f64 = 0.05;

/// Number of most recent weekly buckets treated as "recent" by the trend.
pub const TREND_RECENT_BUCKETS: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccuracyHistory {
    pub version: String,
    #[serde(default)]
    pub overall_accuracy: Option<OverallAccuracy>,
    #[serde(default)]
    pub by_time_period: Vec<WeeklyBucket>,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
}

impl Default for AccuracyHistory {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            overall_accuracy: None,
            by_time_period: Vec::new(),
            sessions: Vec::new(),
        }
    }
}

impl Document for AccuracyHistory {
    const FILE_NAME: &'static str = "accuracy_history.json";
    const VERSION: &'static str = "1.0";

    fn version(&self) -> &str {
        &self.version
    }
}

/// Immutable snapshot of one review session. Timestamps are stored as
/// RFC3339 strings; a record whose timestamp no longer parses is skipped
/// during bucketing rather than aborting the computation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub timestamp: String,
    pub total_reviewed: u32,
    pub liked: u32,
    pub disliked: u32,
    pub maybe: u32,
    pub precision: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverallAccuracy {
    pub total_reviewed: u32,
    pub total_liked: u32,
    pub total_disliked: u32,
    pub total_maybe: u32,
    pub precision: f64,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyBucket {
    pub week: String,
    pub accuracy: f64,
    pub sample_size: u32,
    pub liked: u32,
    pub disliked: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Improving,
    Declining,
    Stable,
    Establishing,
    InsufficientData,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::Improving => "improving",
            TrendLabel::Declining => "declining",
            TrendLabel::Stable => "stable",
            TrendLabel::Establishing => "establishing",
            TrendLabel::InsufficientData => "insufficient_data",
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendReport {
    pub trend: TrendLabel,
    pub message: String,
    pub current_accuracy: Option<f64>,
    pub periods: Vec<WeeklyBucket>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccuracySummary {
    pub total_jobs_reviewed: u32,
    pub overall_precision: f64,
    pub trend: TrendLabel,
    pub trend_message: String,
    pub sessions_recorded: usize,
}

pub struct AccuracyLog {
    store: DocumentStore,
    history: AccuracyHistory,
    source: LoadSource,
}

impl AccuracyLog {
    pub fn open(store: DocumentStore) -> Self {
        let outcome = store.load::<AccuracyHistory>();
        Self {
            store,
            history: outcome.document,
            source: outcome.source,
        }
    }

    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    pub fn history(&self) -> &AccuracyHistory {
        &self.history
    }

    /// Record one review session. Returns the appended snapshot, or None
    /// when the catalog holds no reviewed jobs (nothing is written).
    pub fn record_session(
        &mut self,
        catalog: &JobCatalog,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let metrics = accuracy_metrics(catalog);
        if metrics.total_reviewed == 0 {
            return Ok(None);
        }

        let session = SessionRecord {
            timestamp: now.to_rfc3339(),
            total_reviewed: metrics.total_reviewed,
            liked: metrics.liked,
            disliked: metrics.disliked,
            maybe: metrics.maybe,
            precision: metrics.precision,
        };
        self.history.sessions.push(session.clone());

        let excess = self.history.sessions.len().saturating_sub(MAX_SESSIONS);
        if excess > 0 {
            self.history.sessions.drain(..excess);
        }

        self.recompute_overall(now);
        self.recompute_weekly_buckets();
        self.store.save(&self.history)?;

        Ok(Some(session))
    }

    /// Cumulative precision over the retained session window. Sessions
    /// trimmed past the cap stop contributing.
    fn recompute_overall(&mut self, now: DateTime<Utc>) {
        let sessions = &self.history.sessions;
        if sessions.is_empty() {
            return;
        }

        let total_liked: u32 = sessions.iter().map(|session| session.liked).sum();
        let total_disliked: u32 = sessions.iter().map(|session| session.disliked).sum();
        let total_maybe: u32 = sessions.iter().map(|session| session.maybe).sum();
        let total_reviewed: u32 = sessions.iter().map(|session| session.total_reviewed).sum();
        if total_reviewed == 0 {
            return;
        }

        self.history.overall_accuracy = Some(OverallAccuracy {
            total_reviewed,
            total_liked,
            total_disliked,
            total_maybe,
            precision: round3(f64::from(total_liked) / f64::from(total_reviewed)),
            last_updated: now.to_rfc3339(),
        });
    }

    fn recompute_weekly_buckets(&mut self) {
        let mut weekly = BTreeMap::<String, (u32, u32, u32, u32)>::new();

        for session in &self.history.sessions {
            let timestamp = match DateTime::parse_from_rfc3339(&session.timestamp) {
                Ok(timestamp) => timestamp.with_timezone(&Utc),
                Err(err) => {
                    tracing::warn!(
                        timestamp = %session.timestamp,
                        %err,
                        "skipping session with unparseable timestamp"
                    );
                    continue;
                }
            };

            let week = timestamp.format("%Y-W%W").to_string();
            let bucket = weekly.entry(week).or_insert((0, 0, 0, 0));
            bucket.0 += session.liked;
            bucket.1 += session.disliked;
            bucket.2 += session.maybe;
            bucket.3 += session.total_reviewed;
        }

        let mut periods: Vec<WeeklyBucket> = weekly
            .into_iter()
            .filter(|(_, (_, _, _, total))| *total > 0)
            .map(|(week, (liked, disliked, _, total))| WeeklyBucket {
                week,
                accuracy: round3(f64::from(liked) / f64::from(total)),
                sample_size: total,
                liked,
                disliked,
            })
            .collect();

        let excess = periods.len().saturating_sub(MAX_WEEKLY_BUCKETS);
        if excess > 0 {
            periods.drain(..excess);
        }
        self.history.by_time_period = periods;
    }

    /// Classify the accuracy trend from the weekly buckets.
    pub fn trend(&self) -> TrendReport {
        let periods = &self.history.by_time_period;

        if periods.len() < TREND_RECENT_BUCKETS {
            return TrendReport {
                trend: TrendLabel::InsufficientData,
                message: "Need at least 2 weeks of data for trend analysis".to_string(),
                current_accuracy: periods.last().map(|period| period.accuracy),
                periods: periods.clone(),
            };
        }

        let split = periods.len() - TREND_RECENT_BUCKETS;
        let (older, recent) = periods.split_at(split);
        let recent_avg = mean_accuracy(recent);

        let (trend, message) = if older.is_empty() {
            (
                TrendLabel::Establishing,
                format!("Current accuracy: {}", format_percent(recent_avg)),
            )
        } else {
            let older_avg = mean_accuracy(older);
            if recent_avg > older_avg + TREND_THRESHOLD {
                (
                    TrendLabel::Improving,
                    format!(
                        "Accuracy improving: {} -> {}",
                        format_percent(older_avg),
                        format_percent(recent_avg)
                    ),
                )
            } else if recent_avg < older_avg - TREND_THRESHOLD {
                (
                    TrendLabel::Declining,
                    format!(
                        "Accuracy declining: {} -> {}",
                        format_percent(older_avg),
                        format_percent(recent_avg)
                    ),
                )
            } else {
                (
                    TrendLabel::Stable,
                    format!("Accuracy stable around {}", format_percent(recent_avg)),
                )
            }
        };

        TrendReport {
            trend,
            message,
            current_accuracy: Some(round3(recent_avg)),
            periods: periods.clone(),
        }
    }

    pub fn summary(&self) -> AccuracySummary {
        let trend = self.trend();
        let overall = self.history.overall_accuracy.as_ref();

        AccuracySummary {
            total_jobs_reviewed: overall.map(|overall| overall.total_reviewed).unwrap_or(0),
            overall_precision: overall.map(|overall| overall.precision).unwrap_or(0.0),
            trend: trend.trend,
            trend_message: trend.message,
            sessions_recorded: self.history.sessions.len(),
        }
    }
}

fn mean_accuracy(periods: &[WeeklyBucket]) -> f64 {
    if periods.is_empty() {
        return 0.0;
    }
    periods.iter().map(|period| period.accuracy).sum::<f64>() / periods.len() as f64
}
