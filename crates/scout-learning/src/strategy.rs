//! Autonomous strategy control.
//!
//! Converts the learned preferences into concrete search/filter
//! parameters: strictness level, search breadth, prioritized keywords and
//! prioritized companies. Every applied change is appended to a bounded
//! decision log for transparency; recommendations that need a human stay
//! in a pending queue this module never resolves on its own.

use chrono::{DateTime, Utc};
use scout_core::feedback::{format_percent, top_by_ratio};
use scout_core::{SearchBreadth, StrictnessLevel};
use scout_storage::{Document, DocumentStore, LoadSource, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MAX_DECISIONS: usize = 50;
pub const MAX_FOCUS_KEYWORDS: usize = 5;
pub const MAX_FOCUS_COMPANIES: usize = 5;

/// Breadth is only adjusted once this much feedback has accumulated.
pub const MIN_FEEDBACK_FOR_BREADTH: u32 = 20;

/// Breadth thresholds; precision inside the band changes nothing, which
/// gives the rule its hysteresis.
pub const PRECISION_NARROW_BELOW: f64 = 0.25;
pub const PRECISION_WIDEN_ABOVE: f64 = 0.6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyState {
    pub version: String,
    #[serde(default)]
    pub current_strategy: CurrentStrategy,
    #[serde(default)]
    pub autonomous_decisions: Vec<DecisionRecord>,
    #[serde(default)]
    pub pending_recommendations: Vec<PendingRecommendation>,
}

impl Default for StrategyState {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            current_strategy: CurrentStrategy::default(),
            autonomous_decisions: Vec::new(),
            pending_recommendations: Vec::new(),
        }
    }
}

impl Document for StrategyState {
    const FILE_NAME: &'static str = "strategy_state.json";
    const VERSION: &'static str = "1.0";

    fn version(&self) -> &str {
        &self.version
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CurrentStrategy {
    pub strictness_level: StrictnessLevel,
    pub search_breadth: SearchBreadth,
    pub query_focus: Vec<String>,
    pub company_priorities: Vec<String>,
}

/// One applied decision. The action payload varies by decision type, so
/// it is a tagged union rather than a grab-bag of optional fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionRecord {
    pub timestamp: String,
    pub reason: String,
    pub impact: String,
    #[serde(flatten)]
    pub action: DecisionAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "decision_type", rename_all = "snake_case")]
pub enum DecisionAction {
    AdjustStrictness {
        from: StrictnessLevel,
        to: StrictnessLevel,
    },
    UpdateQueryFocus {
        keywords: Vec<String>,
        previous: Vec<String>,
    },
    PrioritizeCompanies {
        companies: Vec<String>,
        previous: Vec<String>,
    },
    AdjustSearchBreadth {
        from: SearchBreadth,
        to: SearchBreadth,
    },
}

impl DecisionAction {
    pub fn kind(&self) -> &'static str {
        match self {
            DecisionAction::AdjustStrictness { .. } => "adjust_strictness",
            DecisionAction::UpdateQueryFocus { .. } => "update_query_focus",
            DecisionAction::PrioritizeCompanies { .. } => "prioritize_companies",
            DecisionAction::AdjustSearchBreadth { .. } => "adjust_search_breadth",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingRecommendation {
    pub title: String,
    pub detail: String,
    pub created_at: String,
    pub status: RecommendationStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Pending,
    Resolved,
}

pub struct StrategyEngine {
    store: DocumentStore,
    state: StrategyState,
    source: LoadSource,
}

impl StrategyEngine {
    pub fn open(store: DocumentStore) -> Self {
        let outcome = store.load::<StrategyState>();
        Self {
            store,
            state: outcome.document,
            source: outcome.source,
        }
    }

    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    pub fn current_strategy(&self) -> &CurrentStrategy {
        &self.state.current_strategy
    }

    pub fn recent_decisions(&self, limit: usize) -> &[DecisionRecord] {
        let decisions = &self.state.autonomous_decisions;
        let start = decisions.len().saturating_sub(limit);
        &decisions[start..]
    }

    /// Run the four decision rules against the learned preferences and
    /// return the decisions actually applied. A rule whose recommended
    /// value already matches the current strategy produces nothing.
    pub fn decide(
        &mut self,
        prefs: &crate::preferences::LearnedPreferences,
        now: DateTime<Utc>,
    ) -> Result<Vec<DecisionRecord>, StoreError> {
        let mut decisions = Vec::new();

        if let Some(decision) = self.decide_strictness(prefs, now) {
            decisions.push(decision);
        }
        if let Some(decision) = self.decide_query_focus(prefs, now) {
            decisions.push(decision);
        }
        if let Some(decision) = self.decide_company_focus(prefs, now) {
            decisions.push(decision);
        }
        if let Some(decision) = self.decide_search_breadth(prefs, now) {
            decisions.push(decision);
        }

        for decision in &decisions {
            tracing::info!(
                decision = decision.action.kind(),
                impact = %decision.impact,
                "strategy decision applied"
            );
            self.state.autonomous_decisions.push(decision.clone());
        }
        let excess = self
            .state
            .autonomous_decisions
            .len()
            .saturating_sub(MAX_DECISIONS);
        if excess > 0 {
            self.state.autonomous_decisions.drain(..excess);
        }

        self.store.save(&self.state)?;
        Ok(decisions)
    }

    fn decide_strictness(
        &mut self,
        prefs: &crate::preferences::LearnedPreferences,
        now: DateTime<Utc>,
    ) -> Option<DecisionRecord> {
        let current = self.state.current_strategy.strictness_level.clone();
        let recommended = prefs.strictness_adjustment.recommended.clone();
        if recommended == current {
            return None;
        }

        self.state.current_strategy.strictness_level = recommended.clone();
        Some(DecisionRecord {
            timestamp: now.to_rfc3339(),
            reason: prefs.strictness_adjustment.reason.clone(),
            impact: format!("Filtering strictness changed from {current} to {recommended}"),
            action: DecisionAction::AdjustStrictness {
                from: current,
                to: recommended,
            },
        })
    }

    fn decide_query_focus(
        &mut self,
        prefs: &crate::preferences::LearnedPreferences,
        now: DateTime<Utc>,
    ) -> Option<DecisionRecord> {
        let positives = &prefs
            .discovered_patterns
            .differential_signals
            .strong_positives;
        if positives.is_empty() {
            return None;
        }

        let keywords: Vec<String> = top_by_ratio(positives, MAX_FOCUS_KEYWORDS)
            .into_iter()
            .map(|signal| signal.keyword.clone())
            .collect();
        let previous = self.state.current_strategy.query_focus.clone();
        if same_set(&keywords, &previous) {
            return None;
        }

        self.state.current_strategy.query_focus = keywords.clone();
        Some(DecisionRecord {
            timestamp: now.to_rfc3339(),
            reason: "Based on user preference patterns".to_string(),
            impact: format!("Search queries will prioritize: {}", keywords.join(", ")),
            action: DecisionAction::UpdateQueryFocus { keywords, previous },
        })
    }

    fn decide_company_focus(
        &mut self,
        prefs: &crate::preferences::LearnedPreferences,
        now: DateTime<Utc>,
    ) -> Option<DecisionRecord> {
        let liked = &prefs
            .discovered_patterns
            .differential_signals
            .liked_companies;
        if liked.is_empty() {
            return None;
        }

        let companies: Vec<String> = liked
            .iter()
            .take(MAX_FOCUS_COMPANIES)
            .map(|signal| signal.company.clone())
            .collect();
        let previous = self.state.current_strategy.company_priorities.clone();
        if same_set(&companies, &previous) {
            return None;
        }

        self.state.current_strategy.company_priorities = companies.clone();
        Some(DecisionRecord {
            timestamp: now.to_rfc3339(),
            reason: "User has shown consistent interest in these companies".to_string(),
            impact: format!("Will prioritize jobs from: {}", companies.join(", ")),
            action: DecisionAction::PrioritizeCompanies {
                companies,
                previous,
            },
        })
    }

    fn decide_search_breadth(
        &mut self,
        prefs: &crate::preferences::LearnedPreferences,
        now: DateTime<Utc>,
    ) -> Option<DecisionRecord> {
        let stats = &prefs.learning_stats;
        if stats.total_feedback_processed < MIN_FEEDBACK_FOR_BREADTH {
            return None;
        }

        let current = self.state.current_strategy.search_breadth.clone();
        let percent = format_percent(stats.precision);

        if stats.precision < PRECISION_NARROW_BELOW && current != SearchBreadth::Narrow {
            self.state.current_strategy.search_breadth = SearchBreadth::Narrow;
            return Some(DecisionRecord {
                timestamp: now.to_rfc3339(),
                reason: format!("Low precision ({percent}) - focusing on better-matched results"),
                impact: "Search will be more targeted, fewer but better results".to_string(),
                action: DecisionAction::AdjustSearchBreadth {
                    from: current,
                    to: SearchBreadth::Narrow,
                },
            });
        }

        if stats.precision > PRECISION_WIDEN_ABOVE && current != SearchBreadth::Wide {
            self.state.current_strategy.search_breadth = SearchBreadth::Wide;
            return Some(DecisionRecord {
                timestamp: now.to_rfc3339(),
                reason: format!("High precision ({percent}) - can explore more opportunities"),
                impact: "Search will cast wider net for more opportunities".to_string(),
                action: DecisionAction::AdjustSearchBreadth {
                    from: current,
                    to: SearchBreadth::Wide,
                },
            });
        }

        None
    }

    /// Queue a suggestion that needs the user's acknowledgment.
    pub fn add_recommendation(
        &mut self,
        title: impl Into<String>,
        detail: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.state.pending_recommendations.push(PendingRecommendation {
            title: title.into(),
            detail: detail.into(),
            created_at: now.to_rfc3339(),
            status: RecommendationStatus::Pending,
        });
        self.store.save(&self.state)
    }

    pub fn pending_recommendations(&self) -> Vec<&PendingRecommendation> {
        self.state
            .pending_recommendations
            .iter()
            .filter(|rec| rec.status == RecommendationStatus::Pending)
            .collect()
    }

    /// Human-readable strategy summary for any display surface.
    pub fn summary(&self) -> String {
        let strategy = &self.state.current_strategy;
        let mut lines = vec![
            "CURRENT STRATEGY".to_string(),
            "-".repeat(40),
            format!("  Strictness: {}", strategy.strictness_level),
            format!("  Search breadth: {}", strategy.search_breadth),
        ];

        if !strategy.query_focus.is_empty() {
            lines.push(format!(
                "  Query focus: {}",
                strategy.query_focus.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        if !strategy.company_priorities.is_empty() {
            lines.push(format!(
                "  Priority companies: {}",
                strategy
                    .company_priorities
                    .iter()
                    .take(3)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        let recent = self.recent_decisions(3);
        if !recent.is_empty() {
            lines.push("\nRECENT DECISIONS:".to_string());
            for decision in recent {
                let impact: String = decision.impact.chars().take(50).collect();
                lines.push(format!("  - {}: {}", decision.action.kind(), impact));
            }
        }

        lines.join("\n")
    }
}

fn same_set(left: &[String], right: &[String]) -> bool {
    left.iter().collect::<BTreeSet<_>>() == right.iter().collect::<BTreeSet<_>>()
}
