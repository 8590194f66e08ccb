//! Learned preferences: the document that closes the feedback loop.
//!
//! Each learn pass rewrites the whole document: the latest accuracy
//! snapshot, the discovered signal bundle, a rendered guidance block for
//! the downstream prompt builder, and a recommended strictness level from
//! a fixed lookup on (precision, total reviewed).

use chrono::{DateTime, Utc};
use scout_core::feedback::{format_percent, top_by_ratio, AccuracyMetrics, SignalBundle};
use scout_core::{JobCatalog, StrictnessLevel};
use scout_storage::{Document, DocumentStore, LoadSource, StoreError};
use serde::{Deserialize, Serialize};

use crate::signals::{accuracy_metrics, extract_signals};

/// Below this many reviews the guidance block is just a disclaimer.
pub const MIN_REVIEWS_FOR_NOTES: u32 = 5;

/// Below this many reviews the strictness recommendation stays moderate.
pub const MIN_REVIEWS_FOR_STRICTNESS: u32 = 10;

/// Precision breakpoints of the strictness lookup. Observable behavior
/// depends on the exact values; they are not re-derived.
pub const PRECISION_VERY_LOW: f64 = 0.2;
pub const PRECISION_LOW: f64 = 0.35;
pub const PRECISION_CALIBRATED: f64 = 0.5;
pub const PRECISION_HIGH: f64 = 0.7;

/// Precision bounds of the closing guidance directive.
const GUIDANCE_TIGHTEN_BELOW: f64 = 0.3;
const GUIDANCE_KEEP_ABOVE: f64 = 0.6;

const MAX_NOTE_KEYWORDS: usize = 7;
const MAX_NOTE_COMPANIES: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearnedPreferences {
    pub version: String,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub learning_stats: LearningStats,
    #[serde(default)]
    pub discovered_patterns: SignalBundle,
    #[serde(default)]
    pub dynamic_personalization_notes: String,
    #[serde(default)]
    pub strictness_adjustment: StrictnessAdjustment,
}

impl Default for LearnedPreferences {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            last_updated: None,
            learning_stats: LearningStats::default(),
            discovered_patterns: SignalBundle::default(),
            dynamic_personalization_notes: String::new(),
            strictness_adjustment: StrictnessAdjustment::default(),
        }
    }
}

impl Document for LearnedPreferences {
    const FILE_NAME: &'static str = "learned_preferences.json";
    const VERSION: &'static str = "1.0";

    fn version(&self) -> &str {
        &self.version
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct LearningStats {
    pub total_feedback_processed: u32,
    pub liked_count: u32,
    pub disliked_count: u32,
    pub maybe_count: u32,
    pub precision: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrictnessAdjustment {
    pub current: StrictnessLevel,
    pub recommended: StrictnessLevel,
    pub reason: String,
}

impl Default for StrictnessAdjustment {
    fn default() -> Self {
        Self {
            current: StrictnessLevel::Moderate,
            recommended: StrictnessLevel::Moderate,
            reason: "No feedback data yet".to_string(),
        }
    }
}

/// What one learn pass produced, for the caller's own reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningReport {
    pub patterns_found: usize,
    pub negative_patterns_found: usize,
    pub metrics: AccuracyMetrics,
    pub notes_generated: bool,
    pub recommended_strictness: StrictnessLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearningSummary {
    pub last_updated: Option<String>,
    pub stats: LearningStats,
    pub strictness: StrictnessAdjustment,
    pub has_learned_data: bool,
}

pub struct PreferenceEngine {
    store: DocumentStore,
    prefs: LearnedPreferences,
    source: LoadSource,
}

impl PreferenceEngine {
    pub fn open(store: DocumentStore) -> Self {
        let outcome = store.load::<LearnedPreferences>();
        Self {
            store,
            prefs: outcome.document,
            source: outcome.source,
        }
    }

    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    pub fn preferences(&self) -> &LearnedPreferences {
        &self.prefs
    }

    /// Analyze the catalog and rewrite the whole preferences document.
    pub fn learn_from_feedback(
        &mut self,
        catalog: &JobCatalog,
        now: DateTime<Utc>,
    ) -> Result<LearningReport, StoreError> {
        let bundle = extract_signals(catalog);
        let metrics = accuracy_metrics(catalog);

        self.prefs.last_updated = Some(now.to_rfc3339());
        self.prefs.learning_stats = LearningStats {
            total_feedback_processed: metrics.total_reviewed,
            liked_count: metrics.liked,
            disliked_count: metrics.disliked,
            maybe_count: metrics.maybe,
            precision: metrics.precision,
        };
        self.prefs.dynamic_personalization_notes = render_notes(&bundle, &metrics);
        self.prefs.strictness_adjustment =
            recommend_strictness(metrics.precision, metrics.total_reviewed);
        self.prefs.discovered_patterns = bundle;

        self.store.save(&self.prefs)?;

        let differentials = &self.prefs.discovered_patterns.differential_signals;
        Ok(LearningReport {
            patterns_found: differentials.strong_positives.len(),
            negative_patterns_found: differentials.strong_negatives.len(),
            notes_generated: !self.prefs.dynamic_personalization_notes.is_empty(),
            recommended_strictness: self.prefs.strictness_adjustment.recommended.clone(),
            metrics,
        })
    }

    /// The rendered guidance block for the prompt-building collaborator.
    pub fn dynamic_notes(&self) -> &str {
        &self.prefs.dynamic_personalization_notes
    }

    pub fn strictness_recommendation(&self) -> StrictnessLevel {
        self.prefs.strictness_adjustment.recommended.clone()
    }

    pub fn learning_summary(&self) -> LearningSummary {
        LearningSummary {
            last_updated: self.prefs.last_updated.clone(),
            stats: self.prefs.learning_stats,
            strictness: self.prefs.strictness_adjustment.clone(),
            has_learned_data: !self.prefs.dynamic_personalization_notes.is_empty(),
        }
    }
}

/// Deterministic text block injected into the downstream filtering prompt.
fn render_notes(bundle: &SignalBundle, metrics: &AccuracyMetrics) -> String {
    let rule = "=".repeat(50);
    let mut lines = vec![
        rule.clone(),
        "LEARNED FROM USER FEEDBACK".to_string(),
        rule.clone(),
    ];

    if metrics.total_reviewed < MIN_REVIEWS_FOR_NOTES {
        lines.push(format!(
            "\n(Only {} jobs reviewed so far - need more data)",
            metrics.total_reviewed
        ));
        return lines.join("\n");
    }

    lines.push(format!(
        "\nFeedback summary: {} liked, {} disliked, {} maybe",
        metrics.liked, metrics.disliked, metrics.maybe
    ));
    lines.push(format!(
        "Current precision: {}",
        format_percent(metrics.precision)
    ));

    let differentials = &bundle.differential_signals;
    if !differentials.strong_positives.is_empty() {
        lines.push("\nSTRONGLY PREFERRED (user consistently likes these keywords):".to_string());
        for signal in top_by_ratio(&differentials.strong_positives, MAX_NOTE_KEYWORDS) {
            lines.push(format!(
                "  + '{}' (liked {}x vs disliked {}x)",
                signal.keyword, signal.liked_count, signal.disliked_count
            ));
        }
    }

    if !differentials.strong_negatives.is_empty() {
        lines.push("\nSTRONGLY AVOIDED (user consistently dislikes these keywords):".to_string());
        for signal in top_by_ratio(&differentials.strong_negatives, MAX_NOTE_KEYWORDS) {
            lines.push(format!(
                "  - '{}' (disliked {}x vs liked {}x)",
                signal.keyword, signal.disliked_count, signal.liked_count
            ));
        }
    }

    if !differentials.liked_companies.is_empty() {
        lines.push("\nPREFERRED COMPANIES (user has liked multiple jobs from):".to_string());
        for signal in differentials.liked_companies.iter().take(MAX_NOTE_COMPANIES) {
            lines.push(format!(
                "  + {} ({} liked)",
                signal.company, signal.liked_count
            ));
        }
    }

    if !differentials.disliked_companies.is_empty() {
        lines.push("\nAVOIDED COMPANIES (user has disliked multiple jobs from):".to_string());
        for signal in differentials
            .disliked_companies
            .iter()
            .take(MAX_NOTE_COMPANIES)
        {
            lines.push(format!(
                "  - {} ({} disliked)",
                signal.company, signal.disliked_count
            ));
        }
    }

    if metrics.precision < GUIDANCE_TIGHTEN_BELOW {
        lines.push(format!(
            "\nFILTERING GUIDANCE: User only liked {} of suggestions.",
            format_percent(metrics.precision)
        ));
        lines.push("  -> Be MORE selective! Apply stricter criteria.".to_string());
        lines.push("  -> Prioritize jobs with the STRONGLY PREFERRED keywords above.".to_string());
    } else if metrics.precision > GUIDANCE_KEEP_ABOVE {
        lines.push(format!(
            "\nFILTERING GUIDANCE: User liked {} of suggestions.",
            format_percent(metrics.precision)
        ));
        lines.push("  -> Good calibration! Continue with current approach.".to_string());
    }

    lines.push(format!("\n{rule}"));
    lines.join("\n")
}

/// Fixed lookup from (precision, total reviewed) to a strictness
/// recommendation. Every reason embeds the numeric precision.
pub fn recommend_strictness(precision: f64, total_reviewed: u32) -> StrictnessAdjustment {
    if total_reviewed < MIN_REVIEWS_FOR_STRICTNESS {
        return StrictnessAdjustment {
            current: StrictnessLevel::Moderate,
            recommended: StrictnessLevel::Moderate,
            reason: "Not enough feedback data yet (need 10+ reviews)".to_string(),
        };
    }

    let percent = format_percent(precision);
    if precision < PRECISION_VERY_LOW {
        StrictnessAdjustment {
            current: StrictnessLevel::Lenient,
            recommended: StrictnessLevel::Strict,
            reason: format!("Very low precision ({percent}) - too many irrelevant jobs passing filter"),
        }
    } else if precision < PRECISION_LOW {
        StrictnessAdjustment {
            current: StrictnessLevel::Lenient,
            recommended: StrictnessLevel::Moderate,
            reason: format!("Low precision ({percent}) - tighten filtering somewhat"),
        }
    } else if precision < PRECISION_CALIBRATED {
        StrictnessAdjustment {
            current: StrictnessLevel::Moderate,
            recommended: StrictnessLevel::Moderate,
            reason: format!("Moderate precision ({percent}) - filtering calibrated reasonably"),
        }
    } else if precision < PRECISION_HIGH {
        StrictnessAdjustment {
            current: StrictnessLevel::Moderate,
            recommended: StrictnessLevel::Lenient,
            reason: format!("Good precision ({percent}) - could explore more opportunities"),
        }
    } else {
        StrictnessAdjustment {
            current: StrictnessLevel::Strict,
            recommended: StrictnessLevel::VeryLenient,
            reason: format!("High precision ({percent}) - may be missing good opportunities, try wider net"),
        }
    }
}
