//! Contract types exchanged between the signal extraction pass and the
//! components that consume it. Everything here is recomputed per call;
//! only `SignalBundle` is ever persisted, embedded inside the learned
//! preferences document.

use serde::{Deserialize, Serialize};

/// One counted value inside a category, e.g. a company name seen 4 times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignalCount {
    pub value: String,
    pub count: u32,
}

/// Ranked category counts for one review outcome (liked, disliked or
/// maybe). Each list is sorted count-descending, ties broken
/// alphabetically, and capped by the extraction pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorySignals {
    pub companies: Vec<SignalCount>,
    pub title_keywords: Vec<SignalCount>,
    pub technologies: Vec<SignalCount>,
    pub locations: Vec<SignalCount>,
    pub job_types: Vec<SignalCount>,
}

impl CategorySignals {
    pub fn keyword_count(&self, keyword: &str) -> u32 {
        count_of(&self.title_keywords, keyword)
    }

    pub fn company_count(&self, company: &str) -> u32 {
        count_of(&self.companies, company)
    }
}

fn count_of(entries: &[SignalCount], value: &str) -> u32 {
    entries
        .iter()
        .find(|entry| entry.value == value)
        .map(|entry| entry.count)
        .unwrap_or(0)
}

/// A title keyword whose liked/disliked counts diverge enough to act on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordSignal {
    pub keyword: String,
    pub liked_count: u32,
    pub disliked_count: u32,
    pub ratio: f64,
}

/// A company the user has consistently liked or disliked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompanySignal {
    pub company: String,
    pub liked_count: u32,
    pub disliked_count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DifferentialSignals {
    pub strong_positives: Vec<KeywordSignal>,
    pub strong_negatives: Vec<KeywordSignal>,
    pub liked_companies: Vec<CompanySignal>,
    pub disliked_companies: Vec<CompanySignal>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackStats {
    pub liked_count: u32,
    pub disliked_count: u32,
    pub maybe_count: u32,
    pub total_reviewed: u32,
}

/// Aggregated signals for one pass over the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SignalBundle {
    pub positive_signals: CategorySignals,
    pub negative_signals: CategorySignals,
    pub uncertain_signals: CategorySignals,
    pub differential_signals: DifferentialSignals,
    pub stats: FeedbackStats,
}

/// Filtering accuracy for the catalog's reviewed jobs. All rates are in
/// [0, 1] and liked + maybe + disliked always equals total_reviewed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccuracyMetrics {
    pub total_reviewed: u32,
    pub liked: u32,
    pub maybe: u32,
    pub disliked: u32,
    pub true_positive_rate: f64,
    pub false_positive_rate: f64,
    pub uncertain_rate: f64,
    pub precision: f64,
    pub message: String,
}

impl AccuracyMetrics {
    /// Sentinel for a catalog with no reviewed jobs; no rates are derived.
    pub fn empty() -> Self {
        Self {
            message: "No feedback data yet".to_string(),
            ..Self::default()
        }
    }
}

/// Keyword signals ranked by ratio, strongest first, capped at `limit`.
pub fn top_by_ratio(signals: &[KeywordSignal], limit: usize) -> Vec<&KeywordSignal> {
    let mut ranked: Vec<&KeywordSignal> = signals.iter().collect();
    ranked.sort_by(|left, right| right.ratio.total_cmp(&left.ratio));
    ranked.truncate(limit);
    ranked
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Renders a rate in [0, 1] as a whole percentage, e.g. 0.347 -> "35%".
pub fn format_percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metrics_carry_the_sentinel_message() {
        let metrics = AccuracyMetrics::empty();
        assert_eq!(metrics.total_reviewed, 0);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.message, "No feedback data yet");
    }

    #[test]
    fn top_by_ratio_orders_strongest_first() {
        let signals = vec![
            KeywordSignal {
                keyword: "python".to_string(),
                liked_count: 3,
                disliked_count: 1,
                ratio: 3.0,
            },
            KeywordSignal {
                keyword: "research".to_string(),
                liked_count: 5,
                disliked_count: 0,
                ratio: 5.0,
            },
            KeywordSignal {
                keyword: "clinical".to_string(),
                liked_count: 2,
                disliked_count: 0,
                ratio: 2.0,
            },
        ];

        let top = top_by_ratio(&signals, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].keyword, "research");
        assert_eq!(top[1].keyword, "python");
    }

    #[test]
    fn rounding_and_percent_rendering() {
        assert_eq!(round3(1.0 / 3.0), 0.333);
        assert_eq!(round2(7.0 / 3.0), 2.33);
        assert_eq!(format_percent(0.6), "60%");
        assert_eq!(format_percent(0.347), "35%");
    }

    #[test]
    fn category_lookup_defaults_to_zero() {
        let signals = CategorySignals {
            title_keywords: vec![SignalCount {
                value: "graduate".to_string(),
                count: 4,
            }],
            ..CategorySignals::default()
        };
        assert_eq!(signals.keyword_count("graduate"), 4);
        assert_eq!(signals.keyword_count("senior"), 0);
    }
}
