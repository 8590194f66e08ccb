//! Signal extraction over the job catalog.
//!
//! Pure in-memory aggregation: counts companies, title keywords, known
//! technologies, locations and job types per review outcome, then derives
//! the liked-vs-disliked differentials and the accuracy metrics everything
//! downstream feeds on. Never fails; an empty catalog yields zeroed
//! counters.

use regex::Regex;
use scout_core::feedback::{
    round2, round3, AccuracyMetrics, CategorySignals, CompanySignal, DifferentialSignals,
    FeedbackStats, KeywordSignal, SignalBundle, SignalCount,
};
use scout_core::{jobs_by_status, JobCatalog, JobRecord, JobStatus};
use std::collections::BTreeMap;

pub const MAX_COMPANIES: usize = 15;
pub const MAX_TITLE_KEYWORDS: usize = 30;
pub const MAX_TECHNOLOGIES: usize = 15;
pub const MAX_LOCATIONS: usize = 10;
pub const MAX_JOB_TYPES: usize = 5;

/// A keyword counts as a strong signal when it appears at least this often
/// on one side and more than KEYWORD_RATIO times the other side's count.
pub const MIN_KEYWORD_OCCURRENCES: u32 = 2;
pub const KEYWORD_RATIO: u32 = 2;

/// Companies only need a raw majority, not a ratio; company samples are
/// far sparser than keyword samples.
pub const MIN_COMPANY_OCCURRENCES: u32 = 2;

const MIN_REVIEWS_FOR_MESSAGE: u32 = 10;
const PRECISION_EXCELLENT: f64 = 0.6;
const PRECISION_GOOD: f64 = 0.4;
const PRECISION_MODERATE: f64 = 0.2;

/// Fixed technology and domain vocabulary matched as substrings of the
/// description plus AI summary.
const TECH_KEYWORDS: &[&str] = &[
    "pytorch",
    "tensorflow",
    "python",
    "ml",
    "ai",
    "machine learning",
    "deep learning",
    "healthcare",
    "medical",
    "clinical",
    "biomedical",
    "data science",
    "computer vision",
    "nlp",
    "research",
    "graduate",
    "scheme",
    "programme",
    "junior",
    "entry",
    "intern",
];

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "are", "from", "will", "have", "has",
];

/// Placeholder company values written by scrapers that never identified
/// the employer.
const COMPANY_PLACEHOLDERS: &[&str] =
    &["unknown", "linkedin job", "indeed listing", "glassdoor listing"];

/// Aggregate the catalog's reviewed jobs into a full signal bundle.
pub fn extract_signals(catalog: &JobCatalog) -> SignalBundle {
    let liked = jobs_by_status(catalog, &JobStatus::Liked);
    let disliked = jobs_by_status(catalog, &JobStatus::Disliked);
    let maybe = jobs_by_status(catalog, &JobStatus::Maybe);

    let positive = analyze_jobs(&liked);
    let negative = analyze_jobs(&disliked);
    let uncertain = analyze_jobs(&maybe);
    let differential = find_differentiators(&positive, &negative);

    let stats = FeedbackStats {
        liked_count: liked.len() as u32,
        disliked_count: disliked.len() as u32,
        maybe_count: maybe.len() as u32,
        total_reviewed: (liked.len() + disliked.len() + maybe.len()) as u32,
    };

    SignalBundle {
        positive_signals: positive,
        negative_signals: negative,
        uncertain_signals: uncertain,
        differential_signals: differential,
        stats,
    }
}

/// Filtering accuracy over the catalog's reviewed jobs. Returns the zero
/// sentinel when nothing has been reviewed yet.
pub fn accuracy_metrics(catalog: &JobCatalog) -> AccuracyMetrics {
    let liked = jobs_by_status(catalog, &JobStatus::Liked).len() as u32;
    let maybe = jobs_by_status(catalog, &JobStatus::Maybe).len() as u32;
    let disliked = jobs_by_status(catalog, &JobStatus::Disliked).len() as u32;
    let total = liked + maybe + disliked;

    if total == 0 {
        return AccuracyMetrics::empty();
    }

    let precision = f64::from(liked) / f64::from(total);
    AccuracyMetrics {
        total_reviewed: total,
        liked,
        maybe,
        disliked,
        true_positive_rate: round3(f64::from(liked) / f64::from(total)),
        false_positive_rate: round3(f64::from(disliked) / f64::from(total)),
        uncertain_rate: round3(f64::from(maybe) / f64::from(total)),
        precision: round3(precision),
        message: accuracy_message(precision, total),
    }
}

fn accuracy_message(precision: f64, total: u32) -> String {
    if total < MIN_REVIEWS_FOR_MESSAGE {
        "Not enough data yet (need 10+ reviews)".to_string()
    } else if precision >= PRECISION_EXCELLENT {
        "Excellent! Filtering is well-calibrated to your preferences".to_string()
    } else if precision >= PRECISION_GOOD {
        "Good calibration, with room for improvement".to_string()
    } else if precision >= PRECISION_MODERATE {
        "Moderate accuracy - learning from your feedback to improve".to_string()
    } else {
        "Low accuracy - significant learning needed".to_string()
    }
}

fn analyze_jobs(jobs: &[&JobRecord]) -> CategorySignals {
    let mut companies = BTreeMap::<String, u32>::new();
    let mut title_words = BTreeMap::<String, u32>::new();
    let mut technologies = BTreeMap::<String, u32>::new();
    let mut locations = BTreeMap::<String, u32>::new();
    let mut job_types = BTreeMap::<String, u32>::new();

    let word_pattern = Regex::new(r"\b[a-z]{3,}\b").expect("valid regex");

    for job in jobs {
        let company = job
            .company
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
            .trim()
            .to_string();
        if !company.is_empty() && !COMPANY_PLACEHOLDERS.contains(&company.as_str()) {
            *companies.entry(company).or_insert(0) += 1;
        }

        let title = job.title.to_lowercase();
        for word in word_pattern.find_iter(&title) {
            let word = word.as_str();
            if !STOP_WORDS.contains(&word) {
                *title_words.entry(word.to_string()).or_insert(0) += 1;
            }
        }

        let description = format!(
            "{} {}",
            job.description.as_deref().unwrap_or_default(),
            job.ai_summary.as_deref().unwrap_or_default()
        )
        .to_lowercase();
        for tech in TECH_KEYWORDS {
            if description.contains(tech) {
                *technologies.entry((*tech).to_string()).or_insert(0) += 1;
            }
        }

        let location = job
            .city
            .as_deref()
            .or(job.location.as_deref())
            .unwrap_or_default()
            .to_lowercase();
        if !location.is_empty() {
            *locations.entry(location).or_insert(0) += 1;
        }

        let job_type = job.job_type.as_deref().unwrap_or_default().to_lowercase();
        if !job_type.is_empty() {
            *job_types.entry(job_type).or_insert(0) += 1;
        }
    }

    CategorySignals {
        companies: rank(companies, MAX_COMPANIES),
        title_keywords: rank(title_words, MAX_TITLE_KEYWORDS),
        technologies: rank(technologies, MAX_TECHNOLOGIES),
        locations: rank(locations, MAX_LOCATIONS),
        job_types: rank(job_types, MAX_JOB_TYPES),
    }
}

fn rank(counts: BTreeMap<String, u32>, limit: usize) -> Vec<SignalCount> {
    let mut entries: Vec<SignalCount> = counts
        .into_iter()
        .map(|(value, count)| SignalCount { value, count })
        .collect();
    entries.sort_by(|left, right| {
        right
            .count
            .cmp(&left.count)
            .then_with(|| left.value.cmp(&right.value))
    });
    entries.truncate(limit);
    entries
}

/// Keywords and companies whose liked/disliked counts diverge enough to be
/// treated as reliable preference indicators. Operates on the already
/// ranked (and capped) category signals.
pub fn find_differentiators(
    liked: &CategorySignals,
    disliked: &CategorySignals,
) -> DifferentialSignals {
    let mut strong_positives = Vec::new();
    for entry in &liked.title_keywords {
        let disliked_count = disliked.keyword_count(&entry.value);
        if entry.count >= MIN_KEYWORD_OCCURRENCES && entry.count > disliked_count * KEYWORD_RATIO {
            strong_positives.push(KeywordSignal {
                keyword: entry.value.clone(),
                liked_count: entry.count,
                disliked_count,
                ratio: divergence_ratio(entry.count, disliked_count),
            });
        }
    }

    let mut strong_negatives = Vec::new();
    for entry in &disliked.title_keywords {
        let liked_count = liked.keyword_count(&entry.value);
        if entry.count >= MIN_KEYWORD_OCCURRENCES && entry.count > liked_count * KEYWORD_RATIO {
            strong_negatives.push(KeywordSignal {
                keyword: entry.value.clone(),
                liked_count,
                disliked_count: entry.count,
                ratio: divergence_ratio(entry.count, liked_count),
            });
        }
    }

    let mut liked_companies = Vec::new();
    for entry in &liked.companies {
        if entry.count >= MIN_COMPANY_OCCURRENCES {
            let disliked_count = disliked.company_count(&entry.value);
            if entry.count > disliked_count {
                liked_companies.push(CompanySignal {
                    company: entry.value.clone(),
                    liked_count: entry.count,
                    disliked_count,
                });
            }
        }
    }

    let mut disliked_companies = Vec::new();
    for entry in &disliked.companies {
        if entry.count >= MIN_COMPANY_OCCURRENCES {
            let liked_count = liked.company_count(&entry.value);
            if entry.count > liked_count {
                disliked_companies.push(CompanySignal {
                    company: entry.value.clone(),
                    liked_count,
                    disliked_count: entry.count,
                });
            }
        }
    }

    DifferentialSignals {
        strong_positives,
        strong_negatives,
        liked_companies,
        disliked_companies,
    }
}

fn divergence_ratio(count: u32, other: u32) -> f64 {
    round2(f64::from(count) / f64::from(other.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn job(title: &str, company: &str, status: JobStatus) -> JobRecord {
        JobRecord {
            title: title.to_string(),
            status,
            company: Some(company.to_string()),
            location: Some("UK".to_string()),
            city: Some("London".to_string()),
            job_type: Some("Industry".to_string()),
            description: Some("Machine learning with PyTorch".to_string()),
            ai_summary: Some("Graduate research role".to_string()),
            deadline: None,
            extra: HashMap::new(),
        }
    }

    fn catalog(jobs: Vec<JobRecord>) -> JobCatalog {
        jobs.into_iter()
            .enumerate()
            .map(|(index, job)| (format!("https://jobs.example/{index}"), job))
            .collect()
    }

    #[test]
    fn stats_counts_add_up() {
        let catalog = catalog(vec![
            job("ML Engineer", "Acme", JobStatus::Liked),
            job("ML Engineer", "Acme", JobStatus::Liked),
            job("Sales Lead", "Spamco", JobStatus::Disliked),
            job("Data Analyst", "Midco", JobStatus::Maybe),
            job("Unreviewed", "Other", JobStatus::New),
        ]);

        let bundle = extract_signals(&catalog);
        assert_eq!(bundle.stats.liked_count, 2);
        assert_eq!(bundle.stats.disliked_count, 1);
        assert_eq!(bundle.stats.maybe_count, 1);
        assert_eq!(
            bundle.stats.total_reviewed,
            bundle.stats.liked_count + bundle.stats.disliked_count + bundle.stats.maybe_count
        );
    }

    #[test]
    fn placeholder_companies_and_stop_words_are_excluded() {
        let catalog = catalog(vec![
            job("The Graduate Scheme for Research", "Unknown", JobStatus::Liked),
            job("Research with the Team", "LinkedIn Job", JobStatus::Liked),
        ]);

        let bundle = extract_signals(&catalog);
        assert!(bundle.positive_signals.companies.is_empty());

        let words: Vec<&str> = bundle
            .positive_signals
            .title_keywords
            .iter()
            .map(|entry| entry.value.as_str())
            .collect();
        assert!(words.contains(&"research"));
        assert!(!words.contains(&"the"));
        assert!(!words.contains(&"for"));
        assert!(!words.contains(&"with"));
    }

    #[test]
    fn strong_positive_needs_double_the_disliked_count() {
        let liked = CategorySignals {
            title_keywords: vec![
                SignalCount {
                    value: "clinical".to_string(),
                    count: 4,
                },
                SignalCount {
                    value: "platform".to_string(),
                    count: 3,
                },
            ],
            ..CategorySignals::default()
        };
        let disliked = CategorySignals {
            title_keywords: vec![
                SignalCount {
                    value: "clinical".to_string(),
                    count: 1,
                },
                SignalCount {
                    value: "platform".to_string(),
                    count: 2,
                },
            ],
            ..CategorySignals::default()
        };

        let differentials = find_differentiators(&liked, &disliked);
        let positives: Vec<&str> = differentials
            .strong_positives
            .iter()
            .map(|signal| signal.keyword.as_str())
            .collect();
        // 4 > 2*1 qualifies; 3 > 2*2 does not.
        assert_eq!(positives, vec!["clinical"]);
        assert_eq!(differentials.strong_positives[0].ratio, 4.0);
    }

    #[test]
    fn company_rule_is_a_raw_majority() {
        let liked = CategorySignals {
            companies: vec![
                SignalCount {
                    value: "acme".to_string(),
                    count: 2,
                },
                SignalCount {
                    value: "solo".to_string(),
                    count: 1,
                },
            ],
            ..CategorySignals::default()
        };
        let disliked = CategorySignals {
            companies: vec![SignalCount {
                value: "acme".to_string(),
                count: 1,
            }],
            ..CategorySignals::default()
        };

        let differentials = find_differentiators(&liked, &disliked);
        assert_eq!(differentials.liked_companies.len(), 1);
        assert_eq!(differentials.liked_companies[0].company, "acme");
        assert!(differentials.disliked_companies.is_empty());
    }

    #[test]
    fn ratio_never_divides_by_zero() {
        assert_eq!(divergence_ratio(5, 0), 5.0);
        assert_eq!(divergence_ratio(5, 2), 2.5);
    }

    #[test]
    fn accuracy_sentinel_on_empty_catalog() {
        let metrics = accuracy_metrics(&JobCatalog::new());
        assert_eq!(metrics.total_reviewed, 0);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.message, "No feedback data yet");
    }

    #[test]
    fn accuracy_rates_are_consistent() {
        let mut jobs = Vec::new();
        for _ in 0..6 {
            jobs.push(job("ML Engineer", "Acme", JobStatus::Liked));
        }
        for _ in 0..3 {
            jobs.push(job("Sales Lead", "Spamco", JobStatus::Disliked));
        }
        jobs.push(job("Data Analyst", "Midco", JobStatus::Maybe));
        let catalog = catalog(jobs);

        let metrics = accuracy_metrics(&catalog);
        assert_eq!(metrics.total_reviewed, 10);
        assert_eq!(metrics.liked + metrics.maybe + metrics.disliked, 10);
        assert_eq!(metrics.precision, 0.6);
        assert!(metrics.precision >= 0.0 && metrics.precision <= 1.0);
        assert!(metrics.message.starts_with("Excellent"));
    }

    #[test]
    fn category_caps_hold() {
        let mut jobs = Vec::new();
        for index in 0..40 {
            let mut record = job("Engineer", &format!("Company {index}"), JobStatus::Liked);
            record.title = format!("Engineer specialty{index} role");
            jobs.push(record);
        }
        let catalog = catalog(jobs);

        let bundle = extract_signals(&catalog);
        assert!(bundle.positive_signals.companies.len() <= MAX_COMPANIES);
        assert!(bundle.positive_signals.title_keywords.len() <= MAX_TITLE_KEYWORDS);
        assert!(bundle.positive_signals.technologies.len() <= MAX_TECHNOLOGIES);
    }
}
