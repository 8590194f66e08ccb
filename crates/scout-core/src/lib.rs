use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

pub mod feedback;

/// The external job catalog: posting URL -> record. Read-only from this
/// core's perspective; the tracker that owns it writes extra fields we
/// must carry through untouched.
pub type JobCatalog = BTreeMap<String, JobRecord>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub status: JobStatus,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, rename = "type", alias = "job_type")]
    pub job_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ai_summary: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    New,
    Liked,
    Maybe,
    Disliked,
    Applied,
    Interview,
    Offer,
    Rejected,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::New
    }
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::New => "new",
            JobStatus::Liked => "liked",
            JobStatus::Maybe => "maybe",
            JobStatus::Disliked => "disliked",
            JobStatus::Applied => "applied",
            JobStatus::Interview => "interview",
            JobStatus::Offer => "offer",
            JobStatus::Rejected => "rejected",
        }
    }

    /// True for the statuses a user assigns during triage; everything else
    /// belongs to the application lifecycle.
    pub fn is_reviewed(&self) -> bool {
        matches!(
            self,
            JobStatus::Liked | JobStatus::Maybe | JobStatus::Disliked
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "new" => Ok(JobStatus::New),
            "liked" => Ok(JobStatus::Liked),
            "maybe" => Ok(JobStatus::Maybe),
            "disliked" => Ok(JobStatus::Disliked),
            "applied" => Ok(JobStatus::Applied),
            "interview" => Ok(JobStatus::Interview),
            "offer" => Ok(JobStatus::Offer),
            "rejected" => Ok(JobStatus::Rejected),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

/// Filter-leniency setting consumed by the downstream LLM filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrictnessLevel {
    Strict,
    Moderate,
    Lenient,
    VeryLenient,
}

impl Default for StrictnessLevel {
    fn default() -> Self {
        Self::Moderate
    }
}

impl StrictnessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrictnessLevel::Strict => "strict",
            StrictnessLevel::Moderate => "moderate",
            StrictnessLevel::Lenient => "lenient",
            StrictnessLevel::VeryLenient => "very_lenient",
        }
    }
}

impl fmt::Display for StrictnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrictnessLevel {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "strict" => Ok(StrictnessLevel::Strict),
            "moderate" => Ok(StrictnessLevel::Moderate),
            "lenient" => Ok(StrictnessLevel::Lenient),
            "very_lenient" | "very-lenient" => Ok(StrictnessLevel::VeryLenient),
            other => Err(format!("Unknown strictness level: {other}")),
        }
    }
}

/// Governs how many query variants the downstream search layer issues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchBreadth {
    Narrow,
    Wide,
}

impl Default for SearchBreadth {
    fn default() -> Self {
        Self::Wide
    }
}

impl SearchBreadth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchBreadth::Narrow => "narrow",
            SearchBreadth::Wide => "wide",
        }
    }
}

impl fmt::Display for SearchBreadth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchBreadth {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "narrow" => Ok(SearchBreadth::Narrow),
            "wide" => Ok(SearchBreadth::Wide),
            other => Err(format!("Unknown search breadth: {other}")),
        }
    }
}

/// All records in the catalog carrying the given status.
pub fn jobs_by_status<'a>(catalog: &'a JobCatalog, status: &JobStatus) -> Vec<&'a JobRecord> {
    catalog
        .values()
        .filter(|job| job.status == *status)
        .collect()
}
