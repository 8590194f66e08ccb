//! Proactive deadline scanning for jobs the user has shown interest in.
//!
//! Postings carry free-text deadlines in whatever format the source site
//! used; this module parses the common shapes, classifies urgency and
//! renders alerts. Unparseable text yields no alert, never an error.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use scout_core::{JobCatalog, JobRecord, JobStatus};
use std::fmt;

/// Days before a deadline at which each tier starts.
pub const CRITICAL_WITHIN_DAYS: i64 = 2;
pub const URGENT_WITHIN_DAYS: i64 = 5;
pub const DEFAULT_WARN_DAYS: i64 = 7;

/// A yearless deadline more than this many days in the past is assumed to
/// mean next year's occurrence.
const YEARLESS_GRACE_DAYS: i64 = 30;

const DEADLINE_PLACEHOLDERS: &[&str] = &["not specified", "n/a"];

const MONTH_NAMES: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|sept|oct|nov|dec";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Critical,
    Urgent,
    Warning,
    Expired,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::Urgent => "urgent",
            Urgency::Warning => "warning",
            Urgency::Expired => "expired",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeadlineAlert {
    pub urgency: Urgency,
    pub job_url: String,
    pub job_title: String,
    pub company: String,
    pub deadline: String,
    pub days_remaining: i64,
    pub status: JobStatus,
    pub action_needed: String,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeadlineStats {
    pub total_tracked: usize,
    pub with_deadlines: usize,
    pub critical: usize,
    pub urgent: usize,
    pub upcoming: usize,
    pub expired: usize,
}

/// Scan the catalog for deadline alerts on jobs the user is interested in
/// (liked, maybe, or still unreviewed), sorted by urgency then days left.
pub fn scan_deadlines(catalog: &JobCatalog, today: NaiveDate, warn_days: i64) -> Vec<DeadlineAlert> {
    let mut alerts = Vec::new();

    for (url, job) in catalog {
        if !matches!(
            job.status,
            JobStatus::Liked | JobStatus::Maybe | JobStatus::New
        ) {
            continue;
        }

        let deadline_text = job.deadline.as_deref().unwrap_or_default().trim();
        if deadline_text.is_empty()
            || DEADLINE_PLACEHOLDERS.contains(&deadline_text.to_lowercase().as_str())
        {
            continue;
        }

        let Some(deadline) = parse_deadline(deadline_text, today) else {
            continue;
        };
        let days_remaining = (deadline - today).num_days();

        let (urgency, action) = if days_remaining < 0 {
            (
                Urgency::Expired,
                format!(
                    "Deadline passed {} days ago - check if still accepting",
                    days_remaining.abs()
                ),
            )
        } else if days_remaining <= CRITICAL_WITHIN_DAYS {
            (
                Urgency::Critical,
                format!("Only {days_remaining} day(s) left! Apply NOW!"),
            )
        } else if days_remaining <= URGENT_WITHIN_DAYS {
            (
                Urgency::Urgent,
                format!("Apply within {days_remaining} days"),
            )
        } else if days_remaining <= warn_days {
            (
                Urgency::Warning,
                format!("Deadline approaching in {days_remaining} days"),
            )
        } else {
            continue;
        };

        alerts.push(alert(url, job, deadline_text, days_remaining, urgency, action));
    }

    alerts.sort_by(|left, right| {
        left.urgency
            .cmp(&right.urgency)
            .then(left.days_remaining.cmp(&right.days_remaining))
    });
    alerts
}

/// Only the alerts that demand action within `max_days`.
pub fn urgent_alerts(catalog: &JobCatalog, today: NaiveDate, max_days: i64) -> Vec<DeadlineAlert> {
    scan_deadlines(catalog, today, max_days)
        .into_iter()
        .filter(|alert| matches!(alert.urgency, Urgency::Critical | Urgency::Urgent))
        .collect()
}

pub fn deadline_stats(catalog: &JobCatalog, today: NaiveDate) -> DeadlineStats {
    let alerts = scan_deadlines(catalog, today, 14);
    let count = |urgency: Urgency| alerts.iter().filter(|alert| alert.urgency == urgency).count();

    DeadlineStats {
        total_tracked: catalog
            .values()
            .filter(|job| matches!(job.status, JobStatus::Liked | JobStatus::Maybe))
            .count(),
        with_deadlines: alerts.len(),
        critical: count(Urgency::Critical),
        urgent: count(Urgency::Urgent),
        upcoming: count(Urgency::Warning),
        expired: count(Urgency::Expired),
    }
}

/// Grouped human-readable deadline report.
pub fn deadline_report(catalog: &JobCatalog, today: NaiveDate, warn_days: i64) -> String {
    let alerts = scan_deadlines(catalog, today, warn_days);
    if alerts.is_empty() {
        return "No upcoming deadlines for your liked/maybe jobs.".to_string();
    }

    let rule = "=".repeat(50);
    let mut lines = vec![rule.clone(), "DEADLINE ALERTS".to_string(), rule.clone()];

    let critical = alerts_of(&alerts, Urgency::Critical);
    if !critical.is_empty() {
        lines.push("\n!!! CRITICAL - 2 DAYS OR LESS !!!".to_string());
        for alert in critical {
            lines.push(format!(
                "  [{}] {}",
                alert.status.as_str().to_uppercase(),
                alert.job_title
            ));
            lines.push(format!("           @ {}", alert.company));
            lines.push(format!(
                "           Deadline: {} ({} days)",
                alert.deadline, alert.days_remaining
            ));
        }
    }

    let urgent = alerts_of(&alerts, Urgency::Urgent);
    if !urgent.is_empty() {
        lines.push("\n!! URGENT - 5 DAYS OR LESS !!".to_string());
        for alert in urgent {
            lines.push(format!(
                "  [{}] {}",
                alert.status.as_str().to_uppercase(),
                alert.job_title
            ));
            lines.push(format!("           @ {}", alert.company));
            lines.push(format!(
                "           Deadline: {} ({} days)",
                alert.deadline, alert.days_remaining
            ));
        }
    }

    let warnings = alerts_of(&alerts, Urgency::Warning);
    if !warnings.is_empty() {
        lines.push(format!("\nUPCOMING (within {warn_days} days):"));
        for alert in warnings {
            lines.push(format!(
                "  [{}] {}",
                alert.status.as_str().to_uppercase(),
                alert.job_title
            ));
            lines.push(format!(
                "           @ {} - {} days left",
                alert.company, alert.days_remaining
            ));
        }
    }

    let expired = alerts_of(&alerts, Urgency::Expired);
    if !expired.is_empty() {
        lines.push("\nEXPIRED (check if still accepting):".to_string());
        for alert in expired {
            lines.push(format!(
                "  [{}] {} @ {}",
                alert.status.as_str().to_uppercase(),
                alert.job_title,
                alert.company
            ));
            lines.push(format!("           Deadline was: {}", alert.deadline));
        }
    }

    lines.push(format!("\n{rule}"));
    lines.join("\n")
}

fn alerts_of(alerts: &[DeadlineAlert], urgency: Urgency) -> Vec<&DeadlineAlert> {
    alerts
        .iter()
        .filter(|alert| alert.urgency == urgency)
        .collect()
}

fn alert(
    url: &str,
    job: &JobRecord,
    deadline: &str,
    days_remaining: i64,
    urgency: Urgency,
    action_needed: String,
) -> DeadlineAlert {
    DeadlineAlert {
        urgency,
        job_url: url.to_string(),
        job_title: job.title.clone(),
        company: job
            .company
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        deadline: deadline.to_string(),
        days_remaining,
        status: job.status.clone(),
        action_needed,
        location: job
            .city
            .clone()
            .or_else(|| job.location.clone())
            .unwrap_or_default(),
    }
}

/// Parse a free-text deadline. Day-first formats win over month-first for
/// numeric dates, matching the UK-centric sources this feeds on.
pub fn parse_deadline(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let lowered = text.to_lowercase();

    // "31 December 2024" or "31 Dec 2024"
    let day_month_year =
        Regex::new(&format!(r"(\d{{1,2}})\s+({MONTH_NAMES})\s+(\d{{4}})")).expect("valid regex");
    if let Some(captures) = day_month_year.captures(&lowered) {
        let day = captures[1].parse::<u32>().ok()?;
        let month = month_number(&captures[2])?;
        let year = captures[3].parse::<i32>().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    // "December 31, 2024"
    let month_day_year =
        Regex::new(&format!(r"({MONTH_NAMES})\s+(\d{{1,2}}),?\s+(\d{{4}})")).expect("valid regex");
    if let Some(captures) = month_day_year.captures(&lowered) {
        let month = month_number(&captures[1])?;
        let day = captures[2].parse::<u32>().ok()?;
        let year = captures[3].parse::<i32>().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    // "31/12/2024" or "31-12-2024", day first
    let numeric = Regex::new(r"(\d{1,2})[/\-](\d{1,2})[/\-](\d{4})").expect("valid regex");
    if let Some(captures) = numeric.captures(text) {
        let day = captures[1].parse::<u32>().ok()?;
        let month = captures[2].parse::<u32>().ok()?;
        let year = captures[3].parse::<i32>().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    // ISO "2024-12-31"
    let iso = Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("valid regex");
    if let Some(captures) = iso.captures(text) {
        let year = captures[1].parse::<i32>().ok()?;
        let month = captures[2].parse::<u32>().ok()?;
        let day = captures[3].parse::<u32>().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    // "31 December" with no year: next occurrence.
    let yearless =
        Regex::new(&format!(r"(\d{{1,2}})\s+({MONTH_NAMES})")).expect("valid regex");
    if let Some(captures) = yearless.captures(&lowered) {
        let day = captures[1].parse::<u32>().ok()?;
        let month = month_number(&captures[2])?;
        let parsed = NaiveDate::from_ymd_opt(today.year(), month, day)?;
        if (today - parsed).num_days() > YEARLESS_GRACE_DAYS {
            return NaiveDate::from_ymd_opt(today.year() + 1, month, day);
        }
        return Some(parsed);
    }

    None
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}
