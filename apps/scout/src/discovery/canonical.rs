//! Canonicalizer: source-specific records into the shared `Posting` shape.

use chrono::{DateTime, Utc};

use crate::models::posting::{Posting, Source};
use crate::sources::{IndeedCard, JSearchJob, RawPosting, ScoutJob};

pub const SALARY_NOT_SPECIFIED: &str = "Not specified";

/// Maps any raw record onto a `Posting`. Unknown fields become empty strings;
/// `local_score` starts at 0.
pub fn canonicalize(raw: &RawPosting) -> Posting {
    match raw {
        RawPosting::JSearch(job) => from_jsearch(job),
        RawPosting::Indeed(card) => from_indeed(card),
        RawPosting::AiScout(job) => from_scout(job),
    }
}

fn text(field: &Option<String>) -> String {
    field.as_deref().unwrap_or("").trim().to_string()
}

fn from_jsearch(job: &JSearchJob) -> Posting {
    let location = [&job.job_city, &job.job_state, &job.job_country]
        .into_iter()
        .flatten()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    Posting {
        url: job.url().to_string(),
        title: text(&job.job_title),
        company: text(&job.employer_name),
        location: if location.is_empty() {
            job.searched_location.trim().to_string()
        } else {
            location
        },
        description: text(&job.job_description),
        source: Source::JSearch,
        posted_at: job
            .job_posted_at_datetime_utc
            .as_deref()
            .and_then(parse_timestamp),
        employment_type: text(&job.job_employment_type),
        salary: format_salary(job.job_min_salary, job.job_max_salary),
        local_score: 0,
    }
}

fn from_indeed(card: &IndeedCard) -> Posting {
    Posting {
        url: card.url.clone(),
        title: card.title.clone(),
        company: card.company.clone(),
        location: card.location.clone(),
        description: card.snippet.clone(),
        source: Source::Indeed,
        posted_at: None,
        employment_type: String::new(),
        salary: SALARY_NOT_SPECIFIED.to_string(),
        local_score: 0,
    }
}

fn from_scout(job: &ScoutJob) -> Posting {
    Posting {
        url: text(&job.url),
        title: text(&job.title),
        company: text(&job.company),
        location: text(&job.location),
        description: text(&job.requirements),
        source: Source::AiScout,
        posted_at: None,
        employment_type: String::new(),
        salary: SALARY_NOT_SPECIFIED.to_string(),
        local_score: 0,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// `$min - $max`, `$min+`, `Up to $max`, or "Not specified". Zero and
/// negative amounts count as absent.
pub fn format_salary(min: Option<f64>, max: Option<f64>) -> String {
    let min = min.filter(|v| *v > 0.0);
    let max = max.filter(|v| *v > 0.0);
    match (min, max) {
        (Some(min), Some(max)) => format!("{} - {}", dollars(min), dollars(max)),
        (Some(min), None) => format!("{}+", dollars(min)),
        (None, Some(max)) => format!("Up to {}", dollars(max)),
        (None, None) => SALARY_NOT_SPECIFIED.to_string(),
    }
}

/// Whole dollars with thousands separators.
fn dollars(amount: f64) -> String {
    let digits = (amount.round() as u64).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_jsearch_record_is_fully_mapped() {
        let job = JSearchJob {
            job_title: Some("Functional Safety Engineer".to_string()),
            employer_name: Some("Acme".to_string()),
            job_city: Some("Detroit".to_string()),
            job_state: Some("MI".to_string()),
            job_country: Some("US".to_string()),
            job_description: Some("ISO 26262".to_string()),
            job_apply_link: Some("https://jobs.example/1".to_string()),
            job_employment_type: Some("FULLTIME".to_string()),
            job_posted_at_datetime_utc: Some("2024-05-01T12:00:00.000Z".to_string()),
            job_min_salary: Some(90000.0),
            job_max_salary: Some(120000.0),
            searched_location: "Remote".to_string(),
            ..Default::default()
        };

        let posting = canonicalize(&RawPosting::JSearch(job));

        assert_eq!(posting.url, "https://jobs.example/1");
        assert_eq!(posting.location, "Detroit, MI, US");
        assert_eq!(posting.source, Source::JSearch);
        assert_eq!(posting.employment_type, "FULLTIME");
        assert_eq!(posting.salary, "$90,000 - $120,000");
        assert_eq!(
            posting.posted_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(posting.local_score, 0);
    }

    #[test]
    fn test_jsearch_location_falls_back_to_search() {
        let job = JSearchJob {
            job_city: Some("  ".to_string()),
            job_posted_at_datetime_utc: Some("yesterday".to_string()),
            searched_location: "Remote".to_string(),
            ..Default::default()
        };

        let posting = canonicalize(&RawPosting::JSearch(job));

        assert_eq!(posting.location, "Remote");
        assert_eq!(posting.title, "");
        assert_eq!(posting.posted_at, None);
        assert_eq!(posting.salary, SALARY_NOT_SPECIFIED);
    }

    #[test]
    fn test_scout_requirements_become_description() {
        let job = ScoutJob {
            title: Some("Safety Lead".to_string()),
            url: Some(" https://careers.example/7 ".to_string()),
            requirements: Some("ASIL D".to_string()),
            ..Default::default()
        };

        let posting = canonicalize(&RawPosting::AiScout(job));

        assert_eq!(posting.url, "https://careers.example/7");
        assert_eq!(posting.description, "ASIL D");
        assert_eq!(posting.company, "");
        assert_eq!(posting.source, Source::AiScout);
    }

    #[test]
    fn test_indeed_snippet_becomes_description() {
        let card = IndeedCard {
            job_key: "k".to_string(),
            title: "Engineer".to_string(),
            snippet: "Hazard analysis".to_string(),
            url: "https://www.indeed.com/viewjob?jk=k".to_string(),
            ..Default::default()
        };

        let posting = canonicalize(&RawPosting::Indeed(card));

        assert_eq!(posting.description, "Hazard analysis");
        assert_eq!(posting.source, Source::Indeed);
    }

    #[test]
    fn test_salary_formats() {
        assert_eq!(format_salary(Some(85000.0), None), "$85,000+");
        assert_eq!(format_salary(None, Some(1500000.0)), "Up to $1,500,000");
        assert_eq!(format_salary(Some(0.0), Some(950.0)), "Up to $950");
        assert_eq!(format_salary(None, None), "Not specified");
    }
}
