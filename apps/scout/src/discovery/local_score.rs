//! Local Scorer: offline keyword-overlap relevance heuristic.
//!
//! Cheap enough to run on every discovered posting; it decides which postings
//! are worth a semantic analysis call.

use std::collections::HashSet;

const TITLE_TOKEN_MIN_LEN: usize = 4;
const TITLE_POINTS: u32 = 15;
const TITLE_CAP: u32 = 60;

const TEXT_TOKEN_MIN_LEN: usize = 5;
const TEXT_POINTS: u32 = 5;
const TEXT_CAP: u32 = 40;

const DOMAIN_POINTS: u32 = 5;
const DOMAIN_CAP: u32 = 15;

/// Raw sums under this are floored to `FLOOR_SCORE`.
const FLOOR_THRESHOLD: u32 = 10;
const FLOOR_SCORE: u32 = 5;
/// 96 – 100 is left to the semantic analyzer.
const MAX_LOCAL_SCORE: u32 = 95;

/// Functional-safety, automotive and embedded vocabulary.
const DOMAIN_KEYWORDS: &[&str] = &[
    "safety",
    "functional",
    "iso",
    "26262",
    "21448",
    "21434",
    "sotif",
    "asil",
    "hara",
    "fmea",
    "fmeda",
    "fta",
    "hazard",
    "autosar",
    "aspice",
    "misra",
    "iec",
    "61508",
    "automotive",
    "adas",
    "embedded",
    "firmware",
    "rtos",
    "cybersecurity",
];

/// Lowercase alphanumeric runs.
fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn overlap_points(
    profile: &HashSet<String>,
    other: &HashSet<String>,
    min_len: usize,
    points: u32,
    cap: u32,
) -> u32 {
    let shared = profile
        .intersection(other)
        .filter(|t| t.chars().count() >= min_len)
        .count() as u32;
    (shared * points).min(cap)
}

/// Relevance of a posting to a candidate profile, 0 – 95.
///
/// 0 is reserved for a blank profile or title; any other input scores at
/// least 5.
pub fn score(profile: &str, title: &str, text: &str) -> u32 {
    if profile.trim().is_empty() || title.trim().is_empty() {
        return 0;
    }

    let profile_tokens = tokens(profile);
    let title_tokens = tokens(title);
    let text_tokens = tokens(text);

    let title_score = overlap_points(
        &profile_tokens,
        &title_tokens,
        TITLE_TOKEN_MIN_LEN,
        TITLE_POINTS,
        TITLE_CAP,
    );
    let text_score = overlap_points(
        &profile_tokens,
        &text_tokens,
        TEXT_TOKEN_MIN_LEN,
        TEXT_POINTS,
        TEXT_CAP,
    );

    let domain_hits = DOMAIN_KEYWORDS
        .iter()
        .filter(|kw| profile_tokens.contains(**kw))
        .filter(|kw| title_tokens.contains(**kw) || text_tokens.contains(**kw))
        .count() as u32;
    let domain_score = (domain_hits * DOMAIN_POINTS).min(DOMAIN_CAP);

    let total = title_score + text_score + domain_score;
    if total < FLOOR_THRESHOLD {
        FLOOR_SCORE
    } else {
        total.min(MAX_LOCAL_SCORE)
    }
}
