//! Tolerant readers for provider answers.
//!
//! Models drift from the requested schema in small ways (scores as strings,
//! too many list items, a single `query` instead of `queries`). Anything that
//! can be repaired is; anything that cannot is a `ProviderError::Malformed`,
//! which sends the chain on to the next provider.

use serde_json::{Map, Value};

use crate::llm_client::envelope::extract_json;
use crate::llm_client::ProviderError;
use crate::models::matching::{MatchResult, SearchProfile, DEFAULT_LOCATION, MAX_MATCH_POINTS};

const MAX_QUERIES: usize = 3;

fn object(text: &str) -> Result<Map<String, Value>, ProviderError> {
    match extract_json(text)? {
        Value::Object(map) => Ok(map),
        other => Err(ProviderError::Malformed(format!(
            "expected JSON object, got {other}"
        ))),
    }
}

fn clean_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Non-blank string entries, at most `limit` of them.
fn clean_list(value: Option<&Value>, limit: usize) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| clean_string(Some(item)))
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}

fn score(value: Option<&Value>) -> Result<u32, ProviderError> {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| ProviderError::Malformed("missing or non-numeric score".to_string()))?;

    Ok(raw.round().clamp(0.0, 100.0) as u32)
}

/// Reads a match answer. `backend` is left for the caller to fill in.
pub fn parse_match(text: &str) -> Result<MatchResult, ProviderError> {
    let map = object(text)?;
    Ok(MatchResult {
        score: score(map.get("score"))?,
        verdict: clean_string(map.get("verdict")).unwrap_or_default(),
        strengths: clean_list(map.get("strengths"), MAX_MATCH_POINTS),
        gaps: clean_list(map.get("gaps"), MAX_MATCH_POINTS),
        backend: String::new(),
    })
}

/// Reads a search-profile answer. An answer without any usable query is
/// rejected, so `queries` is never empty.
pub fn parse_profile(text: &str) -> Result<SearchProfile, ProviderError> {
    let map = object(text)?;

    let mut queries = clean_list(map.get("queries"), MAX_QUERIES);
    if queries.is_empty() {
        queries.extend(clean_string(map.get("query")));
    }
    if queries.is_empty() {
        return Err(ProviderError::Malformed("no search query in profile".to_string()));
    }

    Ok(SearchProfile {
        queries,
        location: clean_string(map.get("location"))
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        primary_title: clean_string(map.get("primary_title")),
    })
}
