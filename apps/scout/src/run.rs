//! One discovery run: decide what to search for, search every enabled source
//! for each query × location, then spend semantic analysis only on the
//! postings the local scorer ranks highest.

use serde::Serialize;
use tracing::{info, warn};

use crate::dedup::search_terms::TermType;
use crate::dedup::SqlDedupStore;
use crate::models::matching::MatchResult;
use crate::models::posting::{Posting, Source};
use crate::sources::detail::DESCRIPTION_UNAVAILABLE;
use crate::state::AppState;

/// The searches a run performs, and the candidate text analysis compares against.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub queries: Vec<String>,
    pub locations: Vec<String>,
    pub profile_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzedPosting {
    pub url: String,
    pub title: String,
    pub company: String,
    pub local_score: u32,
    pub analysis: MatchResult,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub postings: Vec<Posting>,
    pub analyses: Vec<AnalyzedPosting>,
}

async fn read_profile_text(path: &str) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => {
            warn!("Profile file {path} is empty");
            None
        }
        Err(e) => {
            warn!("Could not read profile file {path}: {e}");
            None
        }
    }
}

/// Stored terms of one type; a store failure reads as "none stored".
async fn stored_terms(store: &SqlDedupStore, term_type: TermType) -> Vec<String> {
    store.search_terms(term_type).await.unwrap_or_else(|e| {
        warn!("Could not load stored search terms: {e}");
        Vec::new()
    })
}

/// Search terms come from the candidate profile when one is configured,
/// else from stored search terms, else from configured defaults.
pub async fn plan_searches(state: &AppState) -> SearchPlan {
    let config = &state.config;
    let profile_text = match &config.profile_text_path {
        Some(path) => read_profile_text(path).await,
        None => None,
    };

    if let Some(text) = profile_text {
        let profile = state.analyzer.extract_profile(&text).await;
        return SearchPlan {
            queries: profile.queries,
            locations: vec![profile.location],
            profile_text: Some(text),
        };
    }

    let titles = stored_terms(&state.store, TermType::Title).await;
    let locations = stored_terms(&state.store, TermType::Location).await;
    SearchPlan {
        queries: if titles.is_empty() {
            config.search_queries.clone()
        } else {
            titles
        },
        locations: if locations.is_empty() {
            config.search_locations.clone()
        } else {
            locations
        },
        profile_text: None,
    }
}

/// Postings worth a semantic analysis: local score at or above `min_score`,
/// best first, at most `top_n`.
pub fn analysis_candidates(postings: &[Posting], min_score: u32, top_n: usize) -> Vec<&Posting> {
    let mut candidates: Vec<&Posting> = postings
        .iter()
        .filter(|p| p.local_score >= min_score)
        .collect();
    candidates.sort_by(|a, b| b.local_score.cmp(&a.local_score));
    candidates.truncate(top_n);
    candidates
}

/// Listing pages only carry a snippet; analysis gets the posting page text
/// when it can be fetched.
pub async fn with_full_description(state: &AppState, posting: &Posting) -> Posting {
    let mut posting = posting.clone();
    if posting.source == Source::Indeed {
        let description = state.details.fetch_description(&posting.url).await;
        if description != DESCRIPTION_UNAVAILABLE {
            posting.description = description;
        }
    }
    posting
}

pub async fn run(state: &AppState) -> RunReport {
    let config = &state.config;
    let plan = plan_searches(state).await;
    info!(
        "Searching {} queries across {} locations",
        plan.queries.len(),
        plan.locations.len()
    );

    let mut postings = Vec::new();
    for query in &plan.queries {
        for location in &plan.locations {
            let found = state
                .aggregator
                .discover(
                    query,
                    location,
                    &config.enabled_sources,
                    config.page_budget,
                    plan.profile_text.as_deref(),
                )
                .await;
            postings.extend(found);
        }
    }

    let mut analyses = Vec::new();
    if let Some(profile) = plan.profile_text.as_deref() {
        for candidate in
            analysis_candidates(&postings, config.min_match_score, config.analyze_top_n)
        {
            let posting = with_full_description(state, candidate).await;
            let analysis = state.analyzer.analyze(profile, &posting).await;
            info!(
                "{} at {}: local {} / match {} ({})",
                posting.title, posting.company, posting.local_score, analysis.score, analysis.backend
            );
            analyses.push(AnalyzedPosting {
                url: posting.url,
                title: posting.title,
                company: posting.company,
                local_score: posting.local_score,
                analysis,
            });
        }
    } else {
        info!("No candidate profile configured, skipping semantic analysis");
    }

    info!(
        "Run complete: {} new postings, {} analyzed",
        postings.len(),
        analyses.len()
    );
    RunReport { postings, analyses }
}
