//! Match Analyzer: AI-backed semantic match and search-profile extraction.
//!
//! Both operations follow the same path: cache lookup, provider chain (one
//! attempt per provider), tolerant parse, cache write. Neither ever fails;
//! when no provider can answer the caller gets a degraded value instead.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{cache_key, ResponseCache};
use crate::llm_client::prompts::truncate_chars;
use crate::llm_client::{ChainOutcome, ProviderChain};
use crate::models::matching::{MatchResult, SearchProfile};
use crate::models::posting::Posting;

pub mod parse;
pub mod prompts;

use prompts::{MATCH_PROMPT_TEMPLATE, PROFILE_PROMPT_TEMPLATE};

const PROFILE_PROMPT_CHARS: usize = 2000;
const POSTING_PROMPT_CHARS: usize = 1000;
const RESUME_PROMPT_CHARS: usize = 2000;

const MATCH_NAMESPACE: &str = "match";
const PROFILE_NAMESPACE: &str = "profile";

#[derive(Clone)]
pub struct MatchAnalyzer {
    chain: ProviderChain,
    cache: Arc<ResponseCache>,
}

/// Posting as presented to the provider.
fn posting_text(posting: &Posting) -> String {
    let mut text = posting.title.clone();
    if !posting.company.is_empty() {
        text.push_str(&format!(" at {}", posting.company));
    }
    if !posting.location.is_empty() {
        text.push_str(&format!(" ({})", posting.location));
    }
    if !posting.description.is_empty() {
        text.push('\n');
        text.push_str(&posting.description);
    }
    text
}

fn failure_verdict<T>(outcome: &ChainOutcome<T>) -> String {
    match outcome {
        ChainOutcome::NoProviders => {
            "Match analysis unavailable: no AI provider configured".to_string()
        }
        ChainOutcome::AllFailed {
            attempts,
            last_error,
        } => format!("Match analysis failed: all {attempts} providers failed ({last_error})"),
        ChainOutcome::Success { .. } => String::new(),
    }
}

impl MatchAnalyzer {
    pub fn new(chain: ProviderChain, cache: Arc<ResponseCache>) -> Self {
        Self { chain, cache }
    }

    /// Semantic match of a candidate profile against one posting.
    pub async fn analyze(&self, profile: &str, posting: &Posting) -> MatchResult {
        let description = posting_text(posting);
        self.analyze_text(profile, &description).await
    }

    /// Same as `analyze`, for a posting already rendered as text.
    pub async fn analyze_text(&self, profile: &str, posting_text: &str) -> MatchResult {
        let profile = truncate_chars(profile.trim(), PROFILE_PROMPT_CHARS);
        let posting_text = truncate_chars(posting_text.trim(), POSTING_PROMPT_CHARS);

        let key = cache_key(MATCH_NAMESPACE, &[profile, posting_text]);
        if let Some(cached) = self.cache.get_as::<MatchResult>(&key).await {
            info!("Returning cached match analysis");
            return cached;
        }

        let prompt = MATCH_PROMPT_TEMPLATE
            .replace("{profile}", profile)
            .replace("{posting}", posting_text);

        match self.chain.run(&prompt, parse::parse_match).await {
            ChainOutcome::Success {
                mut value,
                provider,
            } => {
                value.backend = provider;
                self.cache.set(&key, &value).await;
                value
            }
            failed => {
                let verdict = failure_verdict(&failed);
                warn!("{verdict}");
                MatchResult::degraded(verdict)
            }
        }
    }

    /// Derives the search to run from a candidate's resume text. Falls back to
    /// the default profile when no provider can answer.
    pub async fn extract_profile(&self, candidate_text: &str) -> SearchProfile {
        let resume = truncate_chars(candidate_text.trim(), RESUME_PROMPT_CHARS);
        if resume.is_empty() {
            warn!("Empty resume text, using default search profile");
            return SearchProfile::default();
        }

        let key = cache_key(PROFILE_NAMESPACE, &[resume]);
        if let Some(cached) = self.cache.get_as::<SearchProfile>(&key).await {
            info!("Returning cached search profile");
            return cached;
        }

        let prompt = PROFILE_PROMPT_TEMPLATE.replace("{resume}", resume);
        match self.chain.run(&prompt, parse::parse_profile).await {
            ChainOutcome::Success { value, provider } => {
                info!(
                    "Search profile from {provider}: {} in {}",
                    value.queries.join(" | "),
                    value.location
                );
                self.cache.set(&key, &value).await;
                value
            }
            failed => {
                warn!(
                    "Search profile extraction fell back to defaults: {}",
                    failure_verdict(&failed)
                );
                SearchProfile::default()
            }
        }
    }
}
