//! AI scout: asks the provider chain for current listings matching a search.
//!
//! Answers are cached per `(query, location)` before dedup filtering, so a
//! repeat search inside the TTL costs no provider call and yields only what
//! has not been seen since.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{claim_unseen, RawPosting, SharedDedup, SourceFetcher, Throttle};
use crate::cache::{cache_key, ResponseCache};
use crate::llm_client::envelope::extract_json;
use crate::llm_client::{ChainOutcome, ProviderChain, ProviderError};
use crate::models::posting::Source;

const CACHE_NAMESPACE: &str = "scout";
const MAX_LISTINGS: usize = 10;

/// A listing as reported by a provider. Models leave fields out or send
/// `null`, so everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoutJob {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
}

fn scout_prompt(query: &str, location: &str) -> String {
    format!(
        r#"Find up to {MAX_LISTINGS} currently open job listings for "{query}" in {location}.

Return a JSON array. Each element must be an object with these keys:
- "title": job title
- "company": hiring company
- "location": job location
- "url": direct link to the listing
- "requirements": one or two sentences on the key requirements

Only include listings you can give a direct URL for. Return [] if you find none."#
    )
}

/// Accepts a bare array or an object wrapping it under `jobs`, `data` or
/// `results`. Records that are not job objects are skipped.
pub fn parse_job_list(text: &str) -> Result<Vec<ScoutJob>, ProviderError> {
    let items = match extract_json(text)? {
        Value::Array(items) => items,
        Value::Object(mut map) => ["jobs", "data", "results"]
            .iter()
            .find_map(|field| match map.remove(*field) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| ProviderError::Malformed("no job list in object".to_string()))?,
        other => {
            return Err(ProviderError::Malformed(format!(
                "expected job list, got {other}"
            )))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<ScoutJob>(item).ok())
        .collect())
}

pub struct AiScoutFetcher {
    chain: ProviderChain,
    cache: Arc<ResponseCache>,
    dedup: SharedDedup,
    throttle: Throttle,
}

impl AiScoutFetcher {
    pub fn new(
        chain: ProviderChain,
        cache: Arc<ResponseCache>,
        dedup: SharedDedup,
        politeness_delay: Duration,
    ) -> Self {
        Self {
            chain,
            cache,
            dedup,
            throttle: Throttle::new(politeness_delay),
        }
    }

    async fn listings(&self, query: &str, location: &str) -> Vec<ScoutJob> {
        let key = cache_key(CACHE_NAMESPACE, &[&format!("{query} in {location}")]);
        if let Some(jobs) = self.cache.get_as::<Vec<ScoutJob>>(&key).await {
            debug!("AI scout cache hit for '{query}' in {location}");
            return jobs;
        }

        if self.chain.is_empty() {
            info!("No AI provider configured, skipping AI scout");
            return Vec::new();
        }

        self.throttle.wait().await;
        match self
            .chain
            .run(&scout_prompt(query, location), parse_job_list)
            .await
        {
            ChainOutcome::Success { value, provider } => {
                info!("AI scout: {} listings from {provider}", value.len());
                self.cache.set(&key, &value).await;
                value
            }
            ChainOutcome::NoProviders => Vec::new(),
            ChainOutcome::AllFailed {
                attempts,
                last_error,
            } => {
                warn!("AI scout: all {attempts} providers failed ({last_error})");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SourceFetcher for AiScoutFetcher {
    fn source(&self) -> Source {
        Source::AiScout
    }

    /// One provider call per search; the page budget does not apply.
    async fn fetch(&self, query: &str, location: &str, _page_budget: u32) -> Vec<RawPosting> {
        let mut postings = Vec::new();
        for job in self.listings(query, location).await {
            let raw = RawPosting::AiScout(job);
            if claim_unseen(self.dedup.as_ref(), &raw).await {
                postings.push(raw);
            }
        }
        postings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DEFAULT_TTL;
    use crate::dedup::tests::memory_store;
    use crate::dedup::DedupStore;
    use crate::llm_client::tests::FakeProvider;

    const LISTINGS: &str = r#"Here you go:
```json
[
  {"title": "Safety Engineer", "company": "Acme", "location": "Remote",
   "url": "https://careers.acme.example/1", "requirements": "ISO 26262"},
  {"title": "No URL", "company": "Ghost", "url": null},
  "stray string"
]
```"#;

    async fn fetcher(chain: ProviderChain) -> (AiScoutFetcher, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ResponseCache::new(dir.path(), DEFAULT_TTL));
        let dedup: Arc<dyn DedupStore> = Arc::new(memory_store().await);
        (
            AiScoutFetcher::new(chain, cache, dedup, Duration::ZERO),
            dir,
        )
    }

    #[test]
    fn test_parse_accepts_wrapped_lists() {
        let jobs = parse_job_list(r#"{"results": [{"title": "A", "url": "u"}]}"#).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title.as_deref(), Some("A"));

        let jobs = parse_job_list(r#"{"jobs": []}"#).unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_lists() {
        assert!(parse_job_list(r#"{"message": "none found"}"#).is_err());
        assert!(parse_job_list("42").is_err());
        assert!(parse_job_list("I could not find anything").is_err());
    }

    #[tokio::test]
    async fn test_yields_listings_with_urls() {
        let provider = FakeProvider::answering("fake", LISTINGS);
        let (fetcher, _dir) = fetcher(ProviderChain::new(vec![provider.clone()])).await;

        let postings = fetcher.fetch("Safety Engineer", "Remote", 3).await;

        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].url(), "https://careers.acme.example/1");
        assert_eq!(postings[0].source(), Source::AiScout);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_repeat_search_is_served_from_cache() {
        let provider = FakeProvider::answering("fake", LISTINGS);
        let (fetcher, _dir) = fetcher(ProviderChain::new(vec![provider.clone()])).await;

        assert_eq!(fetcher.fetch("Safety Engineer", "Remote", 1).await.len(), 1);
        // Cached list is re-read, then filtered by dedup.
        assert!(fetcher
            .fetch("  Safety   Engineer ", "Remote", 1)
            .await
            .is_empty());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_providers_yields_nothing() {
        let (fetcher, _dir) = fetcher(ProviderChain::default()).await;
        assert!(fetcher.fetch("Engineer", "Remote", 1).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_chain_is_not_cached() {
        let failing = FakeProvider::failing("down", 503);
        let (fetcher, _dir) = fetcher(ProviderChain::new(vec![failing.clone()])).await;

        assert!(fetcher.fetch("Engineer", "Remote", 1).await.is_empty());
        assert!(fetcher.fetch("Engineer", "Remote", 1).await.is_empty());
        assert_eq!(failing.call_count(), 2);
    }
}
