//! RapidAPI JSearch, the structured-API source.
//!
//! Pagination stops at the first 429 or transport failure; any other non-200
//! page is skipped.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{claim_unseen, FetchSettings, RawPosting, SharedDedup, SourceFetcher, Throttle};
use crate::errors::FetchError;
use crate::models::posting::Source;

const RAPIDAPI_HOST: &str = "jsearch.p.rapidapi.com";

/// One record from the JSearch `data` array. Every field is optional upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JSearchJob {
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub employer_name: Option<String>,
    #[serde(default)]
    pub job_city: Option<String>,
    #[serde(default)]
    pub job_state: Option<String>,
    #[serde(default)]
    pub job_country: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub job_apply_link: Option<String>,
    #[serde(default)]
    pub job_google_link: Option<String>,
    #[serde(default)]
    pub job_employment_type: Option<String>,
    #[serde(default)]
    pub job_posted_at_datetime_utc: Option<String>,
    #[serde(default)]
    pub job_min_salary: Option<f64>,
    #[serde(default)]
    pub job_max_salary: Option<f64>,
    /// Location that was searched for; fallback when the record has none.
    #[serde(default)]
    pub searched_location: String,
}

impl JSearchJob {
    /// Apply link when present, else the Google Jobs link.
    pub fn url(&self) -> &str {
        [&self.job_apply_link, &self.job_google_link]
            .into_iter()
            .flatten()
            .map(|link| link.trim())
            .find(|link| !link.is_empty())
            .unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<Value>,
}

pub struct JSearchFetcher {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    dedup: SharedDedup,
    throttle: Throttle,
}

impl JSearchFetcher {
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        settings: &FetchSettings,
        dedup: SharedDedup,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            dedup,
            throttle: Throttle::new(settings.politeness_delay),
        })
    }

    async fn fetch_page(
        &self,
        api_key: &str,
        query: &str,
        location: &str,
        page: u32,
    ) -> Result<Vec<JSearchJob>, FetchError> {
        self.throttle.wait().await;

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .query(&[
                ("query", format!("{query} {location}")),
                ("page", page.to_string()),
                ("num_pages", "1".to_string()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(FetchError::RateLimited),
            status => return Err(FetchError::Status(status.as_u16())),
        }

        let page: SearchPage = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        // Malformed single records are dropped; the rest of the page survives.
        let jobs = page
            .data
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<JSearchJob>(record) {
                Ok(mut job) => {
                    job.searched_location = location.to_string();
                    Some(job)
                }
                Err(e) => {
                    debug!("Skipping malformed JSearch record: {e}");
                    None
                }
            })
            .collect();
        Ok(jobs)
    }
}

#[async_trait]
impl SourceFetcher for JSearchFetcher {
    fn source(&self) -> Source {
        Source::JSearch
    }

    async fn fetch(&self, query: &str, location: &str, page_budget: u32) -> Vec<RawPosting> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("No RapidAPI key configured, skipping JSearch");
            return Vec::new();
        };

        info!("JSearch: '{query}' in {location} (pages: {page_budget})");
        let mut postings = Vec::new();

        for page in 1..=page_budget {
            match self.fetch_page(api_key, query, location, page).await {
                Ok(jobs) => {
                    let mut fresh = 0;
                    for job in jobs {
                        let raw = RawPosting::JSearch(job);
                        if claim_unseen(self.dedup.as_ref(), &raw).await {
                            postings.push(raw);
                            fresh += 1;
                        }
                    }
                    info!("JSearch page {page}: {fresh} fresh jobs");
                }
                Err(FetchError::RateLimited) => {
                    warn!("JSearch rate limit hit on page {page}, stopping pagination");
                    break;
                }
                Err(e @ (FetchError::Status(_) | FetchError::Malformed(_))) => {
                    warn!("JSearch page {page} skipped: {e}");
                }
                Err(e) => {
                    warn!("JSearch request failed on page {page}, keeping partial results: {e}");
                    break;
                }
            }
        }

        postings
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::dedup::tests::memory_store;
    use crate::dedup::DedupStore;
    use crate::sources::tests::{fast_settings, spawn_server};

    #[derive(Clone)]
    struct MockApi {
        hits: Arc<AtomicUsize>,
        /// page number -> status to return instead of data
        failures: Arc<HashMap<u32, u16>>,
    }

    async fn search(
        State(api): State<MockApi>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        api.hits.fetch_add(1, Ordering::SeqCst);
        if headers.get("x-rapidapi-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
            return AxumStatus::UNAUTHORIZED.into_response();
        }

        let page: u32 = params["page"].parse().unwrap();
        if let Some(status) = api.failures.get(&page) {
            return AxumStatus::from_u16(*status).unwrap().into_response();
        }

        Json(json!({
            "status": "OK",
            "data": [
                {
                    "job_title": format!("Safety Engineer {page}a"),
                    "employer_name": "Acme",
                    "job_apply_link": format!("https://jobs.example/{page}/a"),
                },
                {
                    "job_title": format!("Safety Engineer {page}b"),
                    "job_google_link": format!("https://google.example/{page}/b"),
                },
                {"job_title": "No link at all"},
                "not even an object"
            ]
        }))
        .into_response()
    }

    async fn fetcher_with(
        failures: &[(u32, u16)],
    ) -> (JSearchFetcher, Arc<AtomicUsize>, Arc<dyn DedupStore>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let api = MockApi {
            hits: hits.clone(),
            failures: Arc::new(failures.iter().copied().collect()),
        };
        let base = spawn_server(Router::new().route("/search", get(search)).with_state(api)).await;
        let dedup: Arc<dyn DedupStore> = Arc::new(memory_store().await);
        let fetcher = JSearchFetcher::new(
            Some("test-key".to_string()),
            &base,
            &fast_settings(),
            dedup.clone(),
        )
        .unwrap();
        (fetcher, hits, dedup)
    }

    fn urls(postings: &[RawPosting]) -> Vec<&str> {
        postings.iter().map(|p| p.url()).collect()
    }

    #[tokio::test]
    async fn test_paginates_and_drops_linkless_records() {
        let (fetcher, hits, dedup) = fetcher_with(&[]).await;

        let postings = fetcher.fetch("Safety Engineer", "Remote", 2).await;

        assert_eq!(
            urls(&postings),
            vec![
                "https://jobs.example/1/a",
                "https://google.example/1/b",
                "https://jobs.example/2/a",
                "https://google.example/2/b",
            ]
        );
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        for url in urls(&postings) {
            assert!(dedup.has_seen(url).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_rate_limit_on_page_two_keeps_page_one() {
        let (fetcher, hits, _) = fetcher_with(&[(2, 429)]).await;

        let postings = fetcher.fetch("Safety Engineer", "Remote", 3).await;

        assert_eq!(
            urls(&postings),
            vec!["https://jobs.example/1/a", "https://google.example/1/b"]
        );
        // Page 3 is never requested after the 429.
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_server_error_page_is_skipped() {
        let (fetcher, hits, _) = fetcher_with(&[(2, 503)]).await;

        let postings = fetcher.fetch("Safety Engineer", "Remote", 3).await;

        assert_eq!(postings.len(), 4);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_second_run_returns_nothing_new() {
        let (fetcher, _, _) = fetcher_with(&[]).await;

        assert_eq!(fetcher.fetch("Safety Engineer", "Remote", 1).await.len(), 2);
        assert!(fetcher.fetch("Safety Engineer", "Remote", 1).await.is_empty());
    }

    #[tokio::test]
    async fn test_previously_seen_url_is_filtered() {
        let (fetcher, _, dedup) = fetcher_with(&[]).await;
        dedup.mark_seen("https://jobs.example/1/a").await.unwrap();

        let postings = fetcher.fetch("Safety Engineer", "Remote", 1).await;

        assert_eq!(urls(&postings), vec!["https://google.example/1/b"]);
    }

    #[tokio::test]
    async fn test_missing_key_skips_source() {
        let dedup: Arc<dyn DedupStore> = Arc::new(memory_store().await);
        let fetcher =
            JSearchFetcher::new(None, "http://127.0.0.1:9", &fast_settings(), dedup).unwrap();
        assert!(fetcher.fetch("Engineer", "Remote", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_api_returns_empty() {
        let dedup: Arc<dyn DedupStore> = Arc::new(memory_store().await);
        let fetcher = JSearchFetcher::new(
            Some("k".to_string()),
            "http://127.0.0.1:9",
            &fast_settings(),
            dedup,
        )
        .unwrap();
        assert!(fetcher.fetch("Engineer", "Remote", 3).await.is_empty());
    }

    #[test]
    fn test_url_prefers_apply_link() {
        let job = JSearchJob {
            job_apply_link: Some("  ".to_string()),
            job_google_link: Some("https://google.example/x".to_string()),
            ..Default::default()
        };
        assert_eq!(job.url(), "https://google.example/x");

        let job = JSearchJob {
            job_apply_link: Some("https://apply.example/x".to_string()),
            job_google_link: Some("https://google.example/x".to_string()),
            ..Default::default()
        };
        assert_eq!(job.url(), "https://apply.example/x");
    }
}
