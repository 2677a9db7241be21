//! Source Fetchers, one per external origin of postings.
//!
//! Contract shared by every fetcher:
//! - `fetch` never fails; it returns whatever was collected before trouble began.
//! - Sequential requests to one source are spaced by that fetcher's `Throttle`.
//! - Every yielded record has a non-empty URL that this call newly recorded in
//!   the Dedup Store, so downstream stages only ever see unseen postings.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::dedup::DedupStore;
use crate::models::posting::Source;

pub mod ai_scout;
pub mod detail;
pub mod indeed;
pub mod jsearch;

pub use ai_scout::{AiScoutFetcher, ScoutJob};
pub use detail::DescriptionFetcher;
pub use indeed::{IndeedCard, IndeedFetcher};
pub use jsearch::{JSearchFetcher, JSearchJob};

/// Source-specific record as produced by a fetcher, before canonicalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawPosting {
    JSearch(JSearchJob),
    Indeed(IndeedCard),
    AiScout(ScoutJob),
}

impl RawPosting {
    pub fn source(&self) -> Source {
        match self {
            RawPosting::JSearch(_) => Source::JSearch,
            RawPosting::Indeed(_) => Source::Indeed,
            RawPosting::AiScout(_) => Source::AiScout,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            RawPosting::JSearch(job) => job.url(),
            RawPosting::Indeed(card) => &card.url,
            RawPosting::AiScout(job) => job.url.as_deref().unwrap_or("").trim(),
        }
    }
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    fn source(&self) -> Source;

    /// Retrieves unseen postings for `(query, location)`, reading at most
    /// `page_budget` result pages.
    async fn fetch(&self, query: &str, location: &str, page_budget: u32) -> Vec<RawPosting>;
}

/// Timing knobs shared by the HTTP fetchers.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Pause between sequential requests to one source.
    pub politeness_delay: Duration,
    /// Bound on every single HTTP request.
    pub request_timeout: Duration,
    /// Base unit for retry backoff in the scrape fetcher.
    pub retry_backoff: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            politeness_delay: Duration::from_secs(3),
            request_timeout: Duration::from_secs(20),
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Enforces the politeness delay between requests to one source.
///
/// The lock is held while sleeping, so concurrent callers queue up behind
/// each other instead of firing together once the delay elapses.
pub struct Throttle {
    delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Inline dedup for one discovered posting. Returns `true` when it should be
/// yielded: its URL is non-empty, was not seen before, and this call is the
/// one that recorded it.
///
/// Store failures never drop a posting: an unanswerable seen-check is treated as
/// "new", and a failed write still yields.
pub async fn claim_unseen(dedup: &dyn DedupStore, raw: &RawPosting) -> bool {
    let url = raw.url();
    if url.is_empty() {
        debug!("Discarding {} posting without URL", raw.source());
        return false;
    }

    match dedup.has_seen(url).await {
        Ok(true) => return false,
        Ok(false) => {}
        Err(e) => warn!("Seen-check failed for {url}, treating as new: {e}"),
    }

    match dedup.mark_seen(url).await {
        Ok(newly_recorded) => newly_recorded,
        Err(e) => {
            warn!("Could not record {url} as seen: {e}");
            true
        }
    }
}

/// Shared handle type used by fetchers.
pub type SharedDedup = Arc<dyn DedupStore>;
