//! Indeed listing-page scraper.
//!
//! Markup drifts between layouts, so every field is read through an ordered
//! list of selector strategies and the first non-empty match wins.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{claim_unseen, FetchSettings, RawPosting, SharedDedup, SourceFetcher, Throttle};
use crate::errors::FetchError;
use crate::models::posting::Source;

const MAX_ATTEMPTS: u32 = 3;
const RESULTS_PER_PAGE: u32 = 10;
/// Rate-limit backoff runs in longer steps than transient-error backoff.
const RATE_LIMIT_FACTOR: u32 = 5;
pub(super) const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const CARD_SELECTORS: &[&str] = &[
    "div.job_seen_beacon",
    "div.jobsearch-SerpJobCard",
    "div[data-jk]",
];
const TITLE_SELECTORS: &[&str] = &["h2.jobTitle", "a.jcs-JobTitle", "h2[class*=jobTitle]"];
const COMPANY_SELECTORS: &[&str] = &[
    "span.companyName",
    "span[data-testid=company-name]",
    "span[class*=company]",
];
const LOCATION_SELECTORS: &[&str] = &["div.companyLocation", "div[data-testid=text-location]"];
const SNIPPET_SELECTORS: &[&str] = &["div.job-snippet", "div[class*=snippet]"];

/// One job card lifted from a results page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndeedCard {
    pub job_key: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub snippet: String,
    pub url: String,
}

pub(super) fn selectors(raw: &[&str]) -> Vec<Selector> {
    raw.iter().filter_map(|s| Selector::parse(s).ok()).collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First non-empty text under `card` across the strategies.
fn first_text(card: ElementRef<'_>, strategies: &[Selector]) -> String {
    strategies
        .iter()
        .flat_map(|sel| card.select(sel))
        .map(element_text)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

/// The `jk` query parameter of a card link, resolved against the page URL.
fn href_job_key(href: &str, base: Option<&Url>) -> Option<String> {
    let url = match base {
        Some(base) => base.join(href),
        None => Url::parse(href),
    }
    .ok()?;
    url.query_pairs()
        .find(|(name, _)| name == "jk")
        .map(|(_, value)| value.into_owned())
}

fn job_key(card: ElementRef<'_>, base: Option<&Url>) -> Option<String> {
    let anchor_key = Selector::parse("a[data-jk]").ok().and_then(|sel| {
        card.select(&sel)
            .find_map(|a| a.value().attr("data-jk").map(str::to_string))
    });
    let own_key = || card.value().attr("data-jk").map(str::to_string);
    let href_key = || {
        let sel = Selector::parse("a[href]").ok()?;
        card.select(&sel)
            .find_map(|a| href_job_key(a.value().attr("href")?, base))
    };

    anchor_key
        .or_else(own_key)
        .or_else(href_key)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

/// Pulls every job card out of a results page. Cards without a job key have
/// no stable URL and are dropped.
pub fn extract_cards(html: &str, base_url: &str) -> Vec<IndeedCard> {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let card_elements: Vec<ElementRef<'_>> = selectors(CARD_SELECTORS)
        .iter()
        .map(|sel| document.select(sel).collect::<Vec<_>>())
        .find(|found| !found.is_empty())
        .unwrap_or_default();

    let title = selectors(TITLE_SELECTORS);
    let company = selectors(COMPANY_SELECTORS);
    let location = selectors(LOCATION_SELECTORS);
    let snippet = selectors(SNIPPET_SELECTORS);

    card_elements
        .into_iter()
        .filter_map(|card| {
            let Some(key) = job_key(card, base.as_ref()) else {
                debug!("Skipping Indeed card without job key");
                return None;
            };
            Some(IndeedCard {
                url: format!("{base_url}/viewjob?jk={key}"),
                job_key: key,
                title: first_text(card, &title),
                company: first_text(card, &company),
                location: first_text(card, &location),
                snippet: first_text(card, &snippet),
            })
        })
        .collect()
}

pub struct IndeedFetcher {
    client: Client,
    base_url: String,
    dedup: SharedDedup,
    throttle: Throttle,
    retry_backoff: Duration,
}

impl IndeedFetcher {
    pub fn new(
        base_url: &str,
        settings: &FetchSettings,
        dedup: SharedDedup,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            dedup,
            throttle: Throttle::new(settings.politeness_delay),
            retry_backoff: settings.retry_backoff,
        })
    }

    async fn request_page(
        &self,
        query: &str,
        location: &str,
        page: u32,
    ) -> Result<Vec<IndeedCard>, FetchError> {
        self.throttle.wait().await;

        let response = self
            .client
            .get(format!("{}/jobs", self.base_url))
            .query(&[
                ("q", query.to_string()),
                ("l", location.to_string()),
                ("start", (page * RESULTS_PER_PAGE).to_string()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(FetchError::RateLimited),
            status => return Err(FetchError::Status(status.as_u16())),
        }

        let body = response.text().await?;
        Ok(extract_cards(&body, &self.base_url))
    }

    /// One results page with bounded retries. Returns an empty list when the
    /// page yielded nothing usable.
    async fn fetch_page(&self, query: &str, location: &str, page: u32) -> Vec<IndeedCard> {
        for attempt in 0..MAX_ATTEMPTS {
            let backoff = match self.request_page(query, location, page).await {
                Ok(cards) if !cards.is_empty() => return cards,
                Ok(_) => {
                    debug!("Indeed page {page} had no cards (attempt {})", attempt + 1);
                    self.retry_backoff * 2u32.pow(attempt)
                }
                Err(FetchError::RateLimited) => {
                    warn!("Indeed rate limited on page {page} (attempt {})", attempt + 1);
                    self.retry_backoff * RATE_LIMIT_FACTOR * (attempt + 1)
                }
                Err(e) if e.is_transient() => {
                    warn!("Indeed page {page} attempt {} failed: {e}", attempt + 1);
                    self.retry_backoff * 2u32.pow(attempt)
                }
                Err(e) => {
                    warn!("Indeed page {page} not retried: {e}");
                    return Vec::new();
                }
            };

            if attempt + 1 < MAX_ATTEMPTS {
                tokio::time::sleep(backoff).await;
            }
        }

        Vec::new()
    }
}

#[async_trait]
impl SourceFetcher for IndeedFetcher {
    fn source(&self) -> Source {
        Source::Indeed
    }

    async fn fetch(&self, query: &str, location: &str, page_budget: u32) -> Vec<RawPosting> {
        info!("Indeed: '{query}' in {location} (pages: {page_budget})");
        let mut postings = Vec::new();

        for page in 0..page_budget {
            let cards = self.fetch_page(query, location, page).await;
            if cards.is_empty() {
                info!("Indeed page {page} empty, ending pagination");
                break;
            }

            let mut fresh = 0;
            for card in cards {
                let raw = RawPosting::Indeed(card);
                if claim_unseen(self.dedup.as_ref(), &raw).await {
                    postings.push(raw);
                    fresh += 1;
                }
            }
            info!("Indeed page {page}: {fresh} fresh jobs");
        }

        postings
    }
}
