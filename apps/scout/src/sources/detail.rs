//! Full posting descriptions, read from the posting page itself.
//!
//! Listing pages only carry a snippet. Before a posting is analyzed its page is
//! fetched once and its readable text handed to the analyzer instead.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::indeed::{selectors, USER_AGENT};
use super::Throttle;
use crate::errors::FetchError;
use crate::llm_client::prompts::truncate_chars;

pub const DESCRIPTION_UNAVAILABLE: &str = "Description not available";

const MAX_DESCRIPTION_CHARS: usize = 5000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const DESCRIPTION_SELECTORS: &[&str] = &[
    "#jobDescriptionText",
    "div.jobsearch-jobDescriptionText",
    "div[class*=description]",
];

/// Text of `root` without script and style contents, whitespace collapsed.
fn visible_text(root: ElementRef<'_>) -> String {
    root.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(ElementRef::wrap)?;
            match parent.value().name() {
                "script" | "style" | "noscript" => None,
                _ => Some(&**text),
            }
        })
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Readable text of a posting page: the description block when one is
/// recognised, else the whole body. Cut to 5000 characters.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let text = selectors(DESCRIPTION_SELECTORS)
        .iter()
        .flat_map(|sel| document.select(sel))
        .map(visible_text)
        .find(|text| !text.is_empty())
        .or_else(|| {
            let body = Selector::parse("body").ok()?;
            document.select(&body).next().map(visible_text)
        })
        .unwrap_or_default();

    truncate_chars(&text, MAX_DESCRIPTION_CHARS).to_string()
}

pub struct DescriptionFetcher {
    client: Client,
    throttle: Throttle,
}

impl DescriptionFetcher {
    pub fn new(politeness_delay: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            throttle: Throttle::new(politeness_delay),
        })
    }

    async fn request(&self, url: &str) -> Result<String, FetchError> {
        self.throttle.wait().await;

        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(FetchError::RateLimited),
            status => return Err(FetchError::Status(status.as_u16())),
        }

        let body = response.text().await?;
        Ok(page_text(&body))
    }

    /// Page text for the posting at `url`. Never fails: any trouble yields
    /// [`DESCRIPTION_UNAVAILABLE`].
    pub async fn fetch_description(&self, url: &str) -> String {
        match self.request(url).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => {
                debug!("No readable text at {url}");
                DESCRIPTION_UNAVAILABLE.to_string()
            }
            Err(e) => {
                warn!("Could not fetch description from {url}: {e}");
                DESCRIPTION_UNAVAILABLE.to_string()
            }
        }
    }
}
