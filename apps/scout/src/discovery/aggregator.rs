use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, info};

use super::canonical::canonicalize;
use super::local_score;
use crate::models::posting::{Posting, Source};
use crate::sources::{RawPosting, SourceFetcher};

/// Fans a search out to every enabled source and merges the results.
pub struct Aggregator {
    fetchers: Vec<Arc<dyn SourceFetcher>>,
}

impl Aggregator {
    pub fn new(fetchers: Vec<Arc<dyn SourceFetcher>>) -> Self {
        Self { fetchers }
    }

    pub fn sources(&self) -> Vec<Source> {
        self.fetchers.iter().map(|f| f.source()).collect()
    }

    /// Runs every fetcher whose source is in `sources` concurrently, one task
    /// each, and returns canonical postings in registration order. Duplicate
    /// URLs keep their first occurrence. With a non-blank `profile`, each
    /// posting gets a local relevance score; otherwise scores stay 0.
    ///
    /// A fetcher that panics contributes nothing; the others are unaffected.
    pub async fn discover(
        &self,
        query: &str,
        location: &str,
        sources: &[Source],
        page_budget: u32,
        profile: Option<&str>,
    ) -> Vec<Posting> {
        let handles: Vec<_> = self
            .fetchers
            .iter()
            .filter(|f| sources.contains(&f.source()))
            .map(|fetcher| {
                let fetcher = Arc::clone(fetcher);
                let query = query.to_string();
                let location = location.to_string();
                let source = fetcher.source();
                let handle = tokio::spawn(async move {
                    fetcher.fetch(&query, &location, page_budget).await
                });
                (source, handle)
            })
            .collect();

        let mut raw: Vec<RawPosting> = Vec::new();
        for (source, handle) in handles {
            match handle.await {
                Ok(found) => {
                    info!("{source}: {} new postings", found.len());
                    raw.extend(found);
                }
                Err(e) => error!("{source} fetcher aborted: {e}"),
            }
        }

        let profile = profile.filter(|p| !p.trim().is_empty());
        let mut seen_urls = HashSet::new();
        let postings: Vec<Posting> = raw
            .iter()
            .filter(|&found| {
                let first = seen_urls.insert(found.url());
                if !first {
                    debug!("Dropping duplicate {} posting {}", found.source(), found.url());
                }
                first
            })
            .map(canonicalize)
            .map(|mut posting| {
                if let Some(profile) = profile {
                    posting.local_score =
                        local_score::score(profile, &posting.title, &posting.description);
                }
                posting
            })
            .collect();

        info!(
            "Discovered {} postings for '{query}' in {location}",
            postings.len()
        );
        postings
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::sources::IndeedCard;

    struct FakeFetcher {
        source: Source,
        jobs: Vec<(&'static str, &'static str)>,
        panics: bool,
    }

    impl FakeFetcher {
        fn new(source: Source, jobs: &[(&'static str, &'static str)]) -> Arc<dyn SourceFetcher> {
            Arc::new(Self {
                source,
                jobs: jobs.to_vec(),
                panics: false,
            })
        }

        fn panicking(source: Source) -> Arc<dyn SourceFetcher> {
            Arc::new(Self {
                source,
                jobs: Vec::new(),
                panics: true,
            })
        }
    }

    #[async_trait]
    impl SourceFetcher for FakeFetcher {
        fn source(&self) -> Source {
            self.source
        }

        async fn fetch(&self, _query: &str, _location: &str, _page_budget: u32) -> Vec<RawPosting> {
            if self.panics {
                panic!("scraper blew up");
            }
            self.jobs
                .iter()
                .map(|(url, title)| {
                    RawPosting::Indeed(IndeedCard {
                        title: title.to_string(),
                        url: url.to_string(),
                        ..Default::default()
                    })
                })
                .collect()
        }
    }

    fn urls(postings: &[Posting]) -> Vec<&str> {
        postings.iter().map(|p| p.url.as_str()).collect()
    }

    const ALL: &[Source] = &[Source::JSearch, Source::Indeed, Source::AiScout];

    #[tokio::test]
    async fn test_duplicate_urls_across_sources_collapse() {
        let aggregator = Aggregator::new(vec![
            FakeFetcher::new(Source::JSearch, &[("https://a", "First"), ("https://b", "B")]),
            FakeFetcher::new(Source::Indeed, &[("https://a", "Second"), ("https://c", "C")]),
        ]);

        let postings = aggregator.discover("q", "l", ALL, 1, None).await;

        assert_eq!(urls(&postings), vec!["https://a", "https://b", "https://c"]);
        assert_eq!(postings[0].title, "First");
    }

    #[tokio::test]
    async fn test_panicking_fetcher_is_isolated() {
        let aggregator = Aggregator::new(vec![
            FakeFetcher::panicking(Source::JSearch),
            FakeFetcher::new(Source::Indeed, &[("https://ok", "Fine")]),
        ]);

        let postings = aggregator.discover("q", "l", ALL, 1, None).await;

        assert_eq!(urls(&postings), vec!["https://ok"]);
    }

    #[tokio::test]
    async fn test_only_enabled_sources_run() {
        let aggregator = Aggregator::new(vec![
            FakeFetcher::panicking(Source::JSearch),
            FakeFetcher::new(Source::Indeed, &[("https://i", "Indeed job")]),
            FakeFetcher::new(Source::AiScout, &[("https://s", "Scout job")]),
        ]);

        let postings = aggregator
            .discover("q", "l", &[Source::AiScout], 1, None)
            .await;

        assert_eq!(urls(&postings), vec!["https://s"]);
    }

    #[tokio::test]
    async fn test_local_score_needs_profile() {
        let aggregator = Aggregator::new(vec![FakeFetcher::new(
            Source::Indeed,
            &[("https://fs", "Functional Safety Engineer")],
        )]);

        let unscored = aggregator.discover("q", "l", ALL, 1, None).await;
        assert_eq!(unscored[0].local_score, 0);

        let blank = aggregator.discover("q", "l", ALL, 1, Some("   ")).await;
        assert_eq!(blank[0].local_score, 0);

        let scored = aggregator
            .discover("q", "l", ALL, 1, Some("Functional Safety Engineer, ISO 26262"))
            .await;
        assert!(scored[0].local_score > 50);
    }

    #[test]
    fn test_reports_registered_sources() {
        let aggregator = Aggregator::new(vec![
            FakeFetcher::new(Source::Indeed, &[]),
            FakeFetcher::new(Source::JSearch, &[]),
        ]);
        assert_eq!(aggregator.sources(), vec![Source::Indeed, Source::JSearch]);
    }
}
