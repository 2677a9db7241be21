use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::analysis::MatchAnalyzer;
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::db::create_pool;
use crate::dedup::SqlDedupStore;
use crate::discovery::Aggregator;
use crate::llm_client::providers::{build_chain, ProviderKeys};
use crate::models::posting::Source;
use crate::sources::{
    AiScoutFetcher, DescriptionFetcher, FetchSettings, IndeedFetcher, JSearchFetcher, SharedDedup,
    SourceFetcher,
};

/// Process-wide handles shared by every discovery and analysis call.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqlDedupStore>,
    pub aggregator: Arc<Aggregator>,
    pub details: Arc<DescriptionFetcher>,
    pub analyzer: MatchAnalyzer,
    pub config: Config,
}

impl AppState {
    /// Opens the store and cache and wires one fetcher per enabled source.
    pub async fn build(config: Config) -> Result<Self> {
        let db = create_pool(&config.database_url).await?;
        let store = Arc::new(SqlDedupStore::new(db));
        let dedup: SharedDedup = store.clone();

        let cache = Arc::new(ResponseCache::new(&config.cache_dir, config.cache_ttl));
        info!(
            "Response cache at {} (ttl {}s)",
            config.cache_dir,
            config.cache_ttl.as_secs()
        );

        let keys = ProviderKeys {
            gemini: config.gemini_api_key.clone(),
            anthropic: config.anthropic_api_key.clone(),
            openai: config.openai_api_key.clone(),
            perplexity: config.perplexity_api_key.clone(),
        };
        let chain = build_chain(&config.provider_order, &keys)
            .context("Failed to build AI provider chain")?;

        let settings = FetchSettings {
            politeness_delay: config.politeness_delay,
            ..FetchSettings::default()
        };

        let mut fetchers: Vec<Arc<dyn SourceFetcher>> = Vec::new();
        for source in &config.enabled_sources {
            let fetcher: Arc<dyn SourceFetcher> = match source {
                Source::JSearch => Arc::new(
                    JSearchFetcher::new(
                        config.rapidapi_key.clone(),
                        &config.jsearch_base_url,
                        &settings,
                        dedup.clone(),
                    )
                    .context("Failed to build JSearch client")?,
                ),
                Source::Indeed => Arc::new(
                    IndeedFetcher::new(&config.indeed_base_url, &settings, dedup.clone())
                        .context("Failed to build Indeed client")?,
                ),
                Source::AiScout => Arc::new(AiScoutFetcher::new(
                    chain.clone(),
                    cache.clone(),
                    dedup.clone(),
                    config.politeness_delay,
                )),
            };
            fetchers.push(fetcher);
        }

        let aggregator = Arc::new(Aggregator::new(fetchers));
        info!(
            "Enabled sources: {}",
            aggregator
                .sources()
                .iter()
                .map(Source::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let details = Arc::new(
            DescriptionFetcher::new(config.politeness_delay)
                .context("Failed to build description client")?,
        );

        Ok(Self {
            store,
            aggregator,
            details,
            analyzer: MatchAnalyzer::new(chain, cache),
            config,
        })
    }
}
