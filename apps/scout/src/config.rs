use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cache::DEFAULT_TTL;
use crate::models::posting::Source;

/// Application configuration loaded from environment variables.
/// Core modules never read the environment; `main` hands the relevant
/// pieces to each constructor.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub cache_dir: String,
    pub cache_ttl: Duration,
    pub rapidapi_key: Option<String>,
    pub jsearch_base_url: String,
    pub indeed_base_url: String,
    pub gemini_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
    /// Provider names in fallback order. Providers without a key are skipped.
    pub provider_order: Vec<String>,
    pub enabled_sources: Vec<Source>,
    pub politeness_delay: Duration,
    pub page_budget: u32,
    pub search_queries: Vec<String>,
    pub search_locations: Vec<String>,
    pub profile_text_path: Option<String>,
    pub min_match_score: u32,
    pub analyze_top_n: usize,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: env_or("DATABASE_URL", "sqlite://scout.db?mode=rwc"),
            cache_dir: env_or("CACHE_DIR", "cache"),
            cache_ttl: Duration::from_secs(parse_env(
                "CACHE_TTL_SECS",
                DEFAULT_TTL.as_secs(),
            )?),
            rapidapi_key: optional_env("RAPIDAPI_KEY"),
            jsearch_base_url: env_or("JSEARCH_BASE_URL", "https://jsearch.p.rapidapi.com"),
            indeed_base_url: env_or("INDEED_BASE_URL", "https://www.indeed.com"),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            perplexity_api_key: optional_env("PERPLEXITY_API_KEY"),
            provider_order: split_list(&env_or(
                "LLM_PROVIDER_ORDER",
                "gemini,anthropic,openai,perplexity",
            )),
            enabled_sources: parse_sources(&env_or("ENABLED_SOURCES", "jsearch,indeed,ai_scout"))?,
            politeness_delay: Duration::from_millis(parse_env("POLITENESS_DELAY_MS", 3_000)?),
            page_budget: parse_env("PAGE_BUDGET", 3)?,
            search_queries: split_list(&env_or("SEARCH_QUERIES", "Software Engineer")),
            search_locations: split_list(&env_or("SEARCH_LOCATIONS", "Remote")),
            profile_text_path: optional_env("PROFILE_TEXT_PATH"),
            min_match_score: parse_env("MIN_MATCH_SCORE", 60)?,
            analyze_top_n: parse_env("ANALYZE_TOP_N", 5)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

/// Splits a comma-separated list, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_sources(raw: &str) -> Result<Vec<Source>> {
    split_list(raw)
        .iter()
        .map(|name| {
            name.parse::<Source>()
                .map_err(|e| anyhow::anyhow!("ENABLED_SOURCES: {e}"))
        })
        .collect()
}
