use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::{LlmProvider, ProviderChain, ProviderError, PROVIDER_TIMEOUT_SECS};

pub mod anthropic;
pub mod gemini;
pub mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;

/// API keys for every supported provider. Unset keys leave the provider out.
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    pub gemini: Option<String>,
    pub anthropic: Option<String>,
    pub openai: Option<String>,
    pub perplexity: Option<String>,
}

/// Builds the fallback chain in the given order, skipping providers without a
/// key and names that are not recognised.
pub fn build_chain(order: &[String], keys: &ProviderKeys) -> Result<ProviderChain, ProviderError> {
    let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();

    for name in order {
        let name = name.trim().to_lowercase();
        let provider: Arc<dyn LlmProvider> = match (name.as_str(), keys) {
            ("gemini", ProviderKeys { gemini: Some(key), .. }) => {
                Arc::new(GeminiProvider::new(key.clone())?)
            }
            ("anthropic", ProviderKeys { anthropic: Some(key), .. }) => {
                Arc::new(AnthropicProvider::new(key.clone())?)
            }
            ("openai", ProviderKeys { openai: Some(key), .. }) => {
                Arc::new(OpenAiCompatProvider::openai(key.clone())?)
            }
            ("perplexity", ProviderKeys { perplexity: Some(key), .. }) => {
                Arc::new(OpenAiCompatProvider::perplexity(key.clone())?)
            }
            ("gemini" | "anthropic" | "openai" | "perplexity", _) => continue,
            (other, _) => {
                warn!("Ignoring unknown provider '{other}' in provider order");
                continue;
            }
        };
        if providers.iter().any(|p| p.name() == provider.name()) {
            continue;
        }
        providers.push(provider);
    }

    let chain = ProviderChain::new(providers);
    if chain.is_empty() {
        warn!("No AI provider configured; semantic analysis will return degraded results");
    } else {
        info!("AI provider chain: {}", chain.names().join(" -> "));
    }
    Ok(chain)
}

pub(crate) fn http_client() -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
        .build()?)
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Pulls `error.message` out of an error body, falling back to the raw body.
/// All supported providers use that envelope.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(300).collect())
}
