/// LLM client layer: every AI provider call in the crate goes through here.
///
/// A provider exposes one capability, `attempt(prompt) -> text`. Callers hold an
/// ordered `ProviderChain` and take the first provider whose answer parses.
/// A provider gets exactly one attempt per chain run; failures fall through to
/// the next provider instead of retrying the same one.
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

pub mod envelope;
pub mod prompts;
pub mod providers;

/// Bounded timeout for every provider HTTP call.
pub const PROVIDER_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider returned empty content")]
    EmptyContent,

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// A single AI backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short stable name, recorded on results for transparency.
    fn name(&self) -> &str;

    /// Sends the prompt once and returns the raw text answer.
    async fn attempt(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// What happened when a prompt was run through the chain.
#[derive(Debug)]
pub enum ChainOutcome<T> {
    Success { value: T, provider: String },
    NoProviders,
    AllFailed { attempts: usize, last_error: String },
}

/// Ordered fallback list of providers (primary first).
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Tries each provider once, in order, until one answer passes `parse`.
    /// A parse failure counts as a provider failure.
    pub async fn run<T, F>(&self, prompt: &str, parse: F) -> ChainOutcome<T>
    where
        F: Fn(&str) -> Result<T, ProviderError>,
    {
        if self.providers.is_empty() {
            return ChainOutcome::NoProviders;
        }

        let mut last_error = String::new();
        for provider in &self.providers {
            let result = match provider.attempt(prompt).await {
                Ok(text) => parse(&text),
                Err(e) => Err(e),
            };

            match result {
                Ok(value) => {
                    debug!("Provider {} answered", provider.name());
                    return ChainOutcome::Success {
                        value,
                        provider: provider.name().to_string(),
                    };
                }
                Err(e) => {
                    warn!("Provider {} failed, falling through: {e}", provider.name());
                    last_error = format!("{}: {e}", provider.name());
                }
            }
        }

        ChainOutcome::AllFailed {
            attempts: self.providers.len(),
            last_error,
        }
    }
}
