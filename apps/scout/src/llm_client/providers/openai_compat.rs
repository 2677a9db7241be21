//! Chat-completions provider for OpenAI and API-compatible services (Perplexity).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{error_message, http_client};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmProvider, ProviderError};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o-mini";
const PERPLEXITY_URL: &str = "https://api.perplexity.ai/chat/completions";
const PERPLEXITY_MODEL: &str = "llama-3.1-sonar-small-128k-online";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn text(self) -> Option<String> {
        self.choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
    }
}

pub struct OpenAiCompatProvider {
    name: &'static str,
    client: Client,
    api_key: String,
    endpoint: String,
    model: &'static str,
}

impl OpenAiCompatProvider {
    pub fn openai(api_key: String) -> Result<Self, ProviderError> {
        Self::build("openai", api_key, OPENAI_URL, OPENAI_MODEL)
    }

    pub fn perplexity(api_key: String) -> Result<Self, ProviderError> {
        Self::build("perplexity", api_key, PERPLEXITY_URL, PERPLEXITY_MODEL)
    }

    fn build(
        name: &'static str,
        api_key: String,
        endpoint: &str,
        model: &'static str,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            name,
            client: http_client()?,
            api_key,
            endpoint: endpoint.to_string(),
            model,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn attempt(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: self.model,
            temperature: 0.2,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: JSON_ONLY_SYSTEM,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed.text().ok_or(ProviderError::EmptyContent)
    }
}
