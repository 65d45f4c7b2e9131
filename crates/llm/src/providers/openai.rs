//! OpenAI chat completions provider.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::http;
use crate::providers::{chat_messages, ChatMessage};
use luxas_core::{AppResult, RetryPolicy, Service};
use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenAI LLM client.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, retry: RetryPolicy) -> Self {
        Self::with_base_url(DEFAULT_OPENAI_URL, api_key, retry)
    }

    /// Point at an OpenAI-compatible endpoint.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            retry,
        }
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        ChatRequest {
            model: request.model.clone(),
            messages: chat_messages(request),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    async fn chat_once(&self, url: &str, body: &ChatRequest) -> AppResult<ChatResponse> {
        http::send_json(
            Service::LanguageModel,
            self.client.post(url).bearer_auth(&self.api_key).json(body),
        )
        .await
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending chat completion to OpenAI");

        let body = self.to_chat_request(request);
        let url = http::join_url(&self.base_url, "chat/completions");

        let response = self
            .retry
            .run("openai.chat", || self.chat_once(&url, &body))
            .await?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                http::service_error(Service::LanguageModel, "Completion returned no choices")
            })?;

        tracing::debug!(tokens = usage.total_tokens, "Received completion from OpenAI");

        Ok(LlmResponse {
            content,
            model: response.model,
            usage,
        })
    }
}
