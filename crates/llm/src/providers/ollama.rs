//! Ollama chat provider.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md#generate-a-chat-completion

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::http;
use crate::providers::{chat_messages, ChatMessage};
use luxas_core::{AppResult, RetryPolicy, Service};
use serde::{Deserialize, Serialize};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct ChatBody {
    model: String,
    messages: Vec<ChatMessage>,
    options: SamplingOptions,
    stream: bool,
}

#[derive(Debug, Default, Serialize)]
struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    model: String,
    message: ChatMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

/// Client for a local or remote Ollama server.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl OllamaClient {
    pub fn new(retry: RetryPolicy) -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL, retry)
    }

    pub fn with_base_url(base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            retry,
        }
    }

    fn chat_body(&self, request: &LlmRequest) -> ChatBody {
        ChatBody {
            model: request.model.clone(),
            messages: chat_messages(request),
            options: SamplingOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream: false,
        }
    }

    async fn chat_once(&self, url: &str, body: &ChatBody) -> AppResult<ChatReply> {
        http::send_json(Service::LanguageModel, self.client.post(url).json(body)).await
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending chat request to Ollama");

        let body = self.chat_body(request);
        let url = http::join_url(&self.base_url, "api/chat");

        let reply = self
            .retry
            .run("ollama.chat", || self.chat_once(&url, &body))
            .await?;

        let usage = LlmUsage::new(reply.prompt_eval_count, reply.eval_count);
        tracing::debug!(tokens = usage.total_tokens, "Received completion from Ollama");

        Ok(LlmResponse {
            content: reply.message.content,
            model: reply.model,
            usage,
        })
    }
}
