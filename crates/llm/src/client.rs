//! Language model seam.
//!
//! Every model call in the workspace is a single system + user exchange
//! with explicit sampling parameters; providers translate it to their wire
//! format.

use luxas_core::AppResult;
use serde::{Deserialize, Serialize};

/// One system + user exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// User turn: the rendered prompt body
    pub user: String,

    pub model: String,

    /// 0.0 for extraction and grounded answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    pub fn new(user: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Completion returned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,

    /// Model reported by the provider, which may differ from the requested alias
    pub model: String,

    #[serde(default)]
    pub usage: LlmUsage,
}

impl LlmResponse {
    /// Completion text without surrounding whitespace.
    pub fn text(&self) -> &str {
        self.content.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.text().is_empty()
    }
}

/// Token counts, when the provider reports them.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl LlmUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A language model provider.
///
/// Implementations apply their own timeout and retry policy, so callers
/// see either a completion or a classified `AppError`.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}
