//! Embedding gateway.
//!
//! Converts passages and queries into fixed-dimension vectors through an
//! external model. Providers are stateless per call and deterministic for a
//! fixed model version.

pub mod providers;

pub use providers::{MockProvider, OllamaProvider, OpenAiProvider};

use luxas_core::config::EmbeddingSettings;
use luxas_core::{AppError, AppResult, RetryPolicy};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Embedding provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProviderType {
    OpenAI,
    Ollama,
    Mock,
}

impl EmbeddingProviderType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "ollama" => Some(Self::Ollama),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Create an embedding provider from settings.
pub fn create_provider(
    settings: &EmbeddingSettings,
    api_key: Option<String>,
    retry: RetryPolicy,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let kind = EmbeddingProviderType::parse(&settings.provider).ok_or_else(|| {
        AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: openai, ollama, mock",
            settings.provider
        ))
    })?;

    tracing::debug!(
        provider = %settings.provider,
        model = %settings.model,
        dimensions = settings.dimensions,
        "Creating embedding provider"
    );

    match kind {
        EmbeddingProviderType::OpenAI => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI embeddings require an API key".to_string())
            })?;
            Ok(Arc::new(OpenAiProvider::new(settings, api_key, retry)))
        }
        EmbeddingProviderType::Ollama => Ok(Arc::new(OllamaProvider::new(settings, retry))),
        EmbeddingProviderType::Mock => Ok(Arc::new(MockProvider::new(settings.dimensions))),
    }
}
