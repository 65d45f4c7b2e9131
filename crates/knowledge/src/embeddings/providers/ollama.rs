//! Ollama embedding provider.
//!
//! Ollama's `/api/embeddings` endpoint takes one prompt per request, so
//! batches are embedded sequentially.

use crate::embeddings::EmbeddingProvider;
use luxas_core::config::EmbeddingSettings;
use luxas_core::{AppError, AppResult, RetryPolicy, Service};
use luxas_llm::http;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaProvider {
    pub fn new(settings: &EmbeddingSettings, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            retry,
        }
    }

    async fn embed_once(&self, url: &str, text: &str) -> AppResult<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };
        let response: EmbeddingResponse =
            http::send_json(Service::Embedding, self.client.post(url).json(&request)).await?;

        if response.embedding.len() != self.dimensions {
            return Err(AppError::Embedding(format!(
                "Ollama model '{}' returned {} dimensions, expected {}",
                self.model,
                response.embedding.len(),
                self.dimensions
            )));
        }
        Ok(response.embedding)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = http::join_url(&self.base_url, "api/embeddings");
        let mut embeddings = Vec::with_capacity(texts.len());

        for text in texts {
            let embedding = self
                .retry
                .run("ollama.embeddings", || self.embed_once(&url, text))
                .await?;
            embeddings.push(embedding);
        }

        debug!("Embedded {} texts", embeddings.len());
        Ok(embeddings)
    }
}
