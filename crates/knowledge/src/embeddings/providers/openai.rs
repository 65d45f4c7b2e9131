//! OpenAI embeddings provider.

use crate::embeddings::EmbeddingProvider;
use luxas_core::config::EmbeddingSettings;
use luxas_core::{AppError, AppResult, RetryPolicy, Service};
use luxas_llm::http;
use serde::{Deserialize, Serialize};
use tracing::instrument;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    retry: RetryPolicy,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    pub fn new(settings: &EmbeddingSettings, api_key: String, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            api_key,
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            retry,
        }
    }

    async fn embed_once(&self, url: &str, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let response: EmbeddingResponse = http::send_json(
            Service::Embedding,
            self.client
                .post(url)
                .bearer_auth(&self.api_key)
                .json(&request),
        )
        .await?;

        order_embeddings(response.data, texts.len(), self.dimensions)
    }
}

/// Put embeddings back in request order and check their shape.
fn order_embeddings(
    mut data: Vec<EmbeddingData>,
    expected_count: usize,
    dimensions: usize,
) -> AppResult<Vec<Vec<f32>>> {
    if data.len() != expected_count {
        return Err(AppError::Embedding(format!(
            "Expected {} embeddings, got {}",
            expected_count,
            data.len()
        )));
    }

    data.sort_by_key(|d| d.index);

    data.into_iter()
        .map(|d| {
            if d.embedding.len() == dimensions {
                Ok(d.embedding)
            } else {
                Err(AppError::Embedding(format!(
                    "Embedding has {} dimensions, expected {}",
                    d.embedding.len(),
                    dimensions
                )))
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "openai", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = http::join_url(&self.base_url, "embeddings");
        self.retry
            .run("openai.embeddings", || self.embed_once(&url, texts))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(index: usize, value: f32) -> EmbeddingData {
        EmbeddingData {
            index,
            embedding: vec![value; 3],
        }
    }

    #[test]
    fn test_embeddings_are_reordered_by_index() {
        let ordered = order_embeddings(vec![data(1, 1.0), data(0, 0.0), data(2, 2.0)], 3, 3).unwrap();
        assert_eq!(ordered[0][0], 0.0);
        assert_eq!(ordered[1][0], 1.0);
        assert_eq!(ordered[2][0], 2.0);
    }

    #[test]
    fn test_count_mismatch_is_error() {
        assert!(order_embeddings(vec![data(0, 0.0)], 2, 3).is_err());
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let err = order_embeddings(vec![data(0, 0.0)], 1, 1536).unwrap_err();
        assert!(err.to_string().contains("expected 1536"));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let provider = OpenAiProvider::new(
            &EmbeddingSettings::default(),
            "sk-secret".to_string(),
            RetryPolicy::default(),
        );
        assert!(!format!("{:?}", provider).contains("sk-secret"));
    }
}
