//! Scripted LLM client for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use luxas_core::{AppError, AppResult};

pub const DEFAULT_MOCK_RESPONSE: &str = "Réponse simulée.";

/// Replays queued responses in order, then falls back to a fixed reply.
///
/// Every request is recorded so tests can inspect prompts and count calls.
pub struct MockLlmClient {
    queue: Mutex<VecDeque<AppResult<String>>>,
    fallback: String,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::with_fallback(DEFAULT_MOCK_RESPONSE)
    }

    pub fn with_fallback(fallback: impl Into<String>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful completion.
    pub fn push_response(&self, content: impl Into<String>) -> &Self {
        lock(&self.queue).push_back(Ok(content.into()));
        self
    }

    /// Queue a failure.
    pub fn push_error(&self, error: AppError) -> &Self {
        lock(&self.queue).push_back(Err(error));
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        lock(&self.requests).clone()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        lock(&self.requests).push(request.clone());

        let next = lock(&self.queue).pop_front();
        let content = match next {
            Some(result) => result?,
            None => self.fallback.clone(),
        };

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_then_fallback() {
        let client = MockLlmClient::with_fallback("par défaut");
        client.push_response("premier");
        client.push_error(AppError::Llm("HTTP 400".to_string()));

        let request = LlmRequest::new("Question", "mock");
        assert_eq!(client.complete(&request).await.unwrap().content, "premier");
        assert!(client.complete(&request).await.is_err());
        assert_eq!(client.complete(&request).await.unwrap().content, "par défaut");
        assert_eq!(client.call_count(), 3);
        assert_eq!(client.requests()[0].user, "Question");
    }
}
