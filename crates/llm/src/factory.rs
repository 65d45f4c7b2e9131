//! LLM provider factory.
//!
//! Builds the configured client. Secrets are resolved by the caller
//! (`AppConfig::llm_api_key`) and handed in here.

use crate::client::LlmClient;
use crate::providers::{MockLlmClient, OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use luxas_core::config::LlmSettings;
use luxas_core::{AppError, AppResult, RetryPolicy};
use std::sync::Arc;

/// Create an LLM client from settings.
///
/// # Errors
/// Returns `AppError::Config` if:
/// - Provider is unknown
/// - The provider needs an API key and none was given
pub fn create_client(
    settings: &LlmSettings,
    api_key: Option<String>,
    retry: RetryPolicy,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider)
        .ok_or_else(|| AppError::Config(format!("Unknown LLM provider: {}", settings.provider)))?;

    tracing::debug!(
        provider = provider.as_str(),
        model = %settings.model,
        "Creating LLM client"
    );

    match provider {
        ProviderType::OpenAI => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI provider requires API key".to_string())
            })?;
            let client = match &settings.endpoint {
                Some(endpoint) => OpenAiClient::with_base_url(endpoint, api_key, retry),
                None => OpenAiClient::new(api_key, retry),
            };
            Ok(Arc::new(client))
        }
        ProviderType::Ollama => {
            let client = match &settings.endpoint {
                Some(endpoint) => OllamaClient::with_base_url(endpoint, retry),
                None => OllamaClient::new(retry),
            };
            Ok(Arc::new(client))
        }
        ProviderType::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> LlmSettings {
        LlmSettings {
            provider: provider.to_string(),
            ..LlmSettings::default()
        }
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_client(&settings("ollama"), None, RetryPolicy::default()).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_openai_client_with_key() {
        let client = create_client(
            &settings("openai"),
            Some("sk-test".to_string()),
            RetryPolicy::default(),
        )
        .unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client(&settings("openai"), None, RetryPolicy::default()) {
            Err(AppError::Config(msg)) => assert!(msg.contains("requires API key")),
            _ => panic!("Expected config error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client(&settings("unknown"), None, RetryPolicy::default()) {
            Err(err) => assert!(err.to_string().contains("Unknown LLM provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
