//! LLM integration crate for LuXas.
//!
//! This crate provides a provider-agnostic abstraction for the language
//! model used to reformulate follow-up questions and to write grounded
//! answers. Providers share one trait and one timeout/retry policy.
//!
//! # Providers
//! - **OpenAI**: hosted chat completions (default)
//! - **Ollama**: local LLM runtime
//! - **Mock**: scripted responses for tests and offline runs
//!
//! # Example
//! ```no_run
//! use luxas_core::RetryPolicy;
//! use luxas_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new(RetryPolicy::default());
//! let request = LlmRequest::new("Bonjour", "llama3.2").with_temperature(0.0);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod http;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockLlmClient, OllamaClient, OpenAiClient};
pub use types::ProviderType;
