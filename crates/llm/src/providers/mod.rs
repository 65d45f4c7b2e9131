//! Language model providers.

pub mod mock;
pub mod ollama;
pub mod openai;

pub use mock::MockLlmClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::client::LlmRequest;
use serde::{Deserialize, Serialize};

/// Chat message shared by the OpenAI and Ollama chat endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// System message (if any) followed by the user message.
pub(crate) fn chat_messages(request: &LlmRequest) -> Vec<ChatMessage> {
    let system = request.system.as_ref().map(|content| ChatMessage {
        role: "system".to_string(),
        content: content.clone(),
    });
    let user = ChatMessage {
        role: "user".to_string(),
        content: request.user.clone(),
    };
    system.into_iter().chain(std::iter::once(user)).collect()
}
