//! Retrieval-augmented answering.
//!
//! `reformulate → retrieve → synthesize → cite`, driven by [`RagContext`].

pub mod citations;
pub mod pipeline;
pub mod reformulate;
pub mod retrieve;
pub mod synthesize;
pub mod types;

pub use citations::CitationAssembler;
pub use pipeline::RagContext;
pub use reformulate::{ReformulationState, Reformulator};
pub use retrieve::{RetrievalResult, Retriever, SourceGroup};
pub use synthesize::Synthesizer;
pub use types::{
    AnswerWithCitations, RagAnswer, Stage, NOT_INITIALIZED_SENTINEL, NO_RESULTS_SENTINEL,
};

use luxas_core::config::{AppConfig, RetrievalSettings};
use luxas_llm::LlmRequest;
use luxas_prompt::BuiltPrompt;

/// Model and context-window settings for the pipeline.
#[derive(Debug, Clone)]
pub struct RagSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub retrieval: RetrievalSettings,
}

impl RagSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            retrieval: config.retrieval.clone(),
        }
    }
}

impl Default for RagSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Turn a rendered prompt into a completion request.
///
/// Prompt-level behaviour wins over the configured defaults.
pub fn prompt_request(
    prompt: BuiltPrompt,
    model: &str,
    temperature: f32,
    max_tokens: Option<u32>,
) -> LlmRequest {
    let mut request = LlmRequest::new(prompt.user, model)
        .with_temperature(prompt.temperature.unwrap_or(temperature));
    if let Some(system) = prompt.system {
        request = request.with_system(system);
    }
    if let Some(max_tokens) = prompt.max_tokens.or(max_tokens) {
        request = request.with_max_tokens(max_tokens);
    }
    request
}

/// First `max_chars` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}
