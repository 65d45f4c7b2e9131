//! Follow-up question reformulation.

use super::{prompt_request, RagSettings};
use crate::conversation::{recent, ConversationTurn};
use luxas_core::AppResult;
use luxas_llm::LlmClient;
use luxas_prompt::library::REFORMULATE;
use luxas_prompt::PromptLibrary;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReformulationState {
    /// No history: the question goes to retrieval as is.
    Stateless,
    /// History present: the model may rewrite the question.
    Contextual,
}

impl ReformulationState {
    pub fn for_history(history: &[ConversationTurn]) -> Self {
        if history.is_empty() {
            ReformulationState::Stateless
        } else {
            ReformulationState::Contextual
        }
    }
}

/// Rewrites context-dependent questions into self-contained ones.
pub struct Reformulator {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    settings: RagSettings,
}

impl Reformulator {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>, settings: RagSettings) -> Self {
        Self {
            llm,
            prompts,
            settings,
        }
    }

    /// Always returns a non-empty query; falls back to `question` when the
    /// model fails or answers with nothing usable.
    pub async fn reformulate(&self, question: &str, history: &[ConversationTurn]) -> String {
        if ReformulationState::for_history(history) == ReformulationState::Stateless {
            return question.to_string();
        }

        match self.rewrite(question, history).await {
            Ok(Some(rewritten)) => {
                if rewritten != question {
                    tracing::info!(original = %question, reformulated = %rewritten, "Reformulated question");
                }
                rewritten
            }
            Ok(None) => {
                tracing::warn!("Reformulation returned nothing usable, keeping original question");
                question.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reformulation failed, keeping original question");
                question.to_string()
            }
        }
    }

    async fn rewrite(&self, question: &str, history: &[ConversationTurn]) -> AppResult<Option<String>> {
        let transcript = transcript(history, self.settings.retrieval.reformulation_turns);
        let prompt = self.prompts.render(
            REFORMULATE,
            &[("transcript", transcript.as_str()), ("question", question)],
        )?;
        let request = prompt_request(
            prompt,
            &self.settings.model,
            self.settings.temperature,
            self.settings.max_tokens,
        );

        let response = self.llm.complete(&request).await?;
        Ok(clean(response.text()))
    }
}

/// `Label: content` lines for the most recent `turns` turns.
fn transcript(history: &[ConversationTurn], turns: usize) -> String {
    recent(history, turns)
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Opening and closing quotes a model may wrap its rewrite in.
const QUOTE_PAIRS: [(char, char); 4] = [('"', '"'), ('«', '»'), ('“', '”'), ('\'', '\'')];

/// Strip whitespace and matched wrapping quotes; `None` when nothing is left.
fn clean(output: &str) -> Option<String> {
    let mut text = output.trim();
    while let Some(inner) = QUOTE_PAIRS.iter().find_map(|(open, close)| {
        text.strip_prefix(*open)
            .and_then(|rest| rest.strip_suffix(*close))
    }) {
        text = inner.trim();
    }

    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
