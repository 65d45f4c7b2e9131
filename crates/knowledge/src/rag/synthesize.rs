//! Grounded answer synthesis.
//!
//! The model only sees the retrieved passages (each cut to a fixed number of
//! characters) and a short, truncated slice of the conversation.

use super::retrieve::RetrievalResult;
use super::{prompt_request, truncate_chars, RagSettings};
use crate::conversation::{recent, ConversationTurn};
use luxas_core::{AppError, AppResult};
use luxas_llm::LlmClient;
use luxas_prompt::library::ANSWER;
use luxas_prompt::PromptLibrary;
use std::sync::Arc;

const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";

pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    settings: RagSettings,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>, settings: RagSettings) -> Self {
        Self {
            llm,
            prompts,
            settings,
        }
    }

    /// Answer `question` from `retrieval` only.
    ///
    /// Must not be called with an empty retrieval result.
    pub async fn synthesize(
        &self,
        question: &str,
        retrieval: &RetrievalResult,
        history: &[ConversationTurn],
    ) -> AppResult<String> {
        if retrieval.is_empty() {
            return Err(AppError::Knowledge(
                "Refusing to synthesize an answer without passages".to_string(),
            ));
        }

        let context = self.context_block(retrieval);
        let history = self.history_block(history);
        let prompt = self.prompts.render(
            ANSWER,
            &[
                ("history", history.as_str()),
                ("context", context.as_str()),
                ("question", question),
            ],
        )?;
        let request = prompt_request(
            prompt,
            &self.settings.model,
            self.settings.temperature,
            self.settings.max_tokens,
        );

        let response = self.llm.complete(&request).await?;
        let answer = response.text();
        if answer.is_empty() {
            return Err(AppError::Llm("Empty completion".to_string()));
        }

        tracing::debug!(
            passages = retrieval.len(),
            prompt_chars = request.user.chars().count(),
            "Synthesized answer"
        );
        Ok(answer.to_string())
    }

    /// `[Document: source | Chunk i]` blocks, numbered per source.
    fn context_block(&self, retrieval: &RetrievalResult) -> String {
        let limit = self.settings.retrieval.passage_context_chars;
        let mut per_source: Vec<(&str, usize)> = Vec::new();

        retrieval
            .passages
            .iter()
            .map(|scored| {
                let source = scored.passage.source.as_str();
                let number = match per_source.iter_mut().find(|(s, _)| *s == source) {
                    Some((_, count)) => {
                        *count += 1;
                        *count
                    }
                    None => {
                        per_source.push((source, 1));
                        1
                    }
                };
                format!(
                    "[Document: {} | Chunk {}]\n{}",
                    source,
                    number,
                    truncate_chars(&scored.passage.text, limit)
                )
            })
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR)
    }

    fn history_block(&self, history: &[ConversationTurn]) -> String {
        let turns = recent(history, self.settings.retrieval.synthesis_turns);
        if turns.is_empty() {
            return String::new();
        }

        let mut block = String::from("Historique de conversation :\n");
        for turn in turns {
            block.push_str(&format!(
                "{}: {}...\n",
                turn.role.label(),
                truncate_chars(&turn.content, self.settings.retrieval.turn_preview_chars)
            ));
        }
        block.push('\n');
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Passage, ScoredPassage};
    use luxas_llm::MockLlmClient;

    fn synthesizer(llm: Arc<MockLlmClient>) -> Synthesizer {
        Synthesizer::new(
            llm,
            Arc::new(PromptLibrary::builtin().unwrap()),
            RagSettings::default(),
        )
    }

    fn retrieval(items: &[(&str, &str)]) -> RetrievalResult {
        RetrievalResult {
            query: "q".to_string(),
            passages: items
                .iter()
                .enumerate()
                .map(|(i, (source, text))| ScoredPassage {
                    passage: Passage::new(*source, i as u32, None, (0, text.len()), *text),
                    score: 0.9,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_prompt_contains_numbered_context() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_response("La loi crée une allocation (loi_123.pdf).");
        let result = retrieval(&[
            ("loi_123.pdf", "Article 1"),
            ("loi_9.pdf", "Article 2"),
            ("loi_123.pdf", "Article 3"),
        ]);

        let answer = synthesizer(llm.clone())
            .synthesize("Quel est l'objet ?", &result, &[])
            .await
            .unwrap();
        assert_eq!(answer, "La loi crée une allocation (loi_123.pdf).");

        let request = &llm.requests()[0];
        assert!(request.user.starts_with("Documents disponibles :"));
        assert!(request.user.contains(
            "[Document: loi_123.pdf | Chunk 1]\nArticle 1\n\n---\n\n[Document: loi_9.pdf | Chunk 1]\nArticle 2\n\n---\n\n[Document: loi_123.pdf | Chunk 2]\nArticle 3"
        ));
        assert!(request.user.contains("Question actuelle : Quel est l'objet ?"));
        let system = request.system.as_deref().unwrap();
        assert!(system.contains("Je n'ai pas trouvé cette information dans les documents indexés."));
        assert_eq!(request.temperature, Some(0.1));
    }

    #[tokio::test]
    async fn test_passages_and_history_are_truncated() {
        let llm = Arc::new(MockLlmClient::new());
        let long_text = "é".repeat(800);
        let result = retrieval(&[("long.pdf", long_text.as_str())]);
        let history: Vec<_> = (0..6)
            .map(|i| ConversationTurn::user(format!("tour {} {}", i, "x".repeat(300))))
            .collect();

        synthesizer(llm.clone())
            .synthesize("Et ensuite ?", &result, &history)
            .await
            .unwrap();

        let prompt = &llm.requests()[0].user;
        assert!(prompt.contains(&format!("{}\n\nQuestion", "é".repeat(500))));
        assert!(!prompt.contains(&"é".repeat(501)));
        assert!(prompt.starts_with("Historique de conversation :\nUtilisateur: tour 2 "));
        assert!(!prompt.contains("tour 1 "));
        assert_eq!(prompt.matches("...\n").count(), 4);
    }

    #[tokio::test]
    async fn test_empty_completion_is_error() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_response("   ");
        let err = synthesizer(llm)
            .synthesize("q", &retrieval(&[("a.pdf", "t")]), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }

    #[tokio::test]
    async fn test_empty_retrieval_never_reaches_model() {
        let llm = Arc::new(MockLlmClient::new());
        let result = synthesizer(llm.clone())
            .synthesize("q", &RetrievalResult::default(), &[])
            .await;
        assert!(result.is_err());
        assert_eq!(llm.call_count(), 0);
    }
}
