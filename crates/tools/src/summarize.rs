//! Plain-language summary of a law text.

use luxas_core::{AppError, AppResult};
use luxas_knowledge::rag::prompt_request;
use luxas_llm::LlmClient;
use luxas_prompt::library::SUMMARIZE;
use luxas_prompt::PromptLibrary;
use std::sync::Arc;

pub struct Summarizer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>, model: impl Into<String>) -> Self {
        Self {
            llm,
            prompts,
            model: model.into(),
        }
    }

    pub async fn summarize(&self, law_text: &str) -> AppResult<String> {
        if law_text.trim().is_empty() {
            return Err(AppError::Document("Nothing to summarize: empty text".to_string()));
        }

        let prompt = self.prompts.render(SUMMARIZE, &[("text", law_text)])?;
        let request = prompt_request(prompt, &self.model, 0.0, None);
        let response = self.llm.complete(&request).await?;

        tracing::debug!(input_chars = law_text.chars().count(), "Summarized law text");
        Ok(response.text().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxas_llm::MockLlmClient;

    #[tokio::test]
    async fn test_summarize_uses_legal_prompt() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_response("  Cette loi crée une allocation.  ");
        let summarizer = Summarizer::new(
            llm.clone(),
            Arc::new(PromptLibrary::builtin().unwrap()),
            "gpt-4",
        );

        let summary = summarizer.summarize("Article 1 : une allocation est créée.").await.unwrap();
        assert_eq!(summary, "Cette loi crée une allocation.");

        let request = &llm.requests()[0];
        assert_eq!(
            request.system.as_deref(),
            Some("Tu es un assistant juridique spécialisé dans les lois françaises.")
        );
        assert_eq!(request.temperature, Some(0.0));
        assert!(request.user.starts_with("Voici un texte de loi :\nArticle 1"));
        assert!(request.user.ends_with("Résumé :"));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let llm = Arc::new(MockLlmClient::new());
        let summarizer = Summarizer::new(llm.clone(), Arc::new(PromptLibrary::builtin().unwrap()), "gpt-4");
        assert!(summarizer.summarize("  \n").await.is_err());
        assert_eq!(llm.call_count(), 0);
    }
}
