//! Media tone analysis.
//!
//! Searches press coverage for the law title and asks the model to
//! characterise each outlet's reaction.

use crate::news::{NewsArticle, NewsSearch};
use luxas_core::AppResult;
use luxas_knowledge::rag::prompt_request;
use luxas_llm::LlmClient;
use luxas_prompt::library::TONE;
use luxas_prompt::PromptLibrary;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct ToneReport {
    pub articles: Vec<NewsArticle>,
    pub analysis: String,
}

pub struct ToneAnalyzer {
    llm: Arc<dyn LlmClient>,
    news: Arc<dyn NewsSearch>,
    prompts: Arc<PromptLibrary>,
    model: String,
}

impl ToneAnalyzer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        news: Arc<dyn NewsSearch>,
        prompts: Arc<PromptLibrary>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            news,
            prompts,
            model: model.into(),
        }
    }

    pub async fn analyze(&self, law_text: &str, law_title: &str) -> AppResult<ToneReport> {
        let articles = self.news.search(law_title).await?;
        if articles.is_empty() {
            tracing::info!(title = %law_title, "No press coverage found");
            return Ok(ToneReport {
                articles,
                analysis: no_coverage(law_title),
            });
        }

        let listing = format_articles(&articles);
        let prompt = self
            .prompts
            .render(TONE, &[("lawText", law_text), ("articles", listing.as_str())])?;
        let request = prompt_request(prompt, &self.model, 0.7, None);
        let response = self.llm.complete(&request).await?;

        Ok(ToneReport {
            articles,
            analysis: response.text().to_string(),
        })
    }
}

fn no_coverage(title: &str) -> String {
    format!("Aucun article de presse trouvé pour « {} ».", title)
}

fn format_articles(articles: &[NewsArticle]) -> String {
    articles
        .iter()
        .map(|a| format!("- {} ({}) : {}", a.title, a.source, a.link))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxas_llm::MockLlmClient;

    struct StaticNews(Vec<NewsArticle>);

    #[async_trait::async_trait]
    impl NewsSearch for StaticNews {
        async fn search(&self, _query: &str) -> AppResult<Vec<NewsArticle>> {
            Ok(self.0.clone())
        }
    }

    fn analyzer(llm: Arc<MockLlmClient>, articles: Vec<NewsArticle>) -> ToneAnalyzer {
        ToneAnalyzer::new(
            llm,
            Arc::new(StaticNews(articles)),
            Arc::new(PromptLibrary::builtin().unwrap()),
            "gpt-4",
        )
    }

    #[tokio::test]
    async fn test_no_articles_skips_model() {
        let llm = Arc::new(MockLlmClient::new());
        let report = analyzer(llm.clone(), Vec::new())
            .analyze("Texte", "Loi logement")
            .await
            .unwrap();
        assert!(report.articles.is_empty());
        assert_eq!(report.analysis, "Aucun article de presse trouvé pour « Loi logement ».");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_articles_are_listed_in_prompt() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_response("- Le Monde : ton neutre");
        let articles = vec![NewsArticle {
            title: "Le Sénat adopte la loi".to_string(),
            source: "Le Monde".to_string(),
            link: "https://example.org/a".to_string(),
        }];

        let report = analyzer(llm.clone(), articles)
            .analyze("Article 1 : ...", "Loi logement")
            .await
            .unwrap();
        assert_eq!(report.analysis, "- Le Monde : ton neutre");

        let request = &llm.requests()[0];
        assert_eq!(request.temperature, Some(0.7));
        assert!(request
            .user
            .contains("- Le Sénat adopte la loi (Le Monde) : https://example.org/a"));
        assert!(request.user.contains("Voici un texte de loi :\nArticle 1 : ..."));
    }
}
