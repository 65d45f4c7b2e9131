//! Pipeline outcome types.

use super::retrieve::RetrievalResult;
use serde::Serialize;

/// Returned when retrieval finds nothing; the model is never called.
pub const NO_RESULTS_SENTINEL: &str =
    "⚠️ Aucun document pertinent trouvé. Veuillez d'abord indexer des documents.";

/// Returned when the collection does not exist yet.
pub const NOT_INITIALIZED_SENTINEL: &str =
    "⚠️ Index non initialisé ! Indexez d'abord des documents.";

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Retrieval,
    Synthesis,
}

/// A grounded answer and the passages it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerWithCitations {
    pub answer_text: String,
    pub citations_block: String,
    /// Query actually sent to the retriever, after reformulation
    pub search_query: String,
    #[serde(skip)]
    pub retrieval: RetrievalResult,
}

impl AnswerWithCitations {
    pub fn render(&self) -> String {
        format!("{}{}", self.answer_text, self.citations_block)
    }
}

/// Outcome of one question.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RagAnswer {
    Answered(AnswerWithCitations),
    NoResults,
    NotInitialized,
    Failed { stage: Stage, message: String },
}

impl RagAnswer {
    /// User-facing text.
    pub fn render(&self) -> String {
        match self {
            RagAnswer::Answered(answer) => answer.render(),
            RagAnswer::NoResults => NO_RESULTS_SENTINEL.to_string(),
            RagAnswer::NotInitialized => NOT_INITIALIZED_SENTINEL.to_string(),
            RagAnswer::Failed {
                stage: Stage::Retrieval,
                message,
            } => format!("❌ Erreur lors de la recherche : {}", message),
            RagAnswer::Failed {
                stage: Stage::Synthesis,
                message,
            } => format!("❌ Erreur lors de la génération de la réponse : {}", message),
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, RagAnswer::Answered(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_render_verbatim() {
        assert_eq!(RagAnswer::NoResults.render(), NO_RESULTS_SENTINEL);
        assert_eq!(RagAnswer::NotInitialized.render(), NOT_INITIALIZED_SENTINEL);
    }

    #[test]
    fn test_failure_render() {
        let failed = RagAnswer::Failed {
            stage: Stage::Synthesis,
            message: "LLM error: HTTP 401".to_string(),
        };
        assert_eq!(
            failed.render(),
            "❌ Erreur lors de la génération de la réponse : LLM error: HTTP 401"
        );
        assert!(!failed.is_answered());
    }

    #[test]
    fn test_json_status_tag() {
        let json = serde_json::to_value(RagAnswer::NoResults).unwrap();
        assert_eq!(json["status"], "no_results");
    }
}
