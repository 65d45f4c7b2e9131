//! The answer pipeline and its context object.

use super::citations::CitationAssembler;
use super::reformulate::Reformulator;
use super::retrieve::{RetrievalResult, Retriever};
use super::synthesize::Synthesizer;
use super::types::{AnswerWithCitations, RagAnswer, Stage};
use super::RagSettings;
use crate::components::{embedding_model, language_model, vector_store};
use crate::conversation::ConversationTurn;
use crate::embeddings::EmbeddingProvider;
use crate::index::{CollectionSpec, VectorIndex};
use luxas_core::{AppConfig, AppError, AppResult};
use luxas_llm::LlmClient;
use luxas_prompt::PromptLibrary;
use std::sync::Arc;
use tracing::instrument;

/// Everything a question needs, built once and shared across sessions.
///
/// Holds no conversation state: the caller passes its history on every
/// call, so independent sessions can use one context concurrently.
pub struct RagContext {
    llm: Arc<dyn LlmClient>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    collection: CollectionSpec,
    reformulator: Reformulator,
    retriever: Retriever,
    synthesizer: Synthesizer,
    assembler: CitationAssembler,
}

impl RagContext {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        collection: CollectionSpec,
        prompts: PromptLibrary,
        settings: RagSettings,
    ) -> Self {
        let prompts = Arc::new(prompts);
        Self {
            reformulator: Reformulator::new(llm.clone(), prompts.clone(), settings.clone()),
            retriever: Retriever::new(
                embedder.clone(),
                index.clone(),
                collection.name.clone(),
                settings.retrieval.top_k,
            ),
            synthesizer: Synthesizer::new(llm.clone(), prompts, settings.clone()),
            assembler: CitationAssembler::from_settings(&settings.retrieval),
            llm,
            embedder,
            index,
            collection,
        }
    }

    /// Build the configured components. Credentials must already be validated.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let llm = language_model(config)?;
        let embedder = embedding_model(config)?;
        let index = vector_store(config)?;

        let prompts = PromptLibrary::load(&config.workspace)?;
        let collection = CollectionSpec::new(&config.vector_store.collection, embedder.dimensions());

        tracing::debug!(
            llm = llm.provider_name(),
            embedder = embedder.provider_name(),
            index = index.backend_name(),
            collection = %collection.name,
            "Initialized RAG context"
        );

        Ok(Self::new(
            llm,
            embedder,
            index,
            collection,
            prompts,
            RagSettings::from_config(config),
        ))
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn collection(&self) -> &CollectionSpec {
        &self.collection
    }

    /// Answer one question against the indexed corpus.
    ///
    /// Never fails: every error is folded into a user-facing [`RagAnswer`].
    #[instrument(skip(self, question, history), fields(collection = %self.collection.name, turns = history.len()))]
    pub async fn answer(&self, question: &str, history: &[ConversationTurn]) -> RagAnswer {
        match self.index.collection_info(&self.collection.name).await {
            Ok(Some(_)) => {}
            Ok(None) | Err(AppError::CollectionNotFound(_)) => {
                tracing::warn!("Collection does not exist");
                return RagAnswer::NotInitialized;
            }
            Err(e) => return failed(Stage::Retrieval, e),
        }

        let search_query = self.reformulator.reformulate(question, history).await;

        let retrieval = match self.retriever.retrieve(&search_query).await {
            Ok(retrieval) => retrieval,
            Err(AppError::CollectionNotFound(_)) => return RagAnswer::NotInitialized,
            Err(e) => return failed(Stage::Retrieval, e),
        };

        if retrieval.is_empty() {
            tracing::info!(query = %search_query, "No passages retrieved");
            return RagAnswer::NoResults;
        }

        let answer_text = match self.synthesizer.synthesize(question, &retrieval, history).await {
            Ok(text) => text,
            Err(e) => return failed(Stage::Synthesis, e),
        };

        RagAnswer::Answered(self.finish(answer_text, search_query, retrieval))
    }

    /// Chat-surface entry point: the rendered answer string.
    pub async fn ask(&self, question: &str, history: &[ConversationTurn]) -> String {
        self.answer(question, history).await.render()
    }

    fn finish(
        &self,
        answer_text: String,
        search_query: String,
        retrieval: RetrievalResult,
    ) -> AnswerWithCitations {
        AnswerWithCitations {
            citations_block: self.assembler.assemble(&retrieval),
            answer_text,
            search_query,
            retrieval,
        }
    }
}

fn failed(stage: Stage, error: AppError) -> RagAnswer {
    tracing::error!(?stage, error = %error, "Pipeline stage failed");
    RagAnswer::Failed {
        stage,
        message: error.to_string(),
    }
}
