//! Typed component initialisation.
//!
//! Each external collaborator has its own settings struct; the set of
//! kinds is closed, so callers match on [`Component`] instead of looking
//! components up by name.

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::index::{open_index, VectorIndex};
use luxas_core::config::{EmbeddingSettings, LlmSettings, VectorStoreSettings};
use luxas_core::{AppConfig, AppError, AppResult, RetryPolicy};
use luxas_llm::{create_client, LlmClient};
use std::sync::Arc;

/// What to build.
#[derive(Debug, Clone)]
pub enum ComponentSpec {
    LanguageModel(LlmSettings),
    EmbeddingModel(EmbeddingSettings),
    VectorStore(VectorStoreSettings),
}

impl ComponentSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            ComponentSpec::LanguageModel(_) => "language_model",
            ComponentSpec::EmbeddingModel(_) => "embedding_model",
            ComponentSpec::VectorStore(_) => "vector_store",
        }
    }
}

/// A built component.
pub enum Component {
    LanguageModel(Arc<dyn LlmClient>),
    EmbeddingModel(Arc<dyn EmbeddingProvider>),
    VectorStore(Arc<dyn VectorIndex>),
}

impl Component {
    fn kind(&self) -> &'static str {
        match self {
            Component::LanguageModel(_) => "language_model",
            Component::EmbeddingModel(_) => "embedding_model",
            Component::VectorStore(_) => "vector_store",
        }
    }

    fn mismatch(&self, expected: &str) -> AppError {
        AppError::Other(format!("Expected a {} component, got {}", expected, self.kind()))
    }

    pub fn into_language_model(self) -> AppResult<Arc<dyn LlmClient>> {
        match self {
            Component::LanguageModel(llm) => Ok(llm),
            other => Err(other.mismatch("language_model")),
        }
    }

    pub fn into_embedding_model(self) -> AppResult<Arc<dyn EmbeddingProvider>> {
        match self {
            Component::EmbeddingModel(embedder) => Ok(embedder),
            other => Err(other.mismatch("embedding_model")),
        }
    }

    pub fn into_vector_store(self) -> AppResult<Arc<dyn VectorIndex>> {
        match self {
            Component::VectorStore(index) => Ok(index),
            other => Err(other.mismatch("vector_store")),
        }
    }
}

/// The configured language model.
pub fn language_model(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    initialize_component(&ComponentSpec::LanguageModel(config.llm.clone()), config)?
        .into_language_model()
}

/// The configured embedding model.
pub fn embedding_model(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    initialize_component(&ComponentSpec::EmbeddingModel(config.embedding.clone()), config)?
        .into_embedding_model()
}

/// The configured vector store.
pub fn vector_store(config: &AppConfig) -> AppResult<Arc<dyn VectorIndex>> {
    initialize_component(&ComponentSpec::VectorStore(config.vector_store.clone()), config)?
        .into_vector_store()
}

/// Build one component. Credentials and network settings come from `config`.
pub fn initialize_component(spec: &ComponentSpec, config: &AppConfig) -> AppResult<Component> {
    let retry = RetryPolicy::from_settings(&config.network);
    tracing::debug!(kind = spec.kind(), "Initializing component");

    match spec {
        ComponentSpec::LanguageModel(settings) => {
            let mut scoped = config.clone();
            scoped.llm = settings.clone();
            let client = create_client(settings, scoped.llm_api_key()?, retry)?;
            Ok(Component::LanguageModel(client))
        }
        ComponentSpec::EmbeddingModel(settings) => {
            let mut scoped = config.clone();
            scoped.embedding = settings.clone();
            let provider = create_provider(settings, scoped.embedding_api_key()?, retry)?;
            Ok(Component::EmbeddingModel(provider))
        }
        ComponentSpec::VectorStore(settings) => {
            let mut scoped = config.clone();
            scoped.vector_store = settings.clone();
            Ok(Component::VectorStore(open_index(&scoped, retry)?))
        }
    }
}
