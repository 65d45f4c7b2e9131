//! Document intake, vector indexing and retrieval-augmented answering.
//!
//! Leaf to root: [`loader`] → [`chunk`] → [`embeddings`] → [`index`] →
//! [`rag`]. [`ingest`] drives the first four in bounded batches;
//! [`rag::RagContext`] answers questions over what was indexed.

pub mod chunk;
pub mod components;
pub mod conversation;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod progress;
pub mod rag;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use chunk::Chunker;
pub use components::{
    embedding_model, initialize_component, language_model, vector_store, Component, ComponentSpec,
};
pub use conversation::{ConversationHistory, ConversationTurn, Role};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::{open_index, CollectionInfo, CollectionSpec, Metric, VectorIndex};
pub use ingest::{IngestOptions, IngestReport, Ingestor};
pub use loader::{load_document, load_document_blocking, DocumentFormat, LoadedDocument};
pub use progress::{ProgressEvent, ProgressReporter};
pub use rag::{AnswerWithCitations, RagAnswer, RagContext, RagSettings};
pub use registry::{DocumentRecord, DocumentRegistry};
pub use types::{IndexedPassage, Passage, ScoredPassage};
