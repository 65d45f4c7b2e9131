//! Vector index abstraction.
//!
//! A collection holds (vector, passage) pairs whose dimension and metric are
//! fixed when the collection is created. Backends are interchangeable behind
//! [`VectorIndex`]; the pipeline never knows which one it talks to.

pub mod memory;
pub mod qdrant;
pub mod sqlite;

pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;
pub use sqlite::SqliteIndex;

use crate::types::{IndexedPassage, ScoredPassage};
use luxas_core::config::VectorBackend;
use luxas_core::{AppConfig, AppError, AppResult, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Similarity metric of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(Metric::Cosine),
            _ => None,
        }
    }
}

/// Parameters a collection is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: Metric::Cosine,
        }
    }
}

/// Description of an existing collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub passages: u64,
}

/// Trait for vector index backends.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Describe the collection, or `None` when it does not exist.
    async fn collection_info(&self, name: &str) -> AppResult<Option<CollectionInfo>>;

    /// Create the collection if absent.
    ///
    /// Calling it again with the same parameters is a no-op. Conflicting
    /// parameters are an error and leave the existing data untouched.
    async fn ensure_collection(&self, spec: &CollectionSpec) -> AppResult<()>;

    /// Append passages; returns how many were written.
    ///
    /// Every vector is checked against the collection dimension before
    /// anything is written.
    async fn upsert(&self, collection: &str, passages: Vec<IndexedPassage>) -> AppResult<usize>;

    /// Up to `k` passages by descending cosine similarity.
    async fn query(&self, collection: &str, vector: &[f32], k: usize)
        -> AppResult<Vec<ScoredPassage>>;

    /// Empty the collection, keeping its parameters.
    ///
    /// Resetting an absent collection is a no-op.
    async fn reset(&self, name: &str) -> AppResult<()>;
}

/// Check an existing collection against the requested parameters.
pub(crate) fn check_compatible(existing: &CollectionInfo, spec: &CollectionSpec) -> AppResult<()> {
    if existing.dimension != spec.dimension {
        return Err(AppError::DimensionMismatch {
            expected: existing.dimension,
            actual: spec.dimension,
        });
    }
    if existing.metric != spec.metric {
        return Err(AppError::Config(format!(
            "Collection '{}' uses metric '{}', requested '{}'",
            existing.name,
            existing.metric.as_str(),
            spec.metric.as_str()
        )));
    }
    Ok(())
}

pub(crate) fn check_dimensions(expected: usize, passages: &[IndexedPassage]) -> AppResult<()> {
    match passages.iter().find(|p| p.vector.len() != expected) {
        Some(bad) => Err(AppError::DimensionMismatch {
            expected,
            actual: bad.vector.len(),
        }),
        None => Ok(()),
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Keep the `k` best scores. Input must be in insertion order; the stable
/// sort keeps that order among equal scores.
pub(crate) fn rank_top_k(mut scored: Vec<ScoredPassage>, k: usize) -> Vec<ScoredPassage> {
    // NaN scores rank last
    let key = |score: f32| if score.is_nan() { f32::NEG_INFINITY } else { score };
    scored.sort_by(|a, b| key(b.score).total_cmp(&key(a.score)));
    scored.truncate(k);
    scored
}

/// Open the backend configured under `vectorStore`.
pub fn open_index(config: &AppConfig, retry: RetryPolicy) -> AppResult<Arc<dyn VectorIndex>> {
    tracing::debug!(
        backend = config.vector_store.backend.kind(),
        collection = %config.vector_store.collection,
        "Opening vector index"
    );
    match &config.vector_store.backend {
        VectorBackend::Memory => Ok(Arc::new(MemoryIndex::new())),
        VectorBackend::Sqlite { .. } => Ok(Arc::new(SqliteIndex::open(&config.sqlite_path())?)),
        VectorBackend::Qdrant { url, .. } => {
            let api_key = config.vector_store_api_key()?;
            Ok(Arc::new(QdrantIndex::new(url, api_key, retry)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Passage;

    fn scored(source: &str, score: f32) -> ScoredPassage {
        ScoredPassage {
            passage: Passage::new(source, 0, None, (0, 1), "x"),
            score,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_top_k_keeps_insertion_order_on_ties() {
        let ranked = rank_top_k(
            vec![scored("a", 0.5), scored("b", 0.9), scored("c", 0.5), scored("d", 0.5)],
            3,
        );
        let sources: Vec<_> = ranked.iter().map(|s| s.passage.source.as_str()).collect();
        assert_eq!(sources, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_rank_top_k_puts_nan_last() {
        let ranked = rank_top_k(
            vec![
                scored("nan", f32::NAN),
                scored("low", -0.2),
                scored("high", 0.8),
                scored("nan2", f32::NAN),
                scored("mid", 0.1),
            ],
            4,
        );
        let sources: Vec<_> = ranked.iter().map(|s| s.passage.source.as_str()).collect();
        assert_eq!(sources, vec!["high", "mid", "low", "nan"]);
    }

    #[test]
    fn test_check_compatible() {
        let info = CollectionInfo {
            name: "rag_documents".to_string(),
            dimension: 1536,
            metric: Metric::Cosine,
            passages: 3,
        };
        assert!(check_compatible(&info, &CollectionSpec::new("rag_documents", 1536)).is_ok());
        assert!(matches!(
            check_compatible(&info, &CollectionSpec::new("rag_documents", 384)),
            Err(AppError::DimensionMismatch { expected: 1536, actual: 384 })
        ));
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!(Metric::parse("COSINE"), Some(Metric::Cosine));
        assert_eq!(Metric::parse("dot"), None);
    }
}
