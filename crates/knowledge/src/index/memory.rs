//! In-process vector index.
//!
//! Used in tests and for throwaway sessions; nothing survives the process.

use super::{
    check_compatible, check_dimensions, cosine_similarity, rank_top_k, CollectionInfo,
    CollectionSpec, Metric, VectorIndex,
};
use crate::types::{IndexedPassage, ScoredPassage};
use luxas_core::{AppError, AppResult};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug)]
struct Collection {
    dimension: usize,
    metric: Metric,
    entries: Vec<IndexedPassage>,
}

impl Collection {
    fn empty(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            entries: Vec::new(),
        }
    }

    fn info(&self, name: &str) -> CollectionInfo {
        CollectionInfo {
            name: name.to_string(),
            dimension: self.dimension,
            metric: self.metric,
            passages: self.entries.len() as u64,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VectorIndex for MemoryIndex {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn collection_info(&self, name: &str) -> AppResult<Option<CollectionInfo>> {
        let collections = self.collections.read().await;
        Ok(collections.get(name).map(|c| c.info(name)))
    }

    async fn ensure_collection(&self, spec: &CollectionSpec) -> AppResult<()> {
        let mut collections = self.collections.write().await;
        if let Some(existing) = collections.get(&spec.name) {
            return check_compatible(&existing.info(&spec.name), spec);
        }
        collections.insert(spec.name.clone(), Collection::empty(spec.dimension, spec.metric));
        tracing::debug!(collection = %spec.name, dimension = spec.dimension, "Created collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, passages: Vec<IndexedPassage>) -> AppResult<usize> {
        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| AppError::CollectionNotFound(collection.to_string()))?;
        check_dimensions(target.dimension, &passages)?;

        let count = passages.len();
        target.entries.extend(passages);
        Ok(count)
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> AppResult<Vec<ScoredPassage>> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| AppError::CollectionNotFound(collection.to_string()))?;
        if vector.len() != target.dimension {
            return Err(AppError::DimensionMismatch {
                expected: target.dimension,
                actual: vector.len(),
            });
        }

        let scored = target
            .entries
            .iter()
            .map(|entry| ScoredPassage {
                passage: entry.passage.clone(),
                score: cosine_similarity(vector, &entry.vector),
            })
            .collect();
        Ok(rank_top_k(scored, k))
    }

    async fn reset(&self, name: &str) -> AppResult<()> {
        let mut collections = self.collections.write().await;
        if let Some(existing) = collections.get_mut(name) {
            *existing = Collection::empty(existing.dimension, existing.metric);
            tracing::info!(collection = %name, "Reset collection");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Passage;

    fn entry(source: &str, seq: u32, vector: Vec<f32>) -> IndexedPassage {
        IndexedPassage {
            passage: Passage::new(source, seq, None, (0, 4), format!("{} #{}", source, seq)),
            vector,
        }
    }

    #[tokio::test]
    async fn test_ensure_collection_is_idempotent() {
        let index = MemoryIndex::new();
        let spec = CollectionSpec::new("rag_documents", 3);
        index.ensure_collection(&spec).await.unwrap();
        index
            .upsert("rag_documents", vec![entry("loi_123.pdf", 0, vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        index.ensure_collection(&spec).await.unwrap();

        let info = index.collection_info("rag_documents").await.unwrap().unwrap();
        assert_eq!(info.passages, 1);
    }

    #[tokio::test]
    async fn test_conflicting_dimension_keeps_data() {
        let index = MemoryIndex::new();
        index.ensure_collection(&CollectionSpec::new("c", 3)).await.unwrap();
        index.upsert("c", vec![entry("a", 0, vec![1.0, 0.0, 0.0])]).await.unwrap();

        let err = index.ensure_collection(&CollectionSpec::new("c", 4)).await.unwrap_err();
        assert!(matches!(err, AppError::DimensionMismatch { .. }));
        assert_eq!(index.collection_info("c").await.unwrap().unwrap().passages, 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dimension_without_writing() {
        let index = MemoryIndex::new();
        index.ensure_collection(&CollectionSpec::new("c", 3)).await.unwrap();
        let err = index
            .upsert(
                "c",
                vec![entry("a", 0, vec![1.0, 0.0, 0.0]), entry("a", 1, vec![1.0, 0.0])],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DimensionMismatch { expected: 3, actual: 2 }));
        assert_eq!(index.collection_info("c").await.unwrap().unwrap().passages, 0);
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity_then_insertion() {
        let index = MemoryIndex::new();
        index.ensure_collection(&CollectionSpec::new("c", 2)).await.unwrap();
        index
            .upsert(
                "c",
                vec![
                    entry("first", 0, vec![1.0, 1.0]),
                    entry("best", 0, vec![1.0, 0.0]),
                    entry("second", 0, vec![1.0, 1.0]),
                    entry("worst", 0, vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let results = index.query("c", &[1.0, 0.0], 3).await.unwrap();
        let sources: Vec<_> = results.iter().map(|r| r.passage.source.as_str()).collect();
        assert_eq!(sources, vec!["best", "first", "second"]);
    }

    #[tokio::test]
    async fn test_missing_collection() {
        let index = MemoryIndex::new();
        assert!(index.collection_info("nope").await.unwrap().is_none());
        assert!(matches!(
            index.query("nope", &[1.0], 5).await,
            Err(AppError::CollectionNotFound(_))
        ));
        index.reset("nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_keeps_parameters() {
        let index = MemoryIndex::new();
        index.ensure_collection(&CollectionSpec::new("c", 2)).await.unwrap();
        index.upsert("c", vec![entry("a", 0, vec![1.0, 0.0])]).await.unwrap();

        index.reset("c").await.unwrap();

        let info = index.collection_info("c").await.unwrap().unwrap();
        assert_eq!(info.passages, 0);
        assert_eq!(info.dimension, 2);
        assert!(index.query("c", &[1.0, 0.0], 5).await.unwrap().is_empty());
    }
}
