//! Similarity retrieval.

use crate::embeddings::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::types::ScoredPassage;
use luxas_core::AppResult;
use std::sync::Arc;

/// Passages returned for one query, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    pub query: String,
    pub passages: Vec<ScoredPassage>,
}

/// Passages of one source, in retrieval rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGroup<'a> {
    pub source: &'a str,
    pub passages: Vec<&'a ScoredPassage>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Group by source, sources in first-seen order.
    pub fn groups(&self) -> Vec<SourceGroup<'_>> {
        let mut groups: Vec<SourceGroup<'_>> = Vec::new();
        for scored in &self.passages {
            let source = scored.passage.source.as_str();
            match groups.iter_mut().find(|g| g.source == source) {
                Some(group) => group.passages.push(scored),
                None => groups.push(SourceGroup {
                    source,
                    passages: vec![scored],
                }),
            }
        }
        groups
    }
}

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    collection: String,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, query: &str) -> AppResult<RetrievalResult> {
        self.retrieve_k(query, self.top_k).await
    }

    pub async fn retrieve_k(&self, query: &str, k: usize) -> AppResult<RetrievalResult> {
        let vector = self.embedder.embed(query).await?;
        let passages = self.index.query(&self.collection, &vector, k).await?;

        tracing::debug!(
            collection = %self.collection,
            k,
            returned = passages.len(),
            top_score = passages.first().map(|p| p.score),
            "Retrieved passages"
        );

        Ok(RetrievalResult {
            query: query.to_string(),
            passages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockProvider;
    use crate::index::{CollectionSpec, MemoryIndex};
    use crate::types::{IndexedPassage, Passage};

    fn scored(source: &str, seq: u32) -> ScoredPassage {
        ScoredPassage {
            passage: Passage::new(source, seq, None, (0, 1), "x"),
            score: 0.5,
        }
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let result = RetrievalResult {
            query: "q".to_string(),
            passages: vec![
                scored("zeta.pdf", 2),
                scored("alpha.pdf", 0),
                scored("zeta.pdf", 0),
            ],
        };

        let groups = result.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].source, "zeta.pdf");
        assert_eq!(groups[0].passages.len(), 2);
        assert_eq!(groups[0].passages[0].passage.sequence_index, 2);
        assert_eq!(groups[1].source, "alpha.pdf");
    }

    #[tokio::test]
    async fn test_retrieve_ranks_relevant_passage_first() {
        let embedder = Arc::new(MockProvider::new(64));
        let index = Arc::new(MemoryIndex::new());
        index.ensure_collection(&CollectionSpec::new("rag", 64)).await.unwrap();

        let texts = [
            "Le stationnement urbain est réglementé par arrêté municipal.",
            "L'allocation logement est versée aux étudiants boursiers.",
        ];
        let mut entries = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            entries.push(IndexedPassage {
                passage: Passage::new("loi.pdf", i as u32, None, (0, text.len()), *text),
                vector: embedder.embed(text).await.unwrap(),
            });
        }
        index.upsert("rag", entries).await.unwrap();

        let retriever = Retriever::new(embedder, index, "rag", 10);
        let result = retriever.retrieve("allocation logement étudiants").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.passages[0].passage.sequence_index, 1);
        assert_eq!(result.query, "allocation logement étudiants");
    }
}
