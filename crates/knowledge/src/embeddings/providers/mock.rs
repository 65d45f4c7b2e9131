//! Deterministic offline embedder.

use crate::embeddings::EmbeddingProvider;
use luxas_core::AppResult;
use std::collections::BTreeMap;

/// Words ignored when hashing; French and English function words.
const STOP_WORDS: &[&str] = &[
    "le", "la", "les", "un", "une", "des", "du", "de", "et", "ou", "en", "au", "aux", "est",
    "que", "qui", "pour", "par", "sur", "dans", "ce", "cette", "ces", "il", "elle", "the", "is",
    "a", "an", "of", "to", "in", "and", "or", "for", "with", "what", "does", "this", "that",
];

/// Hashes word trigrams and whole words into a fixed number of buckets,
/// then normalizes to a unit vector.
///
/// Texts sharing vocabulary land close together, which is enough for
/// tests and offline runs. Blank text embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        // Ordered so float accumulation is bitwise reproducible
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w))
        {
            *counts.entry(word).or_insert(0) += 1;
        }

        for (word, count) in counts {
            let weight = count as f32;
            vector[self.bucket(word.as_bytes())] += weight;

            let padded: Vec<char> = format!("^{}$", word).chars().collect();
            for trigram in padded.windows(3) {
                let key: String = trigram.iter().collect();
                vector[self.bucket(key.as_bytes())] += weight.sqrt();
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }

    /// FNV-1a bucket index.
    fn bucket(&self, bytes: &[u8]) -> usize {
        let hash = bytes.iter().fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
            (acc ^ *b as u64).wrapping_mul(0x0100_0000_01b3)
        });
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-fnv"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::cosine_similarity;

    #[tokio::test]
    async fn test_mock_provider_unit_vectors() {
        let provider = MockProvider::new(256);
        let texts = vec![
            "Proposition de loi relative aux personnes âgées".to_string(),
            "Exposé des motifs".to_string(),
        ];

        let embeddings = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 256);
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 0.001);
        }
    }

    #[tokio::test]
    async fn test_mock_provider_deterministic() {
        let provider = MockProvider::new(128);
        let a = provider.embed("article premier").await.unwrap();
        let b = provider.embed("article premier").await.unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_colliding_buckets_are_bitwise_stable() {
        // Few buckets force many words into the same slot
        let provider = MockProvider::new(3);
        let text = "allocation enfant allocation famille foyer enfant revenu aide \
                    logement allocation commune département région état";
        let first = provider.vectorize(text);
        for _ in 0..200 {
            let again = provider.vectorize(text);
            assert!(first
                .iter()
                .zip(&again)
                .all(|(a, b)| a.to_bits() == b.to_bits()));
        }
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let provider = MockProvider::new(512);
        let query = provider.embed("allocation pour les enfants").await.unwrap();
        let close = provider
            .embed("Le montant de l'allocation versée pour chaque enfant")
            .await
            .unwrap();
        let far = provider
            .embed("Dispositions relatives au stationnement urbain")
            .await
            .unwrap();

        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn test_blank_text_is_zero_vector() {
        let provider = MockProvider::new(64);
        let embedding = provider.embed("   ").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }
}
