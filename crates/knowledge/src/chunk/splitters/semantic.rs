//! Splitter backed by the text-splitter crate.

use std::ops::Range;

use luxas_core::{AppError, AppResult};
use text_splitter::{ChunkConfig, TextSplitter};

use super::ChunkSplitter;

/// Splits along Unicode semantic levels (sentences, words, graphemes),
/// measured in characters.
pub struct SemanticSplitter {
    inner: TextSplitter<text_splitter::Characters>,
}

impl SemanticSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> AppResult<Self> {
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| AppError::Config(format!("Invalid chunking settings: {}", e)))?;

        Ok(Self {
            inner: TextSplitter::new(config),
        })
    }
}

impl ChunkSplitter for SemanticSplitter {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn split(&self, text: &str) -> Vec<Range<usize>> {
        self.inner
            .chunk_indices(text)
            .map(|(offset, chunk)| offset..offset + chunk.len())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_splitter_basic() {
        let splitter = SemanticSplitter::new(100, 20).unwrap();
        let text = "Ceci est une phrase de test. ".repeat(20);

        let spans = splitter.split(&text);
        assert!(spans.len() > 1);
        for span in spans {
            assert!(text[span].chars().count() <= 100);
        }
    }

    #[test]
    fn test_semantic_splitter_rejects_overlap_larger_than_size() {
        assert!(SemanticSplitter::new(100, 150).is_err());
    }
}
