//! Passage types shared by the chunker, the vector index and the pipeline.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A contiguous span of a document, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Unique passage identifier
    pub id: String,

    /// Name of the originating document; the citation grouping key
    pub source: String,

    /// Order within the document, running across pages
    pub sequence_index: u32,

    /// 1-based page number for paginated formats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Byte range within the page text
    pub byte_range: (usize, usize),

    pub text: String,

    /// SHA-256 of `text`
    pub content_hash: String,

    /// Free-form tags (`batch`, ...)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Passage {
    pub fn new(
        source: impl Into<String>,
        sequence_index: u32,
        page: Option<u32>,
        byte_range: (usize, usize),
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            sequence_index,
            page,
            byte_range,
            content_hash: sha256_hex(text.as_bytes()),
            text,
            metadata: serde_json::Map::new(),
        }
    }

    /// Tag the passage with the ingestion batch that wrote it.
    pub fn set_batch(&mut self, batch: &str) {
        self.metadata
            .insert("batch".to_string(), serde_json::Value::from(batch));
    }

    pub fn batch(&self) -> Option<&str> {
        self.metadata.get("batch").and_then(|v| v.as_str())
    }
}

/// A passage paired with its embedding, ready to be written.
#[derive(Debug, Clone)]
pub struct IndexedPassage {
    pub passage: Passage,
    pub vector: Vec<f32>,
}

/// A passage returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    /// Cosine similarity to the query vector
    pub score: f32,
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
