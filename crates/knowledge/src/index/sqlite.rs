//! SQLite-backed vector index.
//!
//! One database file holds every collection. Embeddings are stored as
//! little-endian `f32` blobs and scored in process; the `AUTOINCREMENT`
//! key records insertion order for tie-breaking.

use super::{
    check_compatible, check_dimensions, cosine_similarity, rank_top_k, CollectionInfo,
    CollectionSpec, Metric, VectorIndex,
};
use crate::types::{IndexedPassage, Passage, ScoredPassage};
use luxas_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    dimension INTEGER NOT NULL,
    metric TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS passages (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    source TEXT NOT NULL,
    sequence_index INTEGER NOT NULL,
    page INTEGER,
    byte_start INTEGER NOT NULL,
    byte_end INTEGER NOT NULL,
    text TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    metadata TEXT NOT NULL,
    embedding BLOB NOT NULL,
    FOREIGN KEY (collection) REFERENCES collections(name)
);

CREATE INDEX IF NOT EXISTS idx_passages_collection ON passages(collection);
"#;

pub struct SqliteIndex {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteIndex").field("path", &self.path).finish()
    }
}

/// Row as stored, before blob and JSON decoding.
struct StoredRow {
    id: String,
    source: String,
    sequence_index: i64,
    page: Option<i64>,
    byte_start: i64,
    byte_end: i64,
    text: String,
    content_hash: String,
    metadata: String,
    embedding: Vec<u8>,
}

fn db_error(context: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::VectorStore(format!("{}: {}", context, e))
}

impl SqliteIndex {
    /// Open (or create) the index database at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::VectorStore(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(path).map_err(db_error("Failed to open SQLite index"))?;
        conn.execute_batch(SCHEMA)
            .map_err(db_error("Failed to create tables"))?;

        tracing::debug!("Opened SQLite index at {:?}", path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> AppResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&mut guard)
        })
        .await
        .map_err(|e| AppError::VectorStore(format!("SQLite task failed: {}", e)))?
    }
}

fn read_info(conn: &Connection, name: &str) -> AppResult<Option<CollectionInfo>> {
    let row = conn
        .query_row(
            "SELECT dimension, metric FROM collections WHERE name = ?1",
            params![name],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()
        .map_err(db_error("Failed to read collection"))?;

    let Some((dimension, metric)) = row else {
        return Ok(None);
    };

    let metric = Metric::parse(&metric).ok_or_else(|| {
        AppError::VectorStore(format!("Collection '{}' has unknown metric '{}'", name, metric))
    })?;
    let passages: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM passages WHERE collection = ?1",
            params![name],
            |row| row.get(0),
        )
        .map_err(db_error("Failed to count passages"))?;

    Ok(Some(CollectionInfo {
        name: name.to_string(),
        dimension: dimension as usize,
        metric,
        passages: passages as u64,
    }))
}

fn require_dimension(conn: &Connection, name: &str) -> AppResult<usize> {
    read_info(conn, name)?
        .map(|info| info.dimension)
        .ok_or_else(|| AppError::CollectionNotFound(name.to_string()))
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::VectorStore(
            "Invalid embedding bytes length".to_string(),
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

impl StoredRow {
    fn into_parts(self) -> AppResult<(Passage, Vec<f32>)> {
        let vector = bytes_to_embedding(&self.embedding)?;
        let metadata = serde_json::from_str(&self.metadata)?;
        let passage = Passage {
            id: self.id,
            source: self.source,
            sequence_index: self.sequence_index as u32,
            page: self.page.map(|p| p as u32),
            byte_range: (self.byte_start as usize, self.byte_end as usize),
            text: self.text,
            content_hash: self.content_hash,
            metadata,
        };
        Ok((passage, vector))
    }
}

#[async_trait::async_trait]
impl VectorIndex for SqliteIndex {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn collection_info(&self, name: &str) -> AppResult<Option<CollectionInfo>> {
        let name = name.to_string();
        self.with_conn(move |conn| read_info(conn, &name)).await
    }

    async fn ensure_collection(&self, spec: &CollectionSpec) -> AppResult<()> {
        let spec = spec.clone();
        self.with_conn(move |conn| {
            let tx = conn
                .transaction()
                .map_err(db_error("Failed to begin transaction"))?;
            if let Some(existing) = read_info(&tx, &spec.name)? {
                return check_compatible(&existing, &spec);
            }
            tx.execute(
                "INSERT INTO collections (name, dimension, metric, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    spec.name,
                    spec.dimension as i64,
                    spec.metric.as_str(),
                    chrono::Utc::now().to_rfc3339()
                ],
            )
            .map_err(db_error("Failed to create collection"))?;
            tx.commit().map_err(db_error("Failed to commit"))?;

            tracing::debug!(collection = %spec.name, dimension = spec.dimension, "Created collection");
            Ok(())
        })
        .await
    }

    async fn upsert(&self, collection: &str, passages: Vec<IndexedPassage>) -> AppResult<usize> {
        let collection = collection.to_string();
        self.with_conn(move |conn| {
            let tx = conn
                .transaction()
                .map_err(db_error("Failed to begin transaction"))?;
            let dimension = require_dimension(&tx, &collection)?;
            check_dimensions(dimension, &passages)?;

            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO passages (collection, id, source, sequence_index, page, \
                         byte_start, byte_end, text, content_hash, metadata, embedding) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    )
                    .map_err(db_error("Failed to prepare insert"))?;

                for entry in &passages {
                    let p = &entry.passage;
                    let metadata = serde_json::to_string(&p.metadata)?;
                    stmt.execute(params![
                        collection,
                        p.id,
                        p.source,
                        p.sequence_index as i64,
                        p.page.map(i64::from),
                        p.byte_range.0 as i64,
                        p.byte_range.1 as i64,
                        p.text,
                        p.content_hash,
                        metadata,
                        embedding_to_bytes(&entry.vector),
                    ])
                    .map_err(db_error("Failed to insert passage"))?;
                }
            }

            tx.commit().map_err(db_error("Failed to commit"))?;
            Ok(passages.len())
        })
        .await
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> AppResult<Vec<ScoredPassage>> {
        let collection = collection.to_string();
        let query = vector.to_vec();
        let results = self
            .with_conn(move |conn| {
                let dimension = require_dimension(conn, &collection)?;
                if query.len() != dimension {
                    return Err(AppError::DimensionMismatch {
                        expected: dimension,
                        actual: query.len(),
                    });
                }

                let mut stmt = conn
                    .prepare(
                        "SELECT id, source, sequence_index, page, byte_start, byte_end, text, \
                         content_hash, metadata, embedding FROM passages \
                         WHERE collection = ?1 ORDER BY seq",
                    )
                    .map_err(db_error("Failed to prepare query"))?;

                let rows = stmt
                    .query_map(params![collection], |row| {
                        Ok(StoredRow {
                            id: row.get(0)?,
                            source: row.get(1)?,
                            sequence_index: row.get(2)?,
                            page: row.get(3)?,
                            byte_start: row.get(4)?,
                            byte_end: row.get(5)?,
                            text: row.get(6)?,
                            content_hash: row.get(7)?,
                            metadata: row.get(8)?,
                            embedding: row.get(9)?,
                        })
                    })
                    .map_err(db_error("Failed to query passages"))?;

                let mut scored = Vec::new();
                for row in rows {
                    let (passage, stored) = row.map_err(db_error("Failed to read passage"))?.into_parts()?;
                    scored.push(ScoredPassage {
                        score: cosine_similarity(&query, &stored),
                        passage,
                    });
                }
                Ok(rank_top_k(scored, k))
            })
            .await?;

        tracing::debug!("Retrieved {} passages (requested top-{})", results.len(), k);
        Ok(results)
    }

    async fn reset(&self, name: &str) -> AppResult<()> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let tx = conn
                .transaction()
                .map_err(db_error("Failed to begin transaction"))?;
            let deleted = tx
                .execute("DELETE FROM passages WHERE collection = ?1", params![name])
                .map_err(db_error("Failed to delete passages"))?;
            tx.commit().map_err(db_error("Failed to commit"))?;

            tracing::info!(collection = %name, deleted, "Reset collection");
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(source: &str, seq: u32, vector: Vec<f32>) -> IndexedPassage {
        let mut passage = Passage::new(source, seq, Some(seq + 1), (0, 9), format!("passage {}", seq));
        passage.set_batch("batch-0001");
        IndexedPassage { passage, vector }
    }

    fn open_temp() -> (TempDir, SqliteIndex) {
        let dir = TempDir::new().unwrap();
        let index = SqliteIndex::open(&dir.path().join("index").join("index.sqlite")).unwrap();
        (dir, index)
    }

    #[tokio::test]
    async fn test_insert_and_query_round_trip() {
        let (_dir, index) = open_temp();
        index.ensure_collection(&CollectionSpec::new("rag", 3)).await.unwrap();
        let original = entry("loi_123.pdf", 0, vec![1.0, 0.0, 0.0]);
        index.upsert("rag", vec![original.clone()]).await.unwrap();

        let results = index.query("rag", &[1.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].passage, original.passage);
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_ensure_collection_twice_keeps_data() {
        let (_dir, index) = open_temp();
        let spec = CollectionSpec::new("rag", 2);
        index.ensure_collection(&spec).await.unwrap();
        index.upsert("rag", vec![entry("a.pdf", 0, vec![1.0, 0.0])]).await.unwrap();
        index.ensure_collection(&spec).await.unwrap();

        let info = index.collection_info("rag").await.unwrap().unwrap();
        assert_eq!(info.passages, 1);
        assert_eq!(info.metric, Metric::Cosine);
    }

    #[tokio::test]
    async fn test_ties_follow_insertion_order() {
        let (_dir, index) = open_temp();
        index.ensure_collection(&CollectionSpec::new("rag", 2)).await.unwrap();
        index
            .upsert(
                "rag",
                vec![
                    entry("a.pdf", 0, vec![0.0, 1.0]),
                    entry("b.pdf", 0, vec![1.0, 0.0]),
                    entry("c.pdf", 0, vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let results = index.query("rag", &[1.0, 0.0], 10).await.unwrap();
        let sources: Vec<_> = results.iter().map(|r| r.passage.source.as_str()).collect();
        assert_eq!(sources, vec!["b.pdf", "c.pdf", "a.pdf"]);
    }

    #[tokio::test]
    async fn test_upsert_is_atomic_on_dimension_error() {
        let (_dir, index) = open_temp();
        index.ensure_collection(&CollectionSpec::new("rag", 2)).await.unwrap();
        let result = index
            .upsert(
                "rag",
                vec![entry("a.pdf", 0, vec![1.0, 0.0]), entry("a.pdf", 1, vec![1.0])],
            )
            .await;
        assert!(matches!(result, Err(AppError::DimensionMismatch { .. })));
        assert_eq!(index.collection_info("rag").await.unwrap().unwrap().passages, 0);
    }

    #[tokio::test]
    async fn test_reset_and_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.sqlite");
        {
            let index = SqliteIndex::open(&path).unwrap();
            index.ensure_collection(&CollectionSpec::new("rag", 2)).await.unwrap();
            index.upsert("rag", vec![entry("a.pdf", 0, vec![1.0, 0.0])]).await.unwrap();
        }

        let reopened = SqliteIndex::open(&path).unwrap();
        assert_eq!(reopened.collection_info("rag").await.unwrap().unwrap().passages, 1);

        reopened.reset("rag").await.unwrap();
        let info = reopened.collection_info("rag").await.unwrap().unwrap();
        assert_eq!(info.passages, 0);
        assert_eq!(info.dimension, 2);
    }

    #[tokio::test]
    async fn test_query_unknown_collection() {
        let (_dir, index) = open_temp();
        assert!(matches!(
            index.query("missing", &[1.0], 3).await,
            Err(AppError::CollectionNotFound(_))
        ));
    }

    #[test]
    fn test_embedding_bytes() {
        let bytes = embedding_to_bytes(&[1.5, -2.0]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), vec![1.5, -2.0]);
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
    }
}
