//! Registry of ingested documents.
//!
//! One JSON line per (document, batch) contribution, appended after the
//! batch is committed to the vector index. `index stats` and the duplicate
//! warning during ingestion read it back.

use chrono::{DateTime, Utc};
use luxas_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub source: String,
    pub path: PathBuf,
    /// SHA-256 of the file bytes
    pub content_hash: String,
    /// Passages written by this batch
    pub passages: u64,
    pub batch: String,
    pub indexed_at: DateTime<Utc>,
}

/// Per-source totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub passages: u64,
    pub batches: usize,
}

#[derive(Debug, Clone)]
pub struct DocumentRegistry {
    path: PathBuf,
}

impl DocumentRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append records.
    pub fn record(&self, records: &[DocumentRecord]) -> AppResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open document registry: {}", e)))?;

        for record in records {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{}", line).map_err(|e| {
                AppError::Knowledge(format!("Failed to write document registry: {}", e))
            })?;
        }

        file.sync_all()
            .map_err(|e| AppError::Knowledge(format!("Failed to sync document registry: {}", e)))?;

        tracing::debug!(records = records.len(), "Recorded documents");
        Ok(())
    }

    pub fn list(&self) -> AppResult<Vec<DocumentRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open document registry: {}", e)))?;

        let mut records = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                AppError::Knowledge(format!("Failed to read line {}: {}", line_num + 1, e))
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| {
                AppError::Knowledge(format!(
                    "Failed to parse line {} of {}: {}",
                    line_num + 1,
                    self.path.display(),
                    e
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Totals per source, sorted by source name.
    pub fn summary(&self) -> AppResult<Vec<SourceSummary>> {
        let mut totals: BTreeMap<String, SourceSummary> = BTreeMap::new();
        for record in self.list()? {
            let entry = totals
                .entry(record.source.clone())
                .or_insert_with(|| SourceSummary {
                    source: record.source.clone(),
                    passages: 0,
                    batches: 0,
                });
            entry.passages += record.passages;
            entry.batches += 1;
        }
        Ok(totals.into_values().collect())
    }

    /// Whether a document with these bytes was already indexed.
    pub fn contains_hash(&self, content_hash: &str) -> AppResult<bool> {
        Ok(self.list()?.iter().any(|r| r.content_hash == content_hash))
    }

    pub fn clear(&self) -> AppResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| {
                AppError::Knowledge(format!("Failed to delete document registry: {}", e))
            })?;
            tracing::debug!("Cleared document registry");
        }
        Ok(())
    }
}
