//! Batch ingestion.
//!
//! Files are discovered, loaded and chunked concurrently, then written in
//! batches bounded by passage count. A batch is either fully embedded and
//! written or recorded as failed; failures never stop the run.

use crate::chunk::Chunker;
use crate::embeddings::EmbeddingProvider;
use crate::index::{CollectionSpec, VectorIndex};
use crate::loader::{load_document, source_name, DocumentFormat, LoadedDocument};
use crate::progress::ProgressReporter;
use crate::registry::{DocumentRecord, DocumentRegistry};
use crate::types::{IndexedPassage, Passage};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use luxas_core::config::IngestionSettings;
use luxas_core::{AppConfig, AppError, AppResult};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Files and directories to ingest
    pub paths: Vec<PathBuf>,
    /// Empty the collection and the registry first
    pub reset: bool,
    pub max_chunks_per_batch: usize,
    /// Documents loaded in parallel
    pub concurrency: usize,
}

impl IngestOptions {
    pub fn new(paths: Vec<PathBuf>, settings: &IngestionSettings) -> Self {
        Self {
            paths,
            reset: false,
            max_chunks_per_batch: settings.max_chunks_per_batch,
            concurrency: settings.concurrency,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub batch: String,
    pub passages: usize,
    pub sources: Vec<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub files_discovered: usize,
    pub documents_indexed: usize,
    pub passages_indexed: usize,
    pub batches_committed: usize,
    pub batches_failed: Vec<BatchFailure>,
    pub failed_files: Vec<FailedFile>,
    /// Sources whose exact bytes were already registered
    pub duplicates: Vec<String>,
    pub duration_secs: f64,
}

impl IngestReport {
    pub fn has_failures(&self) -> bool {
        !self.failed_files.is_empty() || !self.batches_failed.is_empty()
    }
}

/// Document identity kept while its passages wait for a batch.
struct DocumentMeta {
    source: String,
    path: PathBuf,
    content_hash: String,
}

/// Run-wide state threaded through batch commits.
struct RunState {
    documents: Vec<DocumentMeta>,
    pending: Vec<(usize, Passage)>,
    indexed_documents: HashSet<usize>,
    next_batch: usize,
    report: IngestReport,
}

pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    collection: CollectionSpec,
    chunker: Arc<Chunker>,
    registry: DocumentRegistry,
    embed_batch_size: usize,
    extensions: Vec<String>,
    progress: ProgressReporter,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        collection: CollectionSpec,
        chunker: Chunker,
        registry: DocumentRegistry,
    ) -> Self {
        let defaults = IngestionSettings::default();
        Self {
            embedder,
            index,
            collection,
            chunker: Arc::new(chunker),
            registry,
            embed_batch_size: 100,
            extensions: defaults.extensions,
            progress: ProgressReporter::noop(),
        }
    }

    /// Ingestor writing to the configured collection and registry.
    pub fn from_config(
        config: &AppConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> AppResult<Self> {
        let collection = CollectionSpec::new(&config.vector_store.collection, embedder.dimensions());
        let chunker = Chunker::new(&config.chunking)?;
        let registry = DocumentRegistry::new(config.registry_path());

        Ok(Self::new(embedder, index, collection, chunker, registry)
            .with_embed_batch_size(config.embedding.batch_size)
            .with_extensions(config.ingestion.extensions.clone()))
    }

    pub fn with_embed_batch_size(mut self, size: usize) -> Self {
        self.embed_batch_size = size.max(1);
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    /// Ingest every supported file under `options.paths`.
    ///
    /// Only collection setup errors abort the run; per-file and per-batch
    /// failures are collected in the report.
    #[instrument(skip(self, options), fields(collection = %self.collection.name, paths = options.paths.len()))]
    pub async fn ingest(&self, options: &IngestOptions) -> AppResult<IngestReport> {
        let started = Instant::now();
        let max_chunks = options.max_chunks_per_batch.max(1);

        let (files, mut failed_files) = self.discover(&options.paths);
        info!(files = files.len(), "Discovered documents");

        if options.reset {
            self.index.reset(&self.collection.name).await?;
            self.registry.clear()?;
            info!("Collection reset before ingestion");
        }
        self.index.ensure_collection(&self.collection).await?;

        let known_hashes: HashSet<String> = self
            .registry
            .list()?
            .into_iter()
            .map(|r| r.content_hash)
            .collect();

        let mut state = RunState {
            documents: Vec::new(),
            pending: Vec::new(),
            indexed_documents: HashSet::new(),
            next_batch: 1,
            report: IngestReport {
                files_discovered: files.len(),
                ..IngestReport::default()
            },
        };
        state.report.failed_files.append(&mut failed_files);

        let total = files.len() as u64;
        let mut loaded = stream::iter(files.into_iter().map(|path| {
            let chunker = Arc::clone(&self.chunker);
            async move {
                let file_name = path.display().to_string();
                let result = tokio::task::spawn_blocking(move || {
                    let document = load_document(&path)?;
                    let passages = chunker.chunk_document(&document);
                    Ok::<_, AppError>((document, passages))
                })
                .await
                .map_err(|e| AppError::Document(format!("Loader crashed on {}: {}", file_name, e)))
                .and_then(|r| r);
                (file_name, result)
            }
        }))
        .buffered(options.concurrency.max(1));

        let mut done = 0u64;
        while let Some((file_name, result)) = loaded.next().await {
            done += 1;
            let (document, passages) = match result {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Skipping document");
                    state.report.failed_files.push(FailedFile {
                        path: PathBuf::from(file_name),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            self.progress.load(done, total, &document.source);

            if passages.is_empty() {
                warn!(source = %document.source, "No extractable text");
                state.report.failed_files.push(FailedFile {
                    path: document.path.clone(),
                    reason: "No extractable text".to_string(),
                });
                continue;
            }
            if known_hashes.contains(&document.content_hash) {
                warn!(source = %document.source, "Document already indexed; passages will be duplicated");
                state.report.duplicates.push(document.source.clone());
            }
            self.progress.chunk(done, total, &document.source, passages.len());

            self.queue(&mut state, &document, passages);
            while state.pending.len() >= max_chunks {
                let batch: Vec<_> = state.pending.drain(..max_chunks).collect();
                self.commit_batch(&mut state, batch).await;
            }
        }

        if !state.pending.is_empty() {
            let batch = std::mem::take(&mut state.pending);
            self.commit_batch(&mut state, batch).await;
        }

        let mut report = state.report;
        report.documents_indexed = state.indexed_documents.len();
        report.duration_secs = started.elapsed().as_secs_f64();

        info!(
            documents = report.documents_indexed,
            passages = report.passages_indexed,
            batches = report.batches_committed,
            failed_batches = report.batches_failed.len(),
            failed_files = report.failed_files.len(),
            "Ingestion finished"
        );
        Ok(report)
    }

    /// Files to ingest, plus explicit paths rejected up front.
    fn discover(&self, paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<FailedFile>) {
        let mut files = Vec::new();
        let mut failed = Vec::new();
        let mut seen = HashSet::new();
        let mut sources: HashMap<String, PathBuf> = HashMap::new();

        let mut accept = |path: PathBuf, files: &mut Vec<PathBuf>| {
            if !seen.insert(path.clone()) {
                return;
            }
            if let Ok(source) = source_name(&path) {
                if let Some(previous) = sources.get(&source) {
                    warn!(
                        source = %source,
                        first = %previous.display(),
                        second = %path.display(),
                        "Two files share a source name; their citations will be merged"
                    );
                } else {
                    sources.insert(source, path.clone());
                }
            }
            self.progress.discover(files.len() as u64 + 1, &path.display().to_string());
            files.push(path);
        };

        for root in paths {
            if root.is_file() {
                match DocumentFormat::from_path(root) {
                    Ok(_) => accept(root.clone(), &mut files),
                    Err(e) => {
                        warn!(file = %root.display(), error = %e, "Skipping file");
                        failed.push(FailedFile {
                            path: root.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            } else if root.is_dir() {
                for entry in WalkDir::new(root)
                    .follow_links(true)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                {
                    if self.has_wanted_extension(entry.path()) {
                        accept(entry.into_path(), &mut files);
                    }
                }
            } else {
                failed.push(FailedFile {
                    path: root.clone(),
                    reason: "Path does not exist".to_string(),
                });
            }
        }

        (files, failed)
    }

    fn has_wanted_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = ext.to_lowercase();
        self.extensions.contains(&ext) && DocumentFormat::from_path(path).is_ok()
    }

    fn queue(&self, state: &mut RunState, document: &LoadedDocument, passages: Vec<Passage>) {
        let owner = state.documents.len();
        state.documents.push(DocumentMeta {
            source: document.source.clone(),
            path: document.path.clone(),
            content_hash: document.content_hash.clone(),
        });
        state
            .pending
            .extend(passages.into_iter().map(|passage| (owner, passage)));
    }

    /// Embed and write one batch, or record why it failed.
    async fn commit_batch(&self, state: &mut RunState, entries: Vec<(usize, Passage)>) {
        let tag = format!("batch-{:04}", state.next_batch);
        state.next_batch += 1;

        let (owners, mut passages): (Vec<usize>, Vec<Passage>) = entries.into_iter().unzip();
        for passage in &mut passages {
            passage.set_batch(&tag);
        }

        let written = match self.write_batch(&tag, &passages).await {
            Ok(written) => written,
            Err(e) => {
                let mut sources: Vec<String> = Vec::new();
                for owner in &owners {
                    let source = &state.documents[*owner].source;
                    if !sources.contains(source) {
                        sources.push(source.clone());
                    }
                }
                warn!(batch = %tag, passages = passages.len(), error = %e, "Batch failed; nothing written");
                state.report.batches_failed.push(BatchFailure {
                    batch: tag,
                    passages: passages.len(),
                    sources,
                    reason: e.to_string(),
                });
                return;
            }
        };

        // Contribution of each document to this batch, in first-seen order.
        let mut counts: Vec<(usize, u64)> = Vec::new();
        for owner in owners {
            match counts.iter_mut().find(|(o, _)| *o == owner) {
                Some((_, n)) => *n += 1,
                None => counts.push((owner, 1)),
            }
        }
        let now = Utc::now();
        let records: Vec<DocumentRecord> = counts
            .iter()
            .map(|(owner, n)| {
                let meta = &state.documents[*owner];
                DocumentRecord {
                    source: meta.source.clone(),
                    path: meta.path.clone(),
                    content_hash: meta.content_hash.clone(),
                    passages: *n,
                    batch: tag.clone(),
                    indexed_at: now,
                }
            })
            .collect();
        if let Err(e) = self.registry.record(&records) {
            warn!(batch = %tag, error = %e, "Batch written but not registered");
        }

        state.indexed_documents.extend(counts.iter().map(|(owner, _)| *owner));
        state.report.batches_committed += 1;
        state.report.passages_indexed += written;
        self.progress.index(&tag, written);
        info!(batch = %tag, passages = written, "Batch committed");
    }

    async fn write_batch(&self, tag: &str, passages: &[Passage]) -> AppResult<usize> {
        let total = passages.len() as u64;
        let mut vectors = Vec::with_capacity(passages.len());

        for group in passages.chunks(self.embed_batch_size) {
            let texts: Vec<String> = group.iter().map(|p| p.text.clone()).collect();
            let embedded = self.embedder.embed_batch(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(AppError::Embedding(format!(
                    "{}: expected {} embeddings, got {}",
                    tag,
                    texts.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
            self.progress
                .embed(vectors.len() as u64, total, self.embedder.model_name());
        }

        let entries = passages
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(passage, vector)| IndexedPassage { passage, vector })
            .collect();
        self.index.upsert(&self.collection.name, entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockProvider;
    use crate::index::MemoryIndex;
    use crate::types::ScoredPassage;
    use luxas_core::config::ChunkingSettings;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const DIM: usize = 64;

    /// Mock embedder failing on chosen calls.
    #[derive(Debug)]
    struct FlakyEmbedder {
        inner: MockProvider,
        calls: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        fn provider_name(&self) -> &str {
            "flaky"
        }
        fn model_name(&self) -> &str {
            "flaky"
        }
        fn dimensions(&self) -> usize {
            DIM
        }
        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on {
                return Err(AppError::Embedding("HTTP 400: bad input".to_string()));
            }
            self.inner.embed_batch(texts).await
        }
    }

    fn chunker(size: usize) -> Chunker {
        Chunker::new(&ChunkingSettings {
            chunk_size: size,
            chunk_overlap: 0,
            ..ChunkingSettings::default()
        })
        .unwrap()
    }

    fn ingestor(
        temp: &TempDir,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<MemoryIndex>,
        size: usize,
    ) -> Ingestor {
        Ingestor::new(
            embedder,
            index,
            CollectionSpec::new("rag_documents", DIM),
            chunker(size),
            DocumentRegistry::new(temp.path().join("index").join("documents.jsonl")),
        )
    }

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn options(paths: Vec<PathBuf>, max_chunks: usize) -> IngestOptions {
        IngestOptions {
            paths,
            reset: false,
            max_chunks_per_batch: max_chunks,
            concurrency: 2,
        }
    }

    async fn everything(index: &MemoryIndex) -> Vec<ScoredPassage> {
        index.query("rag_documents", &[1.0; DIM], 1000).await.unwrap()
    }

    fn paragraphs(n: usize) -> String {
        (0..n)
            .map(|i| format!("Article {} : disposition numero {} du texte.", i + 1, i + 1))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[tokio::test]
    async fn test_ingest_directory() {
        let temp = TempDir::new().unwrap();
        let corpus = temp.path().join("corpus");
        std::fs::create_dir(&corpus).unwrap();
        write(&corpus, "loi_1.txt", "Article unique : la loi est adoptée.");
        write(&corpus, "loi_2.md", "# Exposé des motifs\n\nLe texte vise à simplifier.");
        write(&corpus, "notes.docx", "ignored");

        let index = Arc::new(MemoryIndex::new());
        let ingestor = ingestor(&temp, Arc::new(MockProvider::new(DIM)), index.clone(), 1000);
        let report = ingestor.ingest(&options(vec![corpus], 5000)).await.unwrap();

        assert_eq!(report.files_discovered, 2);
        assert_eq!(report.documents_indexed, 2);
        assert_eq!(report.passages_indexed, 2);
        assert_eq!(report.batches_committed, 1);
        assert!(!report.has_failures());

        let stored = everything(&index).await;
        assert!(stored.iter().all(|s| s.passage.batch() == Some("batch-0001")));

        let summary = ingestor.registry().summary().unwrap();
        let sources: Vec<_> = summary.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(sources, vec!["loi_1.txt", "loi_2.md"]);
    }

    #[tokio::test]
    async fn test_batches_are_bounded_by_passage_count() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "loi_123.txt", &paragraphs(5));

        let index = Arc::new(MemoryIndex::new());
        let ingestor = ingestor(&temp, Arc::new(MockProvider::new(DIM)), index.clone(), 50);
        let report = ingestor.ingest(&options(vec![file], 2)).await.unwrap();

        assert_eq!(report.passages_indexed, 5);
        assert_eq!(report.batches_committed, 3);
        assert_eq!(report.documents_indexed, 1);

        let records = ingestor.registry().list().unwrap();
        let split: Vec<_> = records.iter().map(|r| (r.batch.as_str(), r.passages)).collect();
        assert_eq!(
            split,
            vec![("batch-0001", 2), ("batch-0002", 2), ("batch-0003", 1)]
        );
    }

    #[tokio::test]
    async fn test_failed_batch_is_skipped_and_run_continues() {
        let temp = TempDir::new().unwrap();
        let files = vec![
            write(temp.path(), "a.txt", "Premier texte."),
            write(temp.path(), "b.txt", "Deuxième texte."),
            write(temp.path(), "c.txt", "Troisième texte."),
        ];
        let embedder = Arc::new(FlakyEmbedder {
            inner: MockProvider::new(DIM),
            calls: AtomicUsize::new(0),
            fail_on: 1,
        });

        let index = Arc::new(MemoryIndex::new());
        let ingestor = ingestor(&temp, embedder, index.clone(), 1000);
        let report = ingestor.ingest(&options(files, 2)).await.unwrap();

        assert_eq!(report.batches_failed.len(), 1);
        assert_eq!(report.batches_failed[0].batch, "batch-0001");
        assert_eq!(report.batches_failed[0].sources, vec!["a.txt", "b.txt"]);
        assert_eq!(report.batches_committed, 1);
        assert_eq!(report.passages_indexed, 1);

        let stored = everything(&index).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].passage.source, "c.txt");
        assert_eq!(stored[0].passage.batch(), Some("batch-0002"));
        assert_eq!(ingestor.registry().list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_files_are_reported_not_fatal() {
        let temp = TempDir::new().unwrap();
        let good = write(temp.path(), "loi.txt", "Texte valide.");
        let unsupported = write(temp.path(), "loi.docx", "binary");
        let blank = write(temp.path(), "vide.txt", "   \n\n  ");
        let missing = temp.path().join("absent.pdf");

        let index = Arc::new(MemoryIndex::new());
        let ingestor = ingestor(&temp, Arc::new(MockProvider::new(DIM)), index, 1000);
        let report = ingestor
            .ingest(&options(vec![unsupported, good, blank, missing], 10))
            .await
            .unwrap();

        assert_eq!(report.documents_indexed, 1);
        assert_eq!(report.failed_files.len(), 3);
        assert!(report.failed_files[0].reason.contains("Unsupported format"));
        assert!(report
            .failed_files
            .iter()
            .any(|f| f.reason == "No extractable text"));
    }

    #[tokio::test]
    async fn test_reingest_warns_and_reset_rebuilds() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "loi.txt", "Texte de loi.");
        let index = Arc::new(MemoryIndex::new());
        let ingestor = ingestor(&temp, Arc::new(MockProvider::new(DIM)), index.clone(), 1000);

        ingestor.ingest(&options(vec![file.clone()], 10)).await.unwrap();
        let again = ingestor.ingest(&options(vec![file.clone()], 10)).await.unwrap();
        assert_eq!(again.duplicates, vec!["loi.txt"]);
        assert_eq!(everything(&index).await.len(), 2);

        let mut rebuild = options(vec![file], 10);
        rebuild.reset = true;
        let report = ingestor.ingest(&rebuild).await.unwrap();
        assert!(report.duplicates.is_empty());
        assert_eq!(everything(&index).await.len(), 1);
        assert_eq!(ingestor.registry().list().unwrap().len(), 1);
    }
}
