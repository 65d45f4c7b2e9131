//! Ingest command handler.

use super::print_json;
use clap::Args;
use luxas_core::AppConfig;
use luxas_knowledge::progress::Phase;
use luxas_knowledge::{
    embedding_model, vector_store, IngestOptions, IngestReport, Ingestor, ProgressEvent,
    ProgressReporter,
};
use std::path::PathBuf;
use std::sync::Arc;

const MAX_LISTED_FAILURES: usize = 10;

/// Index documents into the collection
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files or directories to index
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Drop and recreate the collection first
    #[arg(long)]
    pub reset: bool,

    /// Maximum passages per committed batch
    #[arg(long)]
    pub batch_chunks: Option<usize>,

    /// Files loaded and chunked in parallel
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing ingest command for {} path(s)", self.paths.len());

        let mut options = IngestOptions::new(self.paths.clone(), &config.ingestion);
        options.reset = self.reset;
        if let Some(n) = self.batch_chunks {
            options.max_chunks_per_batch = n.max(1);
        }
        if let Some(n) = self.concurrency {
            options.concurrency = n.max(1);
        }

        let mut ingestor =
            Ingestor::from_config(config, embedding_model(config)?, vector_store(config)?)?;
        if !self.json {
            ingestor = ingestor.with_progress(ProgressReporter::new(Arc::new(print_progress)));
        }

        let report = ingestor.ingest(&options).await?;

        if self.json {
            print_json(&report)?;
        } else {
            print_report(&report);
        }

        Ok(())
    }
}

fn print_progress(event: ProgressEvent) {
    // Per-chunk and per-embedding events are too chatty for a terminal
    if matches!(event.phase, Phase::Discover | Phase::Load | Phase::Index) {
        eprintln!("{}", event.format_simple());
    }
}

fn print_report(report: &IngestReport) {
    println!(
        "{} document(s) indexé(s), {} passage(s) en {} lot(s) ({:.2}s)",
        report.documents_indexed,
        report.passages_indexed,
        report.batches_committed,
        report.duration_secs
    );

    if report.files_discovered == 0 {
        println!("Aucun fichier pris en charge trouvé.");
    }

    for duplicate in &report.duplicates {
        println!("⚠️ Déjà indexé (même contenu) : {}", duplicate);
    }

    for failure in &report.batches_failed {
        println!(
            "❌ Lot {} ({} passages, {}) : {}",
            failure.batch,
            failure.passages,
            failure.sources.join(", "),
            failure.reason
        );
    }

    if !report.failed_files.is_empty() {
        println!("Fichiers en échec :");
        for failed in report.failed_files.iter().take(MAX_LISTED_FAILURES) {
            println!("  - {} : {}", failed.path.display(), failed.reason);
        }
        if report.failed_files.len() > MAX_LISTED_FAILURES {
            println!(
                "... et {} autres",
                report.failed_files.len() - MAX_LISTED_FAILURES
            );
        }
    }
}
