//! Index command handler.
//!
//! Maintenance of the configured collection and its document registry.

use super::print_json;
use clap::{Args, Subcommand};
use luxas_core::AppConfig;
use luxas_knowledge::{vector_store, DocumentRegistry};

/// Collection maintenance
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Drop the collection and forget every indexed document
    Reset,
    /// Show collection and document statistics
    Stats(IndexStatsCommand),
}

#[derive(Args, Debug)]
pub struct IndexStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        match &self.action {
            IndexAction::Reset => reset(config).await,
            IndexAction::Stats(cmd) => cmd.execute(config).await,
        }
    }
}

async fn reset(config: &AppConfig) -> anyhow::Result<()> {
    let collection = &config.vector_store.collection;
    tracing::info!("Resetting collection '{}'", collection);

    let store = vector_store(config)?;
    store.reset(collection).await?;
    DocumentRegistry::new(config.registry_path()).clear()?;

    println!("Collection '{}' réinitialisée.", collection);
    Ok(())
}

impl IndexStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let collection = &config.vector_store.collection;
        tracing::info!("Reading statistics for collection '{}'", collection);

        let store = vector_store(config)?;
        let info = store.collection_info(collection).await?;
        let sources = DocumentRegistry::new(config.registry_path()).summary()?;

        if self.json {
            let output = serde_json::json!({
                "backend": store.backend_name(),
                "collection": collection,
                "info": info,
                "sources": sources,
            });
            return print_json(&output);
        }

        println!("Backend     : {}", store.backend_name());
        match &info {
            Some(info) => {
                println!("Collection  : {} ({} dims, {})", info.name, info.dimension, info.metric.as_str());
                println!("Passages    : {}", info.passages);
            }
            None => println!("Collection  : {} (absente)", collection),
        }

        if sources.is_empty() {
            println!("Aucun document enregistré.");
        } else {
            println!("Documents   : {}", sources.len());
            for source in &sources {
                println!(
                    "  - {} : {} passage(s), {} lot(s)",
                    source.source,
                    source.passages,
                    source.batches
                );
            }
        }

        Ok(())
    }
}
