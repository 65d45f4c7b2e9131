//! Doctor command handler.
//!
//! Reports on configuration, credentials and the collection without
//! aborting on the first problem.

use super::print_json;
use clap::Args;
use luxas_core::{AppConfig, AppResult};
use luxas_knowledge::{vector_store, CollectionInfo, DocumentRegistry};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Warn,
    Fail,
}

impl Status {
    fn marker(&self) -> &'static str {
        match self {
            Status::Ok => "✓",
            Status::Warn => "!",
            Status::Fail => "✗",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub status: Status,
    pub detail: String,
}

impl Check {
    fn new(name: &'static str, status: Status, detail: impl Into<String>) -> Self {
        Self {
            name,
            status,
            detail: detail.into(),
        }
    }
}

/// Check credentials, collection and configuration
#[derive(Args, Debug)]
pub struct DoctorCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DoctorCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Running self-check");

        let mut checks = vec![
            configuration(config),
            credential(
                "llm",
                &format!("{} / {}", config.llm.provider, config.llm.model),
                config.llm_api_key(),
            ),
            credential(
                "embedding",
                &format!(
                    "{} / {} ({} dims)",
                    config.embedding.provider, config.embedding.model, config.embedding.dimensions
                ),
                config.embedding_api_key(),
            ),
            news_credential(config),
        ];
        checks.push(collection(config).await);
        checks.push(registry(config));

        if self.json {
            return print_json(&checks);
        }

        for check in &checks {
            println!("{} {:<12} {}", check.status.marker(), check.name, check.detail);
        }

        let failures = checks.iter().filter(|c| c.status == Status::Fail).count();
        if failures > 0 {
            println!("\n{} problème(s) détecté(s).", failures);
        }

        Ok(())
    }
}

fn configuration(config: &AppConfig) -> Check {
    let source = config
        .config_file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults + environment".to_string());

    match config.validate() {
        Ok(()) => Check::new("config", Status::Ok, source),
        Err(e) => Check::new("config", Status::Fail, e.to_string()),
    }
}

fn credential(name: &'static str, what: &str, key: AppResult<Option<String>>) -> Check {
    match key {
        Ok(Some(_)) => Check::new(name, Status::Ok, format!("{}, clé trouvée", what)),
        Ok(None) => Check::new(name, Status::Ok, format!("{}, aucune clé requise", what)),
        Err(e) => Check::new(name, Status::Fail, format!("{}: {}", what, e)),
    }
}

fn news_credential(config: &AppConfig) -> Check {
    // Only the tone tool needs it
    match config.news_api_key() {
        Ok(_) => Check::new("news", Status::Ok, "clé trouvée"),
        Err(_) => Check::new(
            "news",
            Status::Warn,
            format!("{} absente, `luxas tone` indisponible", config.news.api_key_env),
        ),
    }
}

/// Compare a stored collection with the configured embedding size.
fn describe_collection(info: Option<CollectionInfo>, name: &str, dimensions: usize) -> Check {
    match info {
        None => Check::new(
            "collection",
            Status::Warn,
            format!("'{}' absente, lancez `luxas ingest`", name),
        ),
        Some(info) if info.dimension != dimensions => Check::new(
            "collection",
            Status::Fail,
            format!(
                "'{}' stocke des vecteurs de {} dims, le modèle en produit {}",
                name, info.dimension, dimensions
            ),
        ),
        Some(info) => Check::new(
            "collection",
            Status::Ok,
            format!("'{}' : {} passage(s), {} dims", name, info.passages, info.dimension),
        ),
    }
}

async fn collection(config: &AppConfig) -> Check {
    let name = &config.vector_store.collection;
    let store = match vector_store(config) {
        Ok(store) => store,
        Err(e) => return Check::new("collection", Status::Fail, e.to_string()),
    };

    match store.collection_info(name).await {
        Ok(info) => describe_collection(info, name, config.embedding.dimensions),
        Err(e) => Check::new(
            "collection",
            Status::Fail,
            format!("{} injoignable: {}", store.backend_name(), e),
        ),
    }
}

fn registry(config: &AppConfig) -> Check {
    match DocumentRegistry::new(config.registry_path()).list() {
        Ok(records) if records.is_empty() => {
            Check::new("documents", Status::Warn, "aucun document enregistré")
        }
        Ok(records) => Check::new(
            "documents",
            Status::Ok,
            format!("{} document(s) enregistré(s)", records.len()),
        ),
        Err(e) => Check::new("documents", Status::Fail, e.to_string()),
    }
}
