//! Configuration management for LuXas.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults (the reference deployment: OpenAI + `rag_documents`)
//! - Config file (`.luxas/config.yaml` or `--config`)
//! - Environment variables
//! - Command-line flags
//!
//! Secrets are never stored in the file: sections name the environment
//! variable that holds them (`apiKeyEnv`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// LLM providers understood by the factory.
pub const KNOWN_LLM_PROVIDERS: [&str; 3] = ["openai", "ollama", "mock"];

/// Embedding providers understood by the factory.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["openai", "ollama", "mock"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .luxas/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub ingestion: IngestionSettings,
    pub network: NetworkSettings,
    pub news: NewsSettings,
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider name ("openai", "ollama", "mock")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint (base URL)
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Sampling temperature for reformulation and synthesis
    pub temperature: f32,

    /// Optional completion length cap
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            endpoint: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            temperature: 0.1,
            max_tokens: None,
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,

    /// Vector length produced by the model; fixed per collection
    pub dimensions: usize,

    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,

    /// Texts per embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            endpoint: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            batch_size: 100,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VectorStoreSettings {
    /// Collection holding every passage of the deployment
    pub collection: String,

    pub backend: VectorBackend,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            collection: "rag_documents".to_string(),
            backend: VectorBackend::default(),
        }
    }
}

/// Where vectors live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VectorBackend {
    /// Embedded SQLite file (defaults to `.luxas/index/index.sqlite`)
    Sqlite {
        #[serde(default)]
        path: Option<PathBuf>,
    },

    /// Remote Qdrant instance over REST
    Qdrant {
        url: String,
        #[serde(default, rename = "apiKeyEnv")]
        api_key_env: Option<String>,
    },

    /// Process-local, lost on exit
    Memory,
}

impl Default for VectorBackend {
    fn default() -> Self {
        VectorBackend::Sqlite { path: None }
    }
}

impl VectorBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            VectorBackend::Sqlite { .. } => "sqlite",
            VectorBackend::Qdrant { .. } => "qdrant",
            VectorBackend::Memory => "memory",
        }
    }
}

/// Passage splitting strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitterKind {
    /// Priority-ordered separators with overlap
    #[default]
    Recursive,
    /// Unicode semantic levels via the text-splitter crate
    Semantic,
}

/// Chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChunkingSettings {
    /// Target passage length in characters
    pub chunk_size: usize,

    /// Characters shared between consecutive passages
    pub chunk_overlap: usize,

    /// Split separators, highest priority first; "" means per character
    pub separators: Vec<String>,

    pub splitter: SplitterKind,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: ["\n\n", "\n", ". ", " ", ""]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            splitter: SplitterKind::Recursive,
        }
    }
}

/// Retrieval, context window and citation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub reformulation_turns: usize,
    pub synthesis_turns: usize,
    pub turn_preview_chars: usize,
    pub passage_context_chars: usize,
    pub citation_previews: usize,
    pub citation_preview_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            reformulation_turns: 6,
            synthesis_turns: 4,
            turn_preview_chars: 200,
            passage_context_chars: 500,
            citation_previews: 2,
            citation_preview_chars: 120,
        }
    }
}

/// Batch ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IngestionSettings {
    /// Upper bound of passages embedded and written together
    pub max_chunks_per_batch: usize,

    /// Documents loaded and chunked in parallel
    pub concurrency: usize,

    /// File extensions picked up when walking directories
    pub extensions: Vec<String>,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            max_chunks_per_batch: 5000,
            concurrency: 4,
            extensions: vec!["pdf".to_string(), "txt".to_string(), "md".to_string()],
        }
    }
}

/// Timeout and retry settings applied to every external call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_retries: 3,
            initial_backoff_ms: 500,
        }
    }
}

/// News search settings (tone analysis tool).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewsSettings {
    pub endpoint: String,
    pub api_key_env: String,
    pub language: String,
    pub country: String,
    pub max_articles: usize,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://serpapi.com/search.json".to_string(),
            api_key_env: "SERP_API_KEY".to_string(),
            language: "fr".to_string(),
            country: "fr".to_string(),
            max_articles: 10,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    vector_store: Option<VectorStoreSettings>,
    chunking: Option<ChunkingSettings>,
    retrieval: Option<RetrievalSettings>,
    ingestion: Option<IngestionSettings>,
    network: Option<NetworkSettings>,
    news: Option<NewsSettings>,
}

#[derive(Debug, Clone, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    format: Option<LogFormat>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            log_format: LogFormat::Text,
            verbose: false,
            no_color: false,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            vector_store: VectorStoreSettings::default(),
            chunking: ChunkingSettings::default(),
            retrieval: RetrievalSettings::default(),
            ingestion: IngestionSettings::default(),
            network: NetworkSettings::default(),
            news: NewsSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config file and environment.
    ///
    /// Environment variables:
    /// - `LUXAS_WORKSPACE`: Override workspace path
    /// - `LUXAS_CONFIG`: Path to config file
    /// - `LUXAS_PROVIDER`: LLM provider
    /// - `LUXAS_MODEL`: LLM model identifier
    /// - `LUXAS_QDRANT_URL`: Use a remote Qdrant collection
    /// - `LUXAS_LOG_FORMAT`: `text` or `json`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration, with an explicit workspace and config file taking
    /// precedence over their environment variables.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("LUXAS_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("LUXAS_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.luxas_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("LUXAS_PROVIDER") {
            config.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("LUXAS_MODEL") {
            config.llm.model = model;
        }

        if let Ok(url) = std::env::var("LUXAS_QDRANT_URL") {
            config.vector_store.backend = VectorBackend::Qdrant {
                url,
                api_key_env: Some("QDRANT_API_KEY".to_string()),
            };
        }

        if let Ok(format) = std::env::var("LUXAS_LOG_FORMAT") {
            config.log_format = LogFormat::parse(&format).ok_or_else(|| {
                AppError::Config(format!("Unknown log format in LUXAS_LOG_FORMAT: {}", format))
            })?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = file.llm {
            result.llm = llm;
        }
        if let Some(embedding) = file.embedding {
            result.embedding = embedding;
        }
        if let Some(vector_store) = file.vector_store {
            result.vector_store = vector_store;
        }
        if let Some(chunking) = file.chunking {
            result.chunking = chunking;
        }
        if let Some(retrieval) = file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(ingestion) = file.ingestion {
            result.ingestion = ingestion;
        }
        if let Some(network) = file.network {
            result.network = network;
        }
        if let Some(news) = file.news {
            result.news = news;
        }

        tracing::debug!("Merged configuration from {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        log_format: Option<LogFormat>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if let Some(log_format) = log_format {
            self.log_format = log_format;
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .luxas directory.
    pub fn luxas_dir(&self) -> PathBuf {
        self.workspace.join(".luxas")
    }

    /// Ensure the .luxas directory exists.
    pub fn ensure_luxas_dir(&self) -> AppResult<()> {
        let dir = self.luxas_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .luxas directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Directory holding local index state.
    pub fn index_dir(&self) -> PathBuf {
        self.luxas_dir().join("index")
    }

    /// Workspace prompt overrides.
    pub fn prompts_dir(&self) -> PathBuf {
        self.luxas_dir().join("prompts")
    }

    /// SQLite database file; relative paths are resolved against the workspace.
    pub fn sqlite_path(&self) -> PathBuf {
        match &self.vector_store.backend {
            VectorBackend::Sqlite { path: Some(path) } if path.is_absolute() => path.clone(),
            VectorBackend::Sqlite { path: Some(path) } => self.workspace.join(path),
            _ => self.index_dir().join("index.sqlite"),
        }
    }

    /// Ingested document registry.
    pub fn registry_path(&self) -> PathBuf {
        self.index_dir().join("documents.jsonl")
    }

    /// API key for the language model, when the provider needs one.
    pub fn llm_api_key(&self) -> AppResult<Option<String>> {
        resolve_provider_key(&self.llm.provider, self.llm.api_key_env.as_deref())
    }

    /// API key for the embedding model, when the provider needs one.
    pub fn embedding_api_key(&self) -> AppResult<Option<String>> {
        resolve_provider_key(&self.embedding.provider, self.embedding.api_key_env.as_deref())
    }

    /// API key for the vector store, when one is configured.
    pub fn vector_store_api_key(&self) -> AppResult<Option<String>> {
        match &self.vector_store.backend {
            VectorBackend::Qdrant {
                api_key_env: Some(env),
                ..
            } => resolve_secret(env).map(Some),
            _ => Ok(None),
        }
    }

    /// API key for the news search service.
    pub fn news_api_key(&self) -> AppResult<String> {
        resolve_secret(&self.news.api_key_env)
    }

    /// Validate the configuration before any pipeline call.
    ///
    /// Missing credentials and inconsistent settings are reported as
    /// `AppError::Config` and must stop the process.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_LLM_PROVIDERS.contains(&self.llm.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        self.llm_api_key()?;
        self.embedding_api_key()?;
        self.vector_store_api_key()?;

        if let VectorBackend::Qdrant { url, .. } = &self.vector_store.backend {
            if url.trim().is_empty() {
                return Err(AppError::Config("Qdrant URL cannot be empty".to_string()));
            }
        }

        if self.vector_store.collection.trim().is_empty() {
            return Err(AppError::Config(
                "Collection name cannot be empty".to_string(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than 0".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding batch size must be greater than 0".to_string(),
            ));
        }

        if self.chunking.chunk_size == 0 || self.chunking.chunk_overlap >= self.chunking.chunk_size
        {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("topK must be greater than 0".to_string()));
        }

        if self.ingestion.max_chunks_per_batch == 0 || self.ingestion.concurrency == 0 {
            return Err(AppError::Config(
                "maxChunksPerBatch and concurrency must be greater than 0".to_string(),
            ));
        }

        if self.network.timeout_secs == 0 || self.network.max_retries == 0 {
            return Err(AppError::Config(
                "timeoutSecs and maxRetries must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Read a secret from the environment; empty values count as missing.
pub fn resolve_secret(env_var: &str) -> AppResult<String> {
    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Config(format!(
            "API key not found in environment variable: {}",
            env_var
        ))),
    }
}

/// Hosted providers need a key; local ones use it only when present.
fn resolve_provider_key(provider: &str, env_var: Option<&str>) -> AppResult<Option<String>> {
    match (provider.to_lowercase().as_str(), env_var) {
        ("openai", Some(env)) => resolve_secret(env).map(Some),
        ("openai", None) => Err(AppError::Config(
            "Provider 'openai' requires apiKeyEnv".to_string(),
        )),
        (_, Some(env)) => Ok(std::env::var(env).ok().filter(|v| !v.trim().is_empty())),
        (_, None) => Ok(None),
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}
