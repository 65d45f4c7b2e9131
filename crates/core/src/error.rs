//! Error types for LuXas.
//!
//! A single error enum covers configuration, document intake, the upstream
//! services (embedding, language model, vector store, news search) and the
//! local plumbing (I/O, prompts, serialization).

use std::fmt;
use thiserror::Error;

/// External service a call was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Embedding,
    LanguageModel,
    VectorStore,
    NewsSearch,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Embedding => "Embedding service",
            Service::LanguageModel => "Language model",
            Service::VectorStore => "Vector store",
            Service::NewsSearch => "News search",
        };
        f.write_str(name)
    }
}

/// Unified error type for LuXas.
///
/// All functions in the workspace return `Result<T, AppError>`.
/// We never panic: errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid settings and credentials (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input file with an extension the loader does not handle
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Supported file that could not be read or decoded
    #[error("Document error: {0}")]
    Document(String),

    /// Embedding service rejected or mangled a request
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Language model rejected or mangled a request
    #[error("LLM error: {0}")]
    Llm(String),

    /// Vector store failures
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// Query or write against a collection that was never created
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Vector length does not match the collection
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// News search failures
    #[error("News search error: {0}")]
    Search(String),

    /// Transient upstream failure (network, throttling, 5xx)
    #[error("{service} unavailable: {message}")]
    Unavailable { service: Service, message: String },

    /// An external call exceeded its deadline
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    /// Knowledge base errors (ingestion, registry)
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Unavailable { .. } | AppError::Timeout { .. })
    }

    /// Classify a non-success HTTP status returned by an upstream service.
    ///
    /// Throttling, request timeouts and server errors are transient; anything
    /// else is reported against the service and is not retried.
    pub fn upstream(service: Service, status: u16, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, body.trim());
        if status == 408 || status == 429 || status >= 500 {
            return AppError::Unavailable { service, message };
        }
        match service {
            Service::Embedding => AppError::Embedding(message),
            Service::LanguageModel => AppError::Llm(message),
            Service::VectorStore => AppError::VectorStore(message),
            Service::NewsSearch => AppError::Search(message),
        }
    }

    /// The upstream service this error came from, if any.
    pub fn service(&self) -> Option<Service> {
        match self {
            AppError::Embedding(_) => Some(Service::Embedding),
            AppError::Llm(_) => Some(Service::LanguageModel),
            AppError::VectorStore(_)
            | AppError::CollectionNotFound(_)
            | AppError::DimensionMismatch { .. } => Some(Service::VectorStore),
            AppError::Search(_) => Some(Service::NewsSearch),
            AppError::Unavailable { service, .. } => Some(*service),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_throttling_is_retryable() {
        let err = AppError::upstream(Service::Embedding, 429, "rate limited");
        assert!(err.is_retryable());
        assert_eq!(err.service(), Some(Service::Embedding));
        assert!(err.to_string().contains("Embedding service unavailable"));
    }

    #[test]
    fn test_upstream_server_error_is_retryable() {
        let err = AppError::upstream(Service::LanguageModel, 503, "");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_upstream_client_error_fails_fast() {
        let err = AppError::upstream(Service::LanguageModel, 401, "bad key");
        assert!(!err.is_retryable());
        assert!(matches!(err, AppError::Llm(_)));
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = AppError::Timeout {
            operation: "qdrant.search".to_string(),
            secs: 60,
        };
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "qdrant.search timed out after 60s");
    }

    #[test]
    fn test_dimension_mismatch_belongs_to_vector_store() {
        let err = AppError::DimensionMismatch {
            expected: 1536,
            actual: 384,
        };
        assert_eq!(err.service(), Some(Service::VectorStore));
        assert_eq!(err.to_string(), "Dimension mismatch: expected 1536, got 384");
    }

    #[test]
    fn test_config_error_has_no_service() {
        let err = AppError::Config("missing key".to_string());
        assert_eq!(err.service(), None);
        assert!(!err.is_retryable());
    }
}
