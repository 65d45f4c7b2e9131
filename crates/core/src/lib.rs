//! LuXas Core Library
//!
//! This crate provides the foundational utilities shared by every LuXas crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - Timeout and retry discipline for external calls

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, Service};
pub use retry::RetryPolicy;
