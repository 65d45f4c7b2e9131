//! Prompt system for LuXas.
//!
//! This crate provides structured prompt management with:
//! - YAML prompt definitions shipped with the binary
//! - Workspace overrides under `.luxas/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod library;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, render_template};
pub use library::PromptLibrary;
pub use loader::{list_prompts, load_prompt, parse_prompt};
pub use types::{BuiltPrompt, PromptBehavior, PromptDefinition, PromptOutputSpec};
