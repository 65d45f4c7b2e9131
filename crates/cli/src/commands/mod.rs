//! Command handlers for the LuXas CLI.
//!
//! Each subcommand lives in its own module and exposes an
//! `execute(&self, &AppConfig)` entry point.

pub mod ask;
pub mod chat;
pub mod doctor;
pub mod index;
pub mod ingest;
pub mod summarize;
pub mod tone;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use doctor::DoctorCommand;
pub use index::IndexCommand;
pub use ingest::IngestCommand;
pub use summarize::SummarizeCommand;
pub use tone::ToneCommand;

use anyhow::Context;
use luxas_knowledge::loader::load_document_blocking;
use serde::Serialize;
use std::path::Path;

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Full text of a law file given on the command line.
pub(crate) async fn read_law_text(path: &Path) -> anyhow::Result<String> {
    let document = load_document_blocking(path.to_path_buf())
        .await
        .with_context(|| format!("Cannot read law text from {}", path.display()))?;

    if document.is_blank() {
        anyhow::bail!("{} contains no extractable text", path.display());
    }

    Ok(document.full_text())
}
