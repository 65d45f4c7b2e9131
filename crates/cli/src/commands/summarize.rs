//! Summarize command handler.

use super::{print_json, read_law_text};
use clap::Args;
use luxas_core::AppConfig;
use luxas_knowledge::language_model;
use luxas_prompt::PromptLibrary;
use luxas_tools::Summarizer;
use std::path::PathBuf;
use std::sync::Arc;

/// Summarize a law text (PDF or TXT)
#[derive(Args, Debug)]
pub struct SummarizeCommand {
    /// Law file
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SummarizeCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Summarizing {}", self.file.display());

        let text = read_law_text(&self.file).await?;
        let prompts = Arc::new(PromptLibrary::load(&config.workspace)?);
        let summarizer = Summarizer::new(language_model(config)?, prompts, &config.llm.model);

        let summary = summarizer.summarize(&text).await?;

        if self.json {
            print_json(&serde_json::json!({
                "file": self.file,
                "summary": summary,
            }))?;
        } else {
            println!("{}", summary);
        }

        Ok(())
    }
}
