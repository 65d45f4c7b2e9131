//! Ask command handler.

use super::print_json;
use anyhow::Context;
use clap::Args;
use luxas_core::AppConfig;
use luxas_knowledge::{ConversationHistory, RagContext};
use std::path::PathBuf;

/// Ask one question against the indexed documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question
    pub question: String,

    /// Prior conversation as a JSON array of {role, content}
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Number of passages to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing ask command");

        let mut config = config.clone();
        if let Some(k) = self.top_k {
            config.retrieval.top_k = k.max(1);
        }

        let history = match &self.history {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Cannot read history file {}", path.display()))?;
                ConversationHistory::from_json(&raw)
                    .with_context(|| format!("Invalid history in {}", path.display()))?
            }
            None => ConversationHistory::default(),
        };

        let context = RagContext::from_config(&config)?;
        let answer = context.answer(&self.question, history.turns()).await;

        if self.json {
            let output = serde_json::json!({
                "question": self.question,
                "outcome": answer,
                "rendered": answer.render(),
            });
            print_json(&output)?;
        } else {
            println!("{}", answer.render());
        }

        Ok(())
    }
}
