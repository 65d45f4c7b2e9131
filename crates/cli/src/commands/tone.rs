//! Tone command handler.

use super::{print_json, read_law_text};
use clap::Args;
use luxas_core::{AppConfig, RetryPolicy};
use luxas_knowledge::language_model;
use luxas_prompt::PromptLibrary;
use luxas_tools::{SerpApiNews, ToneAnalyzer};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Analyse press coverage of a law
#[derive(Args, Debug)]
pub struct ToneCommand {
    /// Law file
    pub file: PathBuf,

    /// Title used as the news query (default: file name without extension)
    #[arg(long)]
    pub title: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn default_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().replace(['_', '-'], " "))
        .unwrap_or_default()
}

impl ToneCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| default_title(&self.file));
        tracing::info!("Analysing press tone for '{}'", title);

        let text = read_law_text(&self.file).await?;

        let news = SerpApiNews::new(
            config.news.clone(),
            config.news_api_key()?,
            RetryPolicy::from_settings(&config.network),
        );
        let prompts = Arc::new(PromptLibrary::load(&config.workspace)?);
        let analyzer = ToneAnalyzer::new(
            language_model(config)?,
            Arc::new(news),
            prompts,
            &config.llm.model,
        );

        let report = analyzer.analyze(&text, &title).await?;

        if self.json {
            print_json(&serde_json::json!({
                "title": title,
                "articles": report.articles,
                "analysis": report.analysis,
            }))?;
            return Ok(());
        }

        if !report.articles.is_empty() {
            println!("Articles ({}) :", report.articles.len());
            for article in &report.articles {
                println!("  - {} ({}) {}", article.title, article.source, article.link);
            }
            println!();
        }
        println!("{}", report.analysis);

        Ok(())
    }
}
