//! LuXas CLI
//!
//! Entry point for the `luxas` command-line tool: document ingestion,
//! grounded question answering over French legislative proposals, and
//! the auxiliary law tools.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, ChatCommand, DoctorCommand, IndexCommand, IngestCommand, SummarizeCommand,
    ToneCommand,
};
use luxas_core::logging::{self, LogFormat};
use luxas_core::AppConfig;
use std::path::PathBuf;

/// LuXas - questions sur les propositions de loi, réponses sourcées
#[derive(Parser, Debug)]
#[command(name = "luxas")]
#[command(about = "Grounded answers over French legislative proposals", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "LUXAS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file (default: <workspace>/.luxas/config.yaml)
    #[arg(short, long, global = true, env = "LUXAS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log line format (text, json)
    #[arg(long, global = true, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openai, ollama, mock)
    #[arg(short, long, global = true, env = "LUXAS_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "LUXAS_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index documents (PDF, TXT) into the collection
    Ingest(IngestCommand),

    /// Ask one question
    Ask(AskCommand),

    /// Interactive question loop with conversation history
    Chat(ChatCommand),

    /// Collection maintenance
    Index(IndexCommand),

    /// Summarize a law text
    Summarize(SummarizeCommand),

    /// Analyse press coverage of a law
    Tone(ToneCommand),

    /// Check credentials, collection and configuration
    Doctor(DoctorCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest(_) => "ingest",
            Commands::Ask(_) => "ask",
            Commands::Chat(_) => "chat",
            Commands::Index(_) => "index",
            Commands::Summarize(_) => "summarize",
            Commands::Tone(_) => "tone",
            Commands::Doctor(_) => "doctor",
        }
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    LogFormat::parse(value).ok_or_else(|| format!("unknown log format '{}' (text, json)", value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // File and environment first, then CLI flags on top
    let config = AppConfig::load_from(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.log_format,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.log_format, config.no_color)?;

    tracing::info!("LuXas CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("LLM: {} / {}", config.llm.provider, config.llm.model);
    tracing::debug!(
        "Embeddings: {} / {} ({} dims)",
        config.embedding.provider,
        config.embedding.model,
        config.embedding.dimensions
    );

    // Doctor reports configuration problems instead of failing on them
    if !matches!(cli.command, Commands::Doctor(_)) {
        config.validate()?;
    }

    config.ensure_luxas_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Summarize(cmd) => cmd.execute(&config).await,
        Commands::Tone(cmd) => cmd.execute(&config).await,
        Commands::Doctor(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest_flags() {
        let cli = Cli::try_parse_from([
            "luxas",
            "--log-format",
            "json",
            "ingest",
            "docs/",
            "extra.pdf",
            "--reset",
            "--batch-chunks",
            "50",
        ])
        .unwrap();

        assert_eq!(cli.log_format, Some(LogFormat::Json));
        let Commands::Ingest(cmd) = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(cmd.paths.len(), 2);
        assert!(cmd.reset);
        assert_eq!(cmd.batch_chunks, Some(50));
        assert_eq!(cmd.concurrency, None);
    }

    #[test]
    fn test_parse_index_and_tone() {
        let cli = Cli::try_parse_from(["luxas", "index", "stats", "--json"]).unwrap();
        assert_eq!(cli.command.name(), "index");

        let cli = Cli::try_parse_from(["luxas", "tone", "loi.pdf", "--title", "Loi 123"]).unwrap();
        let Commands::Tone(cmd) = cli.command else {
            panic!("expected tone");
        };
        assert_eq!(cmd.title.as_deref(), Some("Loi 123"));
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        assert!(Cli::try_parse_from(["luxas", "--log-format", "xml", "doctor"]).is_err());
    }
}
