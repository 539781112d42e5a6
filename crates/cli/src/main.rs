//! pagewise CLI
//!
//! Ingest plain-text documents and ask grounded questions about them.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChunkCommand, DeleteCommand, InfoCommand, IngestCommand};
use pagewise_core::config::AppConfig;
use pagewise_core::logging::{init_logging, LogOptions};
use pagewise_core::AppResult;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;

/// pagewise - question answering over your documents
#[derive(Parser, Debug)]
#[command(name = "pagewise")]
#[command(about = "Grounded question answering over ingested documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "PAGEWISE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "PAGEWISE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Generation provider (ollama, mock)
    #[arg(short, long, global = true, env = "PAGEWISE_LLM_PROVIDER")]
    provider: Option<String>,

    /// Generation model
    #[arg(short, long, global = true, env = "PAGEWISE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk, embed and store a document
    Ingest(IngestCommand),

    /// Ask a question about an ingested document
    Ask(AskCommand),

    /// Remove a document from the store
    Delete(DeleteCommand),

    /// Show what is stored for a document
    Info(InfoCommand),

    /// Chunk a document without storing it
    Chunk(ChunkCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest(_) => "ingest",
            Commands::Ask(_) => "ask",
            Commands::Delete(_) => "delete",
            Commands::Info(_) => "info",
            Commands::Chunk(_) => "chunk",
        }
    }
}

/// Defaults, config file and environment, then command-line flags.
fn resolve_config(cli: &Cli) -> AppResult<AppConfig> {
    let config = AppConfig::load_with(cli.workspace.clone(), cli.config.clone())?;

    let config = config.with_overrides(
        cli.workspace.clone(),
        cli.config.clone(),
        cli.provider.clone(),
        cli.model.clone(),
        cli.log_level.clone(),
        cli.verbose,
        cli.no_color,
        cli.json_logs,
    );
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;

    init_logging(&LogOptions {
        level: config.log_level.as_deref(),
        no_color: config.no_color,
        json: config.json_logs,
    })?;

    tracing::debug!(workspace = ?config.workspace, "pagewise starting");
    tracing::debug!(
        llm = %config.llm.provider,
        model = %config.llm.model,
        embedding = %config.embedding.provider,
        store = %config.store.backend,
        "Collaborators"
    );

    let span = tracing::info_span!("command", name = cli.command.name());
    let result = dispatch(cli.command, &config).instrument(span).await;

    match &result {
        Ok(_) => tracing::debug!("Command completed successfully"),
        Err(e) => tracing::debug!(error = %e, "Command failed"),
    }

    Ok(result?)
}

async fn dispatch(command: Commands, config: &AppConfig) -> AppResult<()> {
    match command {
        Commands::Ingest(cmd) => cmd.execute(config).await,
        Commands::Ask(cmd) => cmd.execute(config).await,
        Commands::Delete(cmd) => cmd.execute(config).await,
        Commands::Info(cmd) => cmd.execute(config).await,
        Commands::Chunk(cmd) => cmd.execute(config).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_arguments() {
        let cli = Cli::try_parse_from([
            "pagewise",
            "--workspace",
            "/tmp/ws",
            "ask",
            "bio",
            "What is osmosis?",
            "--top-k",
            "10",
            "--no-rerank",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ws")));
        let Commands::Ask(ask) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(ask.doc_id, "bio");
        assert_eq!(ask.question, "What is osmosis?");
        assert_eq!(ask.top_k, Some(10));
        assert!(ask.no_rerank);
        assert!(ask.json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pagewise", "info", "bio", "--verbose", "--json-logs"])
            .unwrap();
        assert!(cli.verbose);
        assert!(cli.json_logs);
        assert_eq!(cli.command.name(), "info");
    }

    #[tokio::test]
    async fn test_dispatch_runs_chunk_command() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "Osmosis moves water across membranes.\x0cDiffusion spreads solutes.")
            .unwrap();

        let config = AppConfig {
            workspace: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let cli = Cli::try_parse_from(["pagewise", "chunk", file.to_str().unwrap(), "--json"])
            .unwrap();

        assert!(dispatch(cli.command, &config).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_reports_missing_document() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig {
            workspace: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let cli = Cli::try_parse_from(["pagewise", "chunk", "/nonexistent/notes.txt"]).unwrap();

        let err = dispatch(cli.command, &config).await.unwrap_err();
        let err: anyhow::Error = err.into();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_ingest_requires_file() {
        assert!(Cli::try_parse_from(["pagewise", "ingest"]).is_err());
    }
}
