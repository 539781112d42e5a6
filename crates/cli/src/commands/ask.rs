//! Ask command handler.

use clap::Args;
use pagewise_core::{config::AppConfig, AppError, AppResult};
use pagewise_knowledge::{AnswerResult, AskOptions, ChatTurn};
use std::path::{Path, PathBuf};

/// Ask a question about an ingested document
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Document to answer from
    pub doc_id: String,

    /// The question
    pub question: String,

    /// JSON file with earlier turns: [{"role": "user", "text": "..."}]
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Candidates fetched from the store
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Chunks kept after re-ranking
    #[arg(long)]
    pub final_k: Option<usize>,

    /// Keep vector similarity order
    #[arg(long)]
    pub no_rerank: bool,

    /// Temperature for the answer (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Merge this many neighbouring chunks into each excerpt
    #[arg(long)]
    pub context_window: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(doc_id = %self.doc_id, "Executing ask command");

        let history = match &self.history {
            Some(path) => load_history(path)?,
            None => Vec::new(),
        };

        let options = AskOptions {
            top_k: self.top_k,
            final_k: self.final_k,
            rerank: self.no_rerank.then_some(false),
            temperature: self.temperature,
            context_window: self.context_window,
        };

        let services = super::services(config)?;
        let pipeline = services.pipeline().await?;

        let result = pipeline
            .answer(&self.doc_id, &self.question, &history, options)
            .await
            .map_err(|e| AppError::Other(e.user_message()))?;

        if self.json {
            let rendered = serde_json::to_string_pretty(&result)?;
            println!("{}", rendered);
        } else {
            print_answer(&result);
        }

        Ok(())
    }
}

fn load_history(path: &Path) -> AppResult<Vec<ChatTurn>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("Failed to read history {:?}: {}", path, e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| AppError::Config(format!("Invalid history {:?}: {}", path, e)))
}

fn print_answer(result: &AnswerResult) {
    println!("{}", result.answer_text);
    println!();
    println!(
        "Strategy: {}  Confidence: {:.2}",
        result.strategy, result.confidence
    );

    if !result.citations.is_empty() {
        println!("Citations:");
        for citation in &result.citations {
            println!("- Page {}: {}", citation.page_number, citation.snippet);
        }
    }

    println!();
    println!("{}", result.follow_up);
}
