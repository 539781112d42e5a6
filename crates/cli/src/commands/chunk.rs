//! Chunk command handler: a dry run of ingestion's chunking step.

use clap::Args;
use pagewise_core::{config::AppConfig, AppResult};
use pagewise_knowledge::{
    load_config, validate_chunks, ChunkStatistics, DocumentSource, PlainTextSource,
    SemanticChunker,
};
use std::path::PathBuf;

/// Chunk a document without storing it
#[derive(Args, Debug)]
pub struct ChunkCommand {
    /// UTF-8 text file; form feeds separate pages
    pub file: PathBuf,

    /// Print every chunk, not just statistics
    #[arg(long)]
    pub show: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ChunkCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(file = ?self.file, "Executing chunk command");

        let rag = load_config(&config.workspace)?;
        let pages = PlainTextSource.extract(&self.file).await?;
        let doc_id = super::default_doc_id(&self.file);

        let chunks = SemanticChunker::new(rag.chunking.clone()).chunk_document(&doc_id, &pages);
        let stats = ChunkStatistics::from_chunks(&chunks);
        let issues = validate_chunks(&chunks, rag.chunking.max_chunk_size);

        if self.json {
            let output = serde_json::json!({
                "docId": doc_id,
                "pages": pages.len(),
                "statistics": stats,
                "issues": issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "chunks": if self.show { serde_json::to_value(&chunks)? } else { serde_json::Value::Null },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("{} pages -> {} chunks", pages.len(), stats.total_chunks);
        println!(
            "chars: total {}, avg {:.0}, min {}, max {}",
            stats.total_chars, stats.avg_chunk_chars, stats.min_chunk_chars, stats.max_chunk_chars
        );
        println!("estimated tokens: {}", stats.total_token_estimate);
        println!("pages covered: {}", stats.pages_covered);
        for issue in &issues {
            println!("warning: {}", issue);
        }

        if self.show {
            for chunk in &chunks {
                println!();
                println!(
                    "[{}] page {} chars {}..{}",
                    chunk.chunk_id, chunk.page_number, chunk.start_char, chunk.end_char
                );
                println!("{}", chunk.text);
            }
        }
        Ok(())
    }
}
