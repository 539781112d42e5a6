//! Ingest command handler.

use clap::Args;
use pagewise_core::{config::AppConfig, AppError, AppResult};
use pagewise_knowledge::PlainTextSource;
use std::path::PathBuf;

/// Chunk, embed and store a document
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// UTF-8 text file; form feeds separate pages
    pub file: PathBuf,

    /// Document id (default: the file name without extension)
    #[arg(long)]
    pub doc_id: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let doc_id = self
            .doc_id
            .clone()
            .unwrap_or_else(|| super::default_doc_id(&self.file));
        tracing::info!(file = ?self.file, doc_id = %doc_id, "Executing ingest command");

        let services = super::services(config)?;
        let ingestor = services.ingestor().await?;
        let report = ingestor
            .ingest_file(&PlainTextSource, &self.file, &doc_id)
            .await?;

        if self.json {
            let output = serde_json::json!({
                "docId": report.doc_id,
                "pages": report.pages,
                "replacedChunks": report.replaced,
                "statistics": report.statistics,
                "issues": report.issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "elapsedMs": report.elapsed.as_millis() as u64,
            });
            let rendered = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", rendered);
        } else {
            let stats = &report.statistics;
            println!(
                "Ingested '{}': {} pages, {} chunks (avg {:.0} chars) in {:.2}s",
                report.doc_id,
                report.pages,
                stats.total_chunks,
                stats.avg_chunk_chars,
                report.elapsed.as_secs_f64()
            );
            if report.replaced > 0 {
                println!("Replaced {} chunks from the previous version", report.replaced);
            }
            for issue in &report.issues {
                println!("warning: {}", issue);
            }
        }

        Ok(())
    }
}
