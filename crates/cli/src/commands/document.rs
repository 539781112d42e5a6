//! Document management command handlers.

use clap::Args;
use pagewise_core::{config::AppConfig, AppError, AppResult};

/// Remove a document from the store
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Document id
    pub doc_id: String,
}

impl DeleteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(doc_id = %self.doc_id, "Executing delete command");

        let ingestor = super::services(config)?.ingestor().await?;
        let removed = ingestor.delete_document(&self.doc_id).await?;

        if removed == 0 {
            println!("No document '{}' found", self.doc_id);
        } else {
            println!("Deleted '{}' ({} chunks)", self.doc_id, removed);
        }
        Ok(())
    }
}

/// Show what is stored for a document
#[derive(Args, Debug)]
pub struct InfoCommand {
    /// Document id
    pub doc_id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InfoCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(doc_id = %self.doc_id, "Executing info command");

        let ingestor = super::services(config)?.ingestor().await?;
        let info = ingestor
            .document_info(&self.doc_id)
            .await?
            .ok_or_else(|| AppError::Knowledge(format!("No document '{}'", self.doc_id)))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            println!("Document: {}", info.doc_id);
            println!("Chunks: {}", info.chunk_count);
            println!("Pages: {}", info.page_count);
            println!("Characters: {}", info.total_chars);
            if let Some(updated) = info.updated_at {
                println!("Updated: {}", updated.to_rfc3339());
            }
        }
        Ok(())
    }
}
