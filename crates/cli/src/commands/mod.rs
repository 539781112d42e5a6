//! Command handlers for the pagewise CLI.

pub mod ask;
pub mod chunk;
pub mod document;
pub mod ingest;

pub use ask::AskCommand;
pub use chunk::ChunkCommand;
pub use document::{DeleteCommand, InfoCommand};
pub use ingest::IngestCommand;

use pagewise_core::{config::AppConfig, AppResult};
use pagewise_knowledge::Services;
use std::path::Path;

/// Collaborators for the workspace in `config`.
pub(crate) fn services(config: &AppConfig) -> AppResult<Services> {
    Services::from_workspace(config.clone())
}

/// Document id derived from a file name: its stem, or `document`.
pub(crate) fn default_doc_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("document")
        .to_string()
}
