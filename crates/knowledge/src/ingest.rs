//! Turning extracted pages into stored, embedded chunks.

use crate::chunk::{validate_chunks, ChunkIssue, ChunkStatistics, SemanticChunker};
use crate::embeddings::EmbeddingProvider;
use crate::store::{VectorPoint, VectorStore};
use crate::types::{DocumentInfo, Page};
use pagewise_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Page separator in plain-text exports.
const FORM_FEED: char = '\x0c';

/// Extracts per-page text from a document file.
#[async_trait::async_trait]
pub trait DocumentSource: Send + Sync {
    async fn extract(&self, path: &Path) -> AppResult<Vec<Page>>;
}

/// UTF-8 text with pages separated by form feeds, numbered from 1.
///
/// Empty pages are kept so later page numbers stay aligned with the file.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextSource;

impl PlainTextSource {
    pub fn split_pages(text: &str) -> Vec<Page> {
        text.split(FORM_FEED)
            .enumerate()
            .map(|(i, page)| Page::new(i as u32 + 1, page))
            .collect()
    }
}

#[async_trait::async_trait]
impl DocumentSource for PlainTextSource {
    async fn extract(&self, path: &Path) -> AppResult<Vec<Page>> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

        if bytes.contains(&0) {
            return Err(AppError::Knowledge(format!(
                "{:?} looks like a binary file",
                path
            )));
        }
        let text = String::from_utf8(bytes)
            .map_err(|e| AppError::Knowledge(format!("{:?} is not UTF-8: {}", path, e)))?;

        let pages = Self::split_pages(&text);
        tracing::debug!(path = ?path, pages = pages.len(), "Extracted pages");
        Ok(pages)
    }
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub doc_id: String,
    pub pages: usize,
    /// Chunks removed from a previous ingestion of the same document.
    pub replaced: usize,
    pub statistics: ChunkStatistics,
    pub issues: Vec<ChunkIssue>,
    pub elapsed: Duration,
}

/// Chunks, embeds and stores documents.
pub struct Ingestor {
    chunker: SemanticChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(
        chunker: SemanticChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Replace the stored chunks of `doc_id` with chunks of `pages`.
    ///
    /// Every chunk is embedded before anything is written, so an embedding
    /// failure leaves the previous version in place.
    pub async fn ingest(&self, doc_id: &str, pages: &[Page]) -> AppResult<IngestReport> {
        let start = Instant::now();
        let doc_id = doc_id.trim();
        if doc_id.is_empty() {
            return Err(AppError::Knowledge("Document id cannot be empty".to_string()));
        }

        tracing::info!(doc_id, pages = pages.len(), "Ingesting document");

        let chunks = self.chunker.chunk_document(doc_id, pages);
        let statistics = ChunkStatistics::from_chunks(&chunks);
        let issues = validate_chunks(&chunks, self.chunker.config().max_chunk_size);
        for issue in &issues {
            tracing::warn!(doc_id, %issue, "Chunk validation issue");
        }

        let mut points = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_texts(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            points.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(vectors)
                    .map(|(chunk, vector)| VectorPoint { chunk, vector }),
            );
            tracing::debug!(doc_id, embedded = points.len(), total = chunks.len(), "Embedded batch");
        }

        let replaced = self.store.delete(doc_id).await?;
        let written = if points.is_empty() {
            0
        } else {
            self.store.upsert(points).await?
        };

        let elapsed = start.elapsed();
        tracing::info!(
            doc_id,
            chunks = written,
            replaced,
            elapsed_ms = elapsed.as_millis() as u64,
            "Document ingested"
        );

        Ok(IngestReport {
            doc_id: doc_id.to_string(),
            pages: pages.len(),
            replaced,
            statistics,
            issues,
            elapsed,
        })
    }

    /// Extract `path` with `source` and ingest the result.
    pub async fn ingest_file(
        &self,
        source: &dyn DocumentSource,
        path: &Path,
        doc_id: &str,
    ) -> AppResult<IngestReport> {
        let pages = source.extract(path).await?;
        self.ingest(doc_id, &pages).await
    }

    /// Remove a document. Returns the number of chunks deleted.
    pub async fn delete_document(&self, doc_id: &str) -> AppResult<usize> {
        let removed = self.store.delete(doc_id).await?;
        tracing::info!(doc_id, removed, "Deleted document");
        Ok(removed)
    }

    pub async fn document_info(&self, doc_id: &str) -> AppResult<Option<DocumentInfo>> {
        self.store.get_info(doc_id).await
    }

    pub async fn list_documents(&self) -> AppResult<Vec<String>> {
        self.store.list_documents().await
    }
}
