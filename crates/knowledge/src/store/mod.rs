//! Vector storage for embedded chunks.
//!
//! A store holds the chunks of many documents, each with its embedding. All
//! queries are scoped to one document.

pub mod file;
#[cfg(feature = "lancedb")]
pub mod lance;
pub mod memory;

pub use file::FileStore;
#[cfg(feature = "lancedb")]
pub use lance::LanceStore;
pub use memory::MemoryStore;

use crate::types::{Chunk, DocumentInfo};
use chrono::{DateTime, Utc};
use pagewise_core::{AppConfig, AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A chunk together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// One search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// Backend for storing and searching chunk embeddings.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    fn backend_name(&self) -> &str;

    /// Insert points, replacing any with the same chunk id. Returns the number
    /// written.
    async fn upsert(&self, points: Vec<VectorPoint>) -> AppResult<usize>;

    /// Up to `top_k` chunks of `doc_id`, most similar first. Hits scoring below
    /// `score_threshold` are dropped.
    async fn search(
        &self,
        query: &[f32],
        doc_id: &str,
        top_k: usize,
        score_threshold: Option<f32>,
    ) -> AppResult<Vec<SearchHit>>;

    /// Remove every chunk of a document. Returns the number removed.
    async fn delete(&self, doc_id: &str) -> AppResult<usize>;

    /// All chunks of a document in chunk order.
    async fn chunks(&self, doc_id: &str) -> AppResult<Vec<Chunk>>;

    /// Ids of every stored document, sorted.
    async fn list_documents(&self) -> AppResult<Vec<String>>;

    async fn get_info(&self, doc_id: &str) -> AppResult<Option<DocumentInfo>> {
        let chunks = self.chunks(doc_id).await?;
        Ok(summarize(doc_id, &chunks, None))
    }
}

/// Open the store selected by `config.store.backend`.
pub async fn create_store(config: &AppConfig) -> AppResult<Arc<dyn VectorStore>> {
    let dir = config.store_dir();
    match config.store.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "file" => Ok(Arc::new(FileStore::new(dir))),
        #[cfg(feature = "lancedb")]
        "lancedb" => Ok(Arc::new(
            LanceStore::open(&dir.join("lance"), "chunks", config.embedding.dimensions).await?,
        )),
        #[cfg(not(feature = "lancedb"))]
        "lancedb" => Err(AppError::Config(
            "The lancedb store backend requires building with --features lancedb".to_string(),
        )),
        other => Err(AppError::Config(format!(
            "Unknown store backend: '{}'. Supported backends: file, memory, lancedb",
            other
        ))),
    }
}

/// Cosine similarity; 0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score points against a query and keep the best `top_k`.
pub(crate) fn rank_points<'a>(
    query: &[f32],
    points: impl IntoIterator<Item = &'a VectorPoint>,
    top_k: usize,
    score_threshold: Option<f32>,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = points
        .into_iter()
        .map(|p| SearchHit {
            chunk: p.chunk.clone(),
            score: cosine_similarity(query, &p.vector),
        })
        .filter(|hit| score_threshold.map_or(true, |t| hit.score >= t))
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    hits.truncate(top_k);
    hits
}

pub(crate) fn check_dimensions(points: &[VectorPoint]) -> AppResult<()> {
    let Some(first) = points.first() else {
        return Ok(());
    };
    let dim = first.vector.len();
    if let Some(bad) = points.iter().find(|p| p.vector.len() != dim) {
        return Err(AppError::Store(format!(
            "Embedding dimension mismatch for {}: expected {}, got {}",
            bad.chunk.chunk_id,
            dim,
            bad.vector.len()
        )));
    }
    Ok(())
}

pub(crate) fn summarize(
    doc_id: &str,
    chunks: &[Chunk],
    updated_at: Option<DateTime<Utc>>,
) -> Option<DocumentInfo> {
    if chunks.is_empty() {
        return None;
    }
    let pages: BTreeSet<u32> = chunks.iter().map(|c| c.page_number).collect();
    Some(DocumentInfo {
        doc_id: doc_id.to_string(),
        chunk_count: chunks.len(),
        page_count: pages.len(),
        total_chars: chunks.iter().map(|c| c.text.chars().count()).sum(),
        updated_at,
    })
}
