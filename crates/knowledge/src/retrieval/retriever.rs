//! Embedding search followed by optional heuristic re-ranking.

use super::scoring::rerank;
use crate::config::RetrievalConfig;
use crate::embeddings::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::RetrievedChunk;
use pagewise_core::{AppError, AppResult};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Fetch `top_k` nearest chunks of `doc_id`, re-rank them when asked, and
    /// keep at most `final_k` (never more than `top_k`).
    ///
    /// Embedding and store errors become [`AppError::RetrievalFailed`]. A
    /// re-ranking error is logged and the similarity order is kept.
    #[instrument(skip(self, query))]
    pub async fn retrieve(
        &self,
        query: &str,
        doc_id: &str,
        top_k: usize,
        final_k: usize,
        use_rerank: bool,
    ) -> AppResult<Vec<RetrievedChunk>> {
        let final_k = final_k.min(top_k);
        if final_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(|e| AppError::RetrievalFailed(format!("query embedding: {}", e)))?;

        let hits = self
            .store
            .search(&query_vector, doc_id, top_k, None)
            .await
            .map_err(|e| AppError::RetrievalFailed(format!("vector search: {}", e)))?;

        let candidates: Vec<RetrievedChunk> = hits
            .into_iter()
            .map(|hit| RetrievedChunk::new(hit.chunk, hit.score))
            .collect();
        debug!(candidates = candidates.len(), "Vector search complete");

        if candidates.is_empty() {
            return Ok(candidates);
        }

        let mut ranked = if use_rerank {
            match rerank(query, candidates.clone(), self.config.ideal_chunk_length) {
                Ok(ranked) => ranked,
                Err(e) => {
                    warn!(error = %e, "Re-ranking failed; keeping similarity order");
                    candidates
                }
            }
        } else {
            candidates
        };

        ranked.truncate(final_k);
        debug!(
            returned = ranked.len(),
            top_similarity = ranked.first().map(|c| c.similarity_score).unwrap_or(0.0),
            "Retrieved chunks"
        );
        Ok(ranked)
    }

    /// Replace each chunk's text with itself plus up to `window` neighbouring
    /// chunks on each side, joined by spaces. Scores and page numbers are kept;
    /// offsets span the merged range.
    ///
    /// Failures are logged and the input is returned unchanged.
    pub async fn expand_context(
        &self,
        chunks: &[RetrievedChunk],
        window: usize,
    ) -> Vec<RetrievedChunk> {
        if chunks.is_empty() || window == 0 {
            return chunks.to_vec();
        }

        let mut expanded = Vec::with_capacity(chunks.len());
        for retrieved in chunks {
            let doc_id = &retrieved.chunk.doc_id;
            let neighbours = match self.store.chunks(doc_id).await {
                Ok(all) => all,
                Err(e) => {
                    warn!(doc_id = %doc_id, error = %e, "Context expansion failed");
                    return chunks.to_vec();
                }
            };

            let Some(pos) = neighbours
                .iter()
                .position(|c| c.chunk_id == retrieved.chunk.chunk_id)
            else {
                expanded.push(retrieved.clone());
                continue;
            };

            let start = pos.saturating_sub(window);
            let end = (pos + window + 1).min(neighbours.len());
            let context = &neighbours[start..end];

            let mut merged = retrieved.clone();
            merged.chunk.text = context
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            merged.chunk.start_char = context[0].start_char;
            merged.chunk.end_char = context[context.len() - 1].end_char;
            expanded.push(merged);
        }
        expanded
    }
}
