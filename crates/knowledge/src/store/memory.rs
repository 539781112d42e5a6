//! In-process store; contents are lost on exit.

use super::{check_dimensions, rank_points, summarize, SearchHit, VectorPoint, VectorStore};
use crate::types::{Chunk, DocumentInfo};
use chrono::{DateTime, Utc};
use pagewise_core::AppResult;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Document {
    /// Keyed by chunk id.
    points: BTreeMap<String, VectorPoint>,
    updated_at: Option<DateTime<Utc>>,
}

impl Document {
    fn ordered_chunks(&self) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = self.points.values().map(|p| p.chunk.clone()).collect();
        chunks.sort_by_key(|c| c.chunk_index);
        chunks
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VectorStore for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> AppResult<usize> {
        check_dimensions(&points)?;
        let count = points.len();
        let now = Utc::now();

        let mut documents = self.documents.write().await;
        for point in points {
            let doc = documents.entry(point.chunk.doc_id.clone()).or_default();
            doc.updated_at = Some(now);
            doc.points.insert(point.chunk.chunk_id.clone(), point);
        }

        tracing::trace!(count, "Upserted points into memory store");
        Ok(count)
    }

    async fn search(
        &self,
        query: &[f32],
        doc_id: &str,
        top_k: usize,
        score_threshold: Option<f32>,
    ) -> AppResult<Vec<SearchHit>> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(doc_id)
            .map(|doc| rank_points(query, doc.points.values(), top_k, score_threshold))
            .unwrap_or_default())
    }

    async fn delete(&self, doc_id: &str) -> AppResult<usize> {
        let removed = self.documents.write().await.remove(doc_id);
        Ok(removed.map_or(0, |doc| doc.points.len()))
    }

    async fn chunks(&self, doc_id: &str) -> AppResult<Vec<Chunk>> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(doc_id)
            .map(Document::ordered_chunks)
            .unwrap_or_default())
    }

    async fn list_documents(&self) -> AppResult<Vec<String>> {
        let mut ids: Vec<String> = self.documents.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn get_info(&self, doc_id: &str) -> AppResult<Option<DocumentInfo>> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(doc_id)
            .and_then(|doc| summarize(doc_id, &doc.ordered_chunks(), doc.updated_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{exercise_store, point};
    use super::*;

    #[tokio::test]
    async fn test_memory_store_contract() {
        exercise_store(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_info_has_timestamp() {
        let store = MemoryStore::new();
        store
            .upsert(vec![point("d", 0, 1, "text", vec![1.0])])
            .await
            .unwrap();
        assert!(store.get_info("d").await.unwrap().unwrap().updated_at.is_some());
    }
}
