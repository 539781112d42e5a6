//! LanceDB-backed store, enabled with the `lancedb` feature.

use super::{check_dimensions, cosine_similarity, SearchHit, VectorPoint, VectorStore};
use crate::types::Chunk;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array, UInt64Array,
};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Table;
use pagewise_core::{AppError, AppResult};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

pub struct LanceStore {
    table: Table,
    embedding_dim: usize,
}

impl LanceStore {
    /// Open `table_name` in the database at `db_path`, creating both if needed.
    pub async fn open(db_path: &Path, table_name: &str, embedding_dim: usize) -> AppResult<Self> {
        std::fs::create_dir_all(db_path)
            .map_err(|e| AppError::Store(format!("Failed to create store directory: {}", e)))?;

        let uri = db_path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to connect to LanceDB: {}", e)))?;

        let table_names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to list tables: {}", e)))?;

        let table = if table_names.iter().any(|name| name == table_name) {
            conn.open_table(table_name)
                .execute()
                .await
                .map_err(|e| AppError::Store(format!("Failed to open table: {}", e)))?
        } else {
            let schema = schema(embedding_dim);
            let empty = RecordBatch::new_empty(schema.clone());
            conn.create_table(table_name, RecordBatchIterator::new(vec![Ok(empty)], schema))
                .execute()
                .await
                .map_err(|e| AppError::Store(format!("Failed to create table: {}", e)))?
        };

        tracing::debug!("Opened LanceDB store at {:?}", db_path);
        Ok(Self {
            table,
            embedding_dim,
        })
    }

    fn points_to_batch(&self, points: &[VectorPoint]) -> AppResult<RecordBatch> {
        if let Some(bad) = points.iter().find(|p| p.vector.len() != self.embedding_dim) {
            return Err(AppError::Store(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.embedding_dim,
                bad.vector.len()
            )));
        }

        let chunks = || points.iter().map(|p| &p.chunk);
        let values: Vec<f32> = points.iter().flat_map(|p| p.vector.iter().copied()).collect();
        let vectors = FixedSizeListArray::new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.embedding_dim as i32,
            Arc::new(Float32Array::from(values)),
            None,
        );

        RecordBatch::try_new(
            schema(self.embedding_dim),
            vec![
                Arc::new(StringArray::from_iter_values(chunks().map(|c| c.chunk_id.as_str()))),
                Arc::new(StringArray::from_iter_values(chunks().map(|c| c.doc_id.as_str()))),
                Arc::new(UInt32Array::from_iter_values(chunks().map(|c| c.page_number))),
                Arc::new(UInt64Array::from_iter_values(chunks().map(|c| c.chunk_index as u64))),
                Arc::new(UInt64Array::from_iter_values(chunks().map(|c| c.start_char as u64))),
                Arc::new(UInt64Array::from_iter_values(chunks().map(|c| c.end_char as u64))),
                Arc::new(UInt64Array::from_iter_values(
                    chunks().map(|c| c.token_estimate as u64),
                )),
                Arc::new(StringArray::from_iter_values(chunks().map(|c| c.text.as_str()))),
                Arc::new(vectors),
            ],
        )
        .map_err(|e| AppError::Store(format!("Failed to create RecordBatch: {}", e)))
    }

    async fn query_rows(&self, doc_id: &str) -> AppResult<Vec<(Chunk, Vec<f32>)>> {
        let batches: Vec<RecordBatch> = self
            .table
            .query()
            .only_if(doc_filter(doc_id))
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to query table: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| AppError::Store(format!("Failed to collect rows: {}", e)))?;

        let mut rows = Vec::new();
        for batch in &batches {
            rows.extend(batch_rows(batch)?);
        }
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl VectorStore for LanceStore {
    fn backend_name(&self) -> &str {
        "lancedb"
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> AppResult<usize> {
        if points.is_empty() {
            return Ok(0);
        }
        check_dimensions(&points)?;

        let ids: Vec<String> = points
            .iter()
            .map(|p| format!("'{}'", escape(&p.chunk.chunk_id)))
            .collect();
        self.table
            .delete(&format!("chunk_id IN ({})", ids.join(", ")))
            .await
            .map_err(|e| AppError::Store(format!("Failed to replace chunks: {}", e)))?;

        let batch = self.points_to_batch(&points)?;
        let schema = batch.schema();
        self.table
            .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to add chunks: {}", e)))?;

        tracing::debug!("Inserted {} chunks into LanceDB", points.len());
        Ok(points.len())
    }

    async fn search(
        &self,
        query: &[f32],
        doc_id: &str,
        top_k: usize,
        score_threshold: Option<f32>,
    ) -> AppResult<Vec<SearchHit>> {
        if query.len() != self.embedding_dim {
            return Err(AppError::Store(format!(
                "Query embedding dimension mismatch: expected {}, got {}",
                self.embedding_dim,
                query.len()
            )));
        }

        let batches: Vec<RecordBatch> = self
            .table
            .query()
            .only_if(doc_filter(doc_id))
            .nearest_to(query.to_vec())
            .map_err(|e| AppError::Store(format!("Failed to create query: {}", e)))?
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to execute search: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| AppError::Store(format!("Failed to collect results: {}", e)))?;

        let mut rows = Vec::new();
        for batch in &batches {
            rows.extend(batch_rows(batch)?);
        }

        // LanceDB reports L2 distance; rescore as cosine similarity.
        let mut hits: Vec<SearchHit> = rows
            .into_iter()
            .map(|(chunk, vector)| SearchHit {
                score: cosine_similarity(query, &vector),
                chunk,
            })
            .filter(|hit| score_threshold.map_or(true, |t| hit.score >= t))
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn delete(&self, doc_id: &str) -> AppResult<usize> {
        let filter = doc_filter(doc_id);
        let count = self
            .table
            .count_rows(Some(filter.clone()))
            .await
            .map_err(|e| AppError::Store(format!("Failed to count rows: {}", e)))?;
        if count > 0 {
            self.table
                .delete(&filter)
                .await
                .map_err(|e| AppError::Store(format!("Failed to delete document: {}", e)))?;
        }
        Ok(count)
    }

    async fn chunks(&self, doc_id: &str) -> AppResult<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self
            .query_rows(doc_id)
            .await?
            .into_iter()
            .map(|(chunk, _)| chunk)
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn list_documents(&self) -> AppResult<Vec<String>> {
        let batches: Vec<RecordBatch> = self
            .table
            .query()
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to query table: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| AppError::Store(format!("Failed to collect rows: {}", e)))?;

        let mut ids = BTreeSet::new();
        for batch in &batches {
            let column = string_column(batch, "doc_id")?;
            for i in 0..column.len() {
                ids.insert(column.value(i).to_string());
            }
        }
        Ok(ids.into_iter().collect())
    }
}

fn schema(embedding_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("chunk_id", DataType::Utf8, false),
        Field::new("doc_id", DataType::Utf8, false),
        Field::new("page_number", DataType::UInt32, false),
        Field::new("chunk_index", DataType::UInt64, false),
        Field::new("start_char", DataType::UInt64, false),
        Field::new("end_char", DataType::UInt64, false),
        Field::new("token_estimate", DataType::UInt64, false),
        Field::new("text", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                embedding_dim as i32,
            ),
            false,
        ),
    ]))
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

fn doc_filter(doc_id: &str) -> String {
    format!("doc_id = '{}'", escape(doc_id))
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| AppError::Store(format!("Invalid {} column", name)))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a StringArray> {
    column::<StringArray>(batch, name)
}

fn batch_rows(batch: &RecordBatch) -> AppResult<Vec<(Chunk, Vec<f32>)>> {
    let chunk_ids = string_column(batch, "chunk_id")?;
    let doc_ids = string_column(batch, "doc_id")?;
    let pages = column::<UInt32Array>(batch, "page_number")?;
    let indices = column::<UInt64Array>(batch, "chunk_index")?;
    let starts = column::<UInt64Array>(batch, "start_char")?;
    let ends = column::<UInt64Array>(batch, "end_char")?;
    let tokens = column::<UInt64Array>(batch, "token_estimate")?;
    let texts = string_column(batch, "text")?;
    let vectors = column::<FixedSizeListArray>(batch, "vector")?;

    let mut rows = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let values = vectors.value(row);
        let values = values
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| AppError::Store("Invalid vector values".to_string()))?;

        rows.push((
            Chunk {
                chunk_id: chunk_ids.value(row).to_string(),
                doc_id: doc_ids.value(row).to_string(),
                page_number: pages.value(row),
                text: texts.value(row).to_string(),
                start_char: starts.value(row) as usize,
                end_char: ends.value(row) as usize,
                token_estimate: tokens.value(row) as usize,
                chunk_index: indices.value(row) as usize,
            },
            values.values().to_vec(),
        ));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::exercise_store;
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lance_store_contract() {
        let temp = TempDir::new().unwrap();
        let store = LanceStore::open(&temp.path().join("lance"), "chunks", 3)
            .await
            .unwrap();
        exercise_store(&store).await;
    }

    #[test]
    fn test_filter_escapes_quotes() {
        assert_eq!(doc_filter("o'brien"), "doc_id = 'o''brien'");
    }
}
