//! JSON Lines store: one file per document under the store directory.
//!
//! Each line is a serialized [`VectorPoint`]. Writes rewrite the document's
//! file through a temporary file and a rename. Filesystem work runs on the
//! blocking pool.

use super::{check_dimensions, rank_points, summarize, SearchHit, VectorPoint, VectorStore};
use crate::types::{Chunk, DocumentInfo};
use chrono::{DateTime, Utc};
use pagewise_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, doc_id: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl", encode_file_stem(doc_id)))
    }

    async fn load(&self, doc_id: &str) -> AppResult<Vec<VectorPoint>> {
        let path = self.document_path(doc_id);
        blocking(move || read_points(&path)).await
    }
}

#[async_trait::async_trait]
impl VectorStore for FileStore {
    fn backend_name(&self) -> &str {
        "file"
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> AppResult<usize> {
        check_dimensions(&points)?;
        let count = points.len();

        let mut by_doc: BTreeMap<String, Vec<VectorPoint>> = BTreeMap::new();
        for point in points {
            by_doc.entry(point.chunk.doc_id.clone()).or_default().push(point);
        }

        let _guard = self.write_lock.lock().await;
        for (doc_id, new_points) in by_doc {
            let path = self.document_path(&doc_id);
            blocking(move || {
                let mut merged: BTreeMap<String, VectorPoint> = read_points(&path)?
                    .into_iter()
                    .map(|p| (p.chunk.chunk_id.clone(), p))
                    .collect();
                for point in new_points {
                    merged.insert(point.chunk.chunk_id.clone(), point);
                }
                let mut ordered: Vec<VectorPoint> = merged.into_values().collect();
                ordered.sort_by_key(|p| p.chunk.chunk_index);
                write_points(&path, &ordered)
            })
            .await?;
            tracing::debug!(doc_id = %doc_id, "Wrote document to file store");
        }

        Ok(count)
    }

    async fn search(
        &self,
        query: &[f32],
        doc_id: &str,
        top_k: usize,
        score_threshold: Option<f32>,
    ) -> AppResult<Vec<SearchHit>> {
        let points = self.load(doc_id).await?;
        Ok(rank_points(query, &points, top_k, score_threshold))
    }

    async fn delete(&self, doc_id: &str) -> AppResult<usize> {
        let _guard = self.write_lock.lock().await;
        let path = self.document_path(doc_id);
        blocking(move || {
            let count = read_points(&path)?.len();
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    AppError::Store(format!("Failed to delete {:?}: {}", path, e))
                })?;
            }
            Ok(count)
        })
        .await
    }

    async fn chunks(&self, doc_id: &str) -> AppResult<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self.load(doc_id).await?.into_iter().map(|p| p.chunk).collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn list_documents(&self) -> AppResult<Vec<String>> {
        let root = self.root.clone();
        blocking(move || {
            if !root.exists() {
                return Ok(Vec::new());
            }
            let mut ids = Vec::new();
            for entry in fs::read_dir(&root)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                    continue;
                }
                if let Some(point) = read_points(&path)?.into_iter().next() {
                    ids.push(point.chunk.doc_id);
                }
            }
            ids.sort();
            Ok(ids)
        })
        .await
    }

    async fn get_info(&self, doc_id: &str) -> AppResult<Option<DocumentInfo>> {
        let path = self.document_path(doc_id);
        let updated_at = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        let chunks = self.chunks(doc_id).await?;
        Ok(summarize(doc_id, &chunks, updated_at))
    }
}

async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Store(format!("Store task failed: {}", e)))?
}

fn read_points(path: &Path) -> AppResult<Vec<VectorPoint>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .map_err(|e| AppError::Store(format!("Failed to open {:?}: {}", path, e)))?;
    let mut points = Vec::new();

    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            AppError::Store(format!("Failed to read line {} of {:?}: {}", line_num + 1, path, e))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let point: VectorPoint = serde_json::from_str(&line).map_err(|e| {
            AppError::Store(format!(
                "Failed to parse line {} of {:?}: {}",
                line_num + 1,
                path,
                e
            ))
        })?;
        points.push(point);
    }

    Ok(points)
}

fn write_points(path: &Path, points: &[VectorPoint]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("jsonl.tmp");
    {
        let file = File::create(&tmp)
            .map_err(|e| AppError::Store(format!("Failed to create {:?}: {}", tmp, e)))?;
        let mut writer = BufWriter::new(file);
        for point in points {
            serde_json::to_writer(&mut writer, point)?;
            writer.write_all(b"\n")?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| AppError::Store(format!("Failed to flush {:?}: {}", tmp, e)))?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
        .map_err(|e| AppError::Store(format!("Failed to replace {:?}: {}", path, e)))?;
    Ok(())
}

/// File-safe stem for a document id. Bytes outside `[A-Za-z0-9_-]` are
/// percent-encoded.
fn encode_file_stem(doc_id: &str) -> String {
    let mut out = String::with_capacity(doc_id.len());
    for b in doc_id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}
