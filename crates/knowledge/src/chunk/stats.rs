//! Chunk statistics and sanity checks.

use crate::types::Chunk;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Aggregate figures over a chunk set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChunkStatistics {
    pub total_chunks: usize,
    pub total_chars: usize,
    pub avg_chunk_chars: f64,
    pub min_chunk_chars: usize,
    pub max_chunk_chars: usize,
    pub total_token_estimate: usize,
    pub pages_covered: usize,
}

impl ChunkStatistics {
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        if chunks.is_empty() {
            return Self::default();
        }

        let lengths: Vec<usize> = chunks.iter().map(|c| c.text.chars().count()).collect();
        let total_chars: usize = lengths.iter().sum();
        let pages: BTreeSet<u32> = chunks.iter().map(|c| c.page_number).collect();

        Self {
            total_chunks: chunks.len(),
            total_chars,
            avg_chunk_chars: total_chars as f64 / chunks.len() as f64,
            min_chunk_chars: lengths.iter().copied().min().unwrap_or(0),
            max_chunk_chars: lengths.iter().copied().max().unwrap_or(0),
            total_token_estimate: chunks.iter().map(|c| c.token_estimate).sum(),
            pages_covered: pages.len(),
        }
    }
}

/// A problem found by [`validate_chunks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkIssue {
    Empty { chunk_id: String },
    Oversized { chunk_id: String, chars: usize },
    DuplicateId { chunk_id: String },
}

impl fmt::Display for ChunkIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { chunk_id } => write!(f, "{}: empty text", chunk_id),
            Self::Oversized { chunk_id, chars } => {
                write!(f, "{}: {} characters exceeds the size limit", chunk_id, chars)
            }
            Self::DuplicateId { chunk_id } => write!(f, "{}: duplicate id", chunk_id),
        }
    }
}

/// Report empty chunks, chunks more than 20% over `max_chunk_size`, and
/// repeated ids.
pub fn validate_chunks(chunks: &[Chunk], max_chunk_size: usize) -> Vec<ChunkIssue> {
    let limit = max_chunk_size + max_chunk_size / 5;
    let mut seen = HashSet::new();
    let mut issues = Vec::new();

    for chunk in chunks {
        let chars = chunk.text.chars().count();
        if chunk.text.trim().is_empty() {
            issues.push(ChunkIssue::Empty {
                chunk_id: chunk.chunk_id.clone(),
            });
        } else if chars > limit {
            issues.push(ChunkIssue::Oversized {
                chunk_id: chunk.chunk_id.clone(),
                chars,
            });
        }
        if !seen.insert(chunk.chunk_id.as_str()) {
            issues.push(ChunkIssue::DuplicateId {
                chunk_id: chunk.chunk_id.clone(),
            });
        }
    }

    issues
}
