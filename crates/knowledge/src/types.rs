//! Domain types shared across chunking, retrieval and answering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One page of extracted document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

impl Page {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// A page-attributed slice of document text; the unit of retrieval.
///
/// Offsets are character positions within the page text, `start_char < end_char`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub doc_id: String,
    pub page_number: u32,
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
    pub token_estimate: usize,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
}

impl Chunk {
    /// Deterministic chunk identifier.
    pub fn make_id(doc_id: &str, index: usize) -> String {
        format!("{}_chunk_{:04}", doc_id, index)
    }
}

/// A chunk returned for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub similarity_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_score: Option<f32>,
}

impl RetrievedChunk {
    pub fn new(chunk: Chunk, similarity_score: f32) -> Self {
        Self {
            chunk,
            similarity_score,
            rank_score: None,
        }
    }

    pub fn page_number(&self) -> u32 {
        self.chunk.page_number
    }

    pub fn text(&self) -> &str {
        &self.chunk.text
    }
}

/// How an answer is grounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStrategy {
    /// Grounded entirely in document excerpts.
    PdfOnly,
    /// No usable document evidence; general knowledge only.
    ExternalOnly,
    /// Partial document evidence blended with general knowledge.
    Mixed,
}

impl AnswerStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PdfOnly => "pdf_only",
            Self::ExternalOnly => "external_only",
            Self::Mixed => "mixed",
        }
    }

    /// Whether document excerpts are part of the prompt.
    pub fn uses_document(&self) -> bool {
        !matches!(self, Self::ExternalOnly)
    }
}

impl fmt::Display for AnswerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speaker of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One prior message supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// A page reference backing part of an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub page_number: u32,
    pub chunk_id: String,
    pub snippet: String,
    pub similarity_score: f32,
}

/// Summary of a chunk that fed the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsedChunk {
    pub chunk_id: String,
    pub page_number: u32,
    pub similarity_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_score: Option<f32>,
    pub preview: String,
}

/// Final answer returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub doc_id: String,
    pub answer_text: String,
    pub sources: Vec<String>,
    pub citations: Vec<Citation>,
    pub follow_up: String,
    pub confidence: f32,
    pub strategy: AnswerStrategy,
    pub used_chunks: Vec<UsedChunk>,
}

/// Stored metadata for one ingested document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub doc_id: String,
    pub chunk_count: usize,
    pub page_count: usize,
    pub total_chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
