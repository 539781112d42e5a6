//! Document question answering for pagewise.
//!
//! Ingestion splits extracted pages into overlapping chunks, embeds them and
//! writes them to a vector store. Answering retrieves the closest chunks for a
//! question, decides how far the document can ground the answer, generates it,
//! and then corrects and scores the result without further model calls.
//!
//! Collaborators (embedder, vector store, LLM) are trait objects injected
//! through [`Services`] or constructed directly.

pub mod chunk;
pub mod config;
pub mod embeddings;
pub mod ingest;
pub mod rag;
pub mod retrieval;
pub mod services;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use chunk::{validate_chunks, ChunkIssue, ChunkStatistics, SemanticChunker};
pub use config::{load_config, save_config, RagConfig};
pub use embeddings::{create_embedder, EmbeddingProvider, MockEmbedder};
pub use ingest::{DocumentSource, IngestReport, Ingestor, PlainTextSource};
pub use rag::{AskOptions, QaPipeline, Synthesizer};
pub use retrieval::Retriever;
pub use services::{LazyHandle, Services};
pub use store::{create_store, VectorStore};
pub use types::{
    AnswerResult, AnswerStrategy, ChatTurn, Chunk, Citation, DocumentInfo, Page, RetrievedChunk,
    Role, UsedChunk,
};

pub use pagewise_core::{AppError, AppResult};
