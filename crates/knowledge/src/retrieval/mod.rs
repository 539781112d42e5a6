//! Query-time chunk retrieval and re-ranking.

pub mod retriever;
pub mod scoring;

pub use retriever::Retriever;
pub use scoring::{extract_keywords, rerank, RankSignals};
