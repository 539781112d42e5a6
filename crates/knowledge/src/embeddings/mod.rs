//! Text embedding providers.
//!
//! Chunks are embedded at ingest time and queries at answer time; both must go
//! through the same provider and model or similarity scores are meaningless.

pub mod provider;
pub mod providers;

pub use provider::{create_embedder, EmbeddingProvider};
pub use providers::mock::MockEmbedder;
pub use providers::ollama::OllamaEmbedder;
