//! Fixtures shared by the crate-level tests.

use crate::config::RagConfig;
use crate::embeddings::EmbeddingProvider;
use crate::ingest::Ingestor;
use crate::rag::{QaPipeline, Synthesizer};
use crate::retrieval::Retriever;
use crate::store::{MemoryStore, SearchHit, VectorPoint, VectorStore};
use crate::chunk::SemanticChunker;
use crate::types::{Chunk, Page};
use pagewise_core::{AppError, AppResult};
use pagewise_llm::MockLlmClient;
use pagewise_prompt::PromptCatalog;
use std::sync::Arc;

pub const TOPICS: &[&str] = &[
    "osmosis",
    "diffusion",
    "membrane",
    "photosynthesis",
    "chlorophyll",
    "mitochondria",
];

/// One axis per entry of [`TOPICS`] plus a background axis.
///
/// A text's vector counts topic words; text with no topic word points along
/// the background axis only, orthogonal to every topical text. Similarities
/// are therefore predictable from the words used.
#[derive(Debug, Default)]
pub struct TopicEmbedder;

impl TopicEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector = vec![0.0f32; TOPICS.len() + 1];
        for word in lower.split(|c: char| !c.is_alphanumeric()) {
            if let Some(axis) = TOPICS.iter().position(|t| word == *t) {
                vector[axis + 1] += 1.0;
            }
        }
        if vector.iter().all(|v| *v == 0.0) {
            vector[0] = 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        vector.iter().map(|v| v / norm).collect()
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TopicEmbedder {
    fn provider_name(&self) -> &str {
        "topic"
    }

    fn model_name(&self) -> &str {
        "topic-axes"
    }

    fn dimensions(&self) -> usize {
        TOPICS.len() + 1
    }

    async fn embed_texts(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

#[derive(Debug)]
pub struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn provider_name(&self) -> &str {
        "failing"
    }

    fn model_name(&self) -> &str {
        "none"
    }

    fn dimensions(&self) -> usize {
        TOPICS.len() + 1
    }

    async fn embed_texts(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::Embedding("connection refused".to_string()))
    }
}

/// Store whose reads fail.
pub struct UnreachableStore;

#[async_trait::async_trait]
impl VectorStore for UnreachableStore {
    fn backend_name(&self) -> &str {
        "unreachable"
    }

    async fn upsert(&self, _points: Vec<VectorPoint>) -> AppResult<usize> {
        Err(AppError::Store("unreachable".to_string()))
    }

    async fn search(
        &self,
        _query: &[f32],
        _doc_id: &str,
        _top_k: usize,
        _score_threshold: Option<f32>,
    ) -> AppResult<Vec<SearchHit>> {
        Err(AppError::Store("unreachable".to_string()))
    }

    async fn delete(&self, _doc_id: &str) -> AppResult<usize> {
        Err(AppError::Store("unreachable".to_string()))
    }

    async fn chunks(&self, _doc_id: &str) -> AppResult<Vec<Chunk>> {
        Err(AppError::Store("unreachable".to_string()))
    }

    async fn list_documents(&self) -> AppResult<Vec<String>> {
        Err(AppError::Store("unreachable".to_string()))
    }
}

/// Three pages on osmosis and diffusion; each becomes one chunk.
pub fn biology_pages() -> Vec<Page> {
    vec![
        Page::new(
            1,
            "Osmosis is the movement of water across a membrane. Osmosis needs no energy \
             from the cell ALPHAMARK.",
        ),
        Page::new(
            2,
            "Diffusion spreads particles from high to low concentration. Diffusion happens \
             in gases and liquids BETAMARK.",
        ),
        Page::new(
            3,
            "Osmosis is a special case of diffusion. Both depend on a concentration \
             gradient across the membrane GAMMAMARK.",
        ),
    ]
}

/// Ingest `pages` as `doc_id` into a fresh memory store.
pub async fn seeded_store(doc_id: &str, pages: &[Page]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(
        SemanticChunker::new(RagConfig::default().chunking),
        Arc::new(TopicEmbedder),
        store.clone(),
        8,
    );
    ingestor.ingest(doc_id, pages).await.unwrap();
    store
}

pub fn pipeline_with(
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    llm: Arc<MockLlmClient>,
    config: RagConfig,
) -> QaPipeline {
    let retriever = Retriever::new(embedder, store, config.retrieval.clone());
    let synthesizer = Synthesizer::new(
        llm,
        Arc::new(PromptCatalog::builtin().unwrap()),
        config.synthesis.clone(),
    );
    QaPipeline::new(retriever, synthesizer, config)
}

pub fn pipeline(store: Arc<dyn VectorStore>, llm: Arc<MockLlmClient>) -> QaPipeline {
    pipeline_with(Arc::new(TopicEmbedder), store, llm, RagConfig::default())
}
