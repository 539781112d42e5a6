//! Embedding provider trait and factory.

use super::providers::{mock::MockEmbedder, ollama::OllamaEmbedder};
use pagewise_core::config::EmbeddingSettings;
use pagewise_core::{AppError, AppResult};
use std::sync::Arc;

/// Turns text into fixed-length vectors.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g. "mock", "ollama").
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Embed several texts, preserving order.
    async fn embed_texts(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Embed a single query.
    async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_texts(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider from settings.
pub fn create_embedder(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "mock" => Ok(Arc::new(MockEmbedder::with_model(
            settings.dimensions,
            &settings.model,
        ))),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(settings)?)),
        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: provider.to_string(),
            model: "test-model".to_string(),
            dimensions: 64,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_mock_embedder() {
        let provider = create_embedder(&settings("mock")).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "test-model");
        assert_eq!(provider.dimensions(), 64);
    }

    #[test]
    fn test_create_ollama_does_not_connect() {
        let provider = create_embedder(&settings("ollama")).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
    }

    #[test]
    fn test_create_unknown_provider() {
        let err = create_embedder(&settings("word2vec")).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_embed_query_uses_batch() {
        let provider = create_embedder(&settings("mock")).unwrap();
        let single = provider.embed_query("osmosis").await.unwrap();
        let batch = provider
            .embed_texts(&["osmosis".to_string()])
            .await
            .unwrap();
        assert_eq!(single, batch[0]);
    }
}
