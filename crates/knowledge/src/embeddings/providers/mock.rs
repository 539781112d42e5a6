//! Deterministic hashing embedder for tests and offline use.

use crate::embeddings::provider::EmbeddingProvider;
use pagewise_core::AppResult;
use std::collections::HashMap;

const STOP_WORDS: &[&str] = &[
    "the", "and", "are", "was", "were", "for", "from", "with", "this", "that", "these", "those",
    "have", "has", "had", "its", "their", "they", "them", "what", "which", "how", "does", "did",
    "into", "about", "can", "will", "would", "should", "could",
];

/// Hashes words and their character trigrams onto a unit vector.
///
/// Texts sharing vocabulary land close together, so retrieval behaves
/// plausibly without a model server. Text with no usable words maps to the
/// zero vector.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
    model: String,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self::with_model(dimensions, "hash-trigram")
    }

    pub fn with_model(dimensions: usize, model: &str) -> Self {
        Self {
            dimensions: dimensions.max(1),
            model: model.to_string(),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let lower = text.to_lowercase();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        {
            *counts.entry(word).or_insert(0) += 1;
        }

        for (word, count) in counts {
            let weight = (count as f32).sqrt();
            vector[self.bucket(word.as_bytes(), 31)] += weight;

            let chars: Vec<char> = format!(" {} ", word).chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                vector[self.bucket(trigram.as_bytes(), 37)] += 0.25 * weight;
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }

    fn bucket(&self, bytes: &[u8], seed: u64) -> usize {
        let hash = bytes
            .iter()
            .fold(seed, |acc, &b| acc.wrapping_mul(seed).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_texts(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::cosine_similarity;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_unit_length_and_dimensions() {
        let provider = MockEmbedder::new(256);
        let vectors = provider
            .embed_texts(&["Osmosis moves water.".to_string(), "Cells divide.".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        for v in &vectors {
            assert_eq!(v.len(), 256);
            assert!((norm(v) - 1.0).abs() < 1e-4);
        }
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = MockEmbedder::new(128);
        let a = provider.embed_query("membrane transport").await.unwrap();
        let b = provider.embed_query("membrane transport").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let provider = MockEmbedder::new(512);
        let query = provider.embed_query("What is osmosis?").await.unwrap();
        let related = provider
            .embed_query("Osmosis is the movement of water across a membrane.")
            .await
            .unwrap();
        let unrelated = provider
            .embed_query("The French revolution began in 1789.")
            .await
            .unwrap();
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = MockEmbedder::new(32);
        let v = provider.embed_query("  ").await.unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_multibyte_text() {
        let provider = MockEmbedder::new(64);
        let v = provider
            .embed_query("Gamedex é um aplicativo 🎮 brasileiro")
            .await
            .unwrap();
        assert!((norm(&v) - 1.0).abs() < 1e-4);
    }
}
