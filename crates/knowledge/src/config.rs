//! Retrieval and answer tuning parameters.
//!
//! Stored in `.pagewise/rag.yaml`. Every field has a default, so a partial file
//! only overrides what it names.

use pagewise_core::config::DATA_DIR;
use pagewise_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// All tuning sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub strategy: StrategyConfig,
    pub synthesis: SynthesisConfig,
}

/// Chunk size bounds, in characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
    pub overlap_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 800,
            min_chunk_size: 200,
            overlap_size: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates fetched from the vector store.
    pub top_k: usize,
    /// Candidates kept after re-ranking.
    pub final_k: usize,
    pub rerank: bool,
    /// Chunk length that gets the full length score.
    pub ideal_chunk_length: usize,
    /// Neighbouring chunks merged into each excerpt before synthesis; 0 disables.
    pub context_window: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            final_k: 5,
            rerank: true,
            ideal_chunk_length: 400,
            context_window: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub similarity_threshold: f32,
    pub min_chunks_required: usize,
    pub min_coverage_chars: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            min_chunks_required: 1,
            min_coverage_chars: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Model used for every generation call; empty means the LLM settings' model.
    pub model: String,
    pub temperature: f32,
    /// Lower bound on the main answer's token budget.
    pub max_tokens: u32,
    pub top_p: f32,
    /// Transcript turns included in the prompt.
    pub history_turns: usize,
    pub compress_chunks: bool,
    pub compression_temperature: f32,
    pub compression_max_tokens: u32,
    pub smart_formatting: bool,
    pub formatting_temperature: f32,
    pub formatting_max_tokens: u32,
    pub snippet_max_chars: usize,
    pub used_chunk_preview_chars: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.1,
            max_tokens: 2000,
            top_p: 0.9,
            history_turns: 10,
            compress_chunks: true,
            compression_temperature: 0.1,
            compression_max_tokens: 500,
            smart_formatting: true,
            formatting_temperature: 0.1,
            formatting_max_tokens: 1500,
            snippet_max_chars: 150,
            used_chunk_preview_chars: 200,
        }
    }
}

impl RagConfig {
    /// Check cross-field constraints.
    pub fn validate(&self) -> AppResult<()> {
        let c = &self.chunking;
        if c.max_chunk_size == 0 || c.min_chunk_size > c.max_chunk_size {
            return Err(AppError::Config(format!(
                "chunking: need 0 < min_chunk_size ({}) <= max_chunk_size ({})",
                c.min_chunk_size, c.max_chunk_size
            )));
        }
        if c.overlap_size >= c.max_chunk_size {
            return Err(AppError::Config(format!(
                "chunking: overlap_size ({}) must be smaller than max_chunk_size ({})",
                c.overlap_size, c.max_chunk_size
            )));
        }

        let r = &self.retrieval;
        if r.top_k == 0 || r.final_k == 0 || r.final_k > r.top_k {
            return Err(AppError::Config(format!(
                "retrieval: need 0 < final_k ({}) <= top_k ({})",
                r.final_k, r.top_k
            )));
        }
        if r.ideal_chunk_length == 0 {
            return Err(AppError::Config(
                "retrieval: ideal_chunk_length must be positive".to_string(),
            ));
        }

        let s = &self.strategy;
        if !(s.similarity_threshold > 0.0 && s.similarity_threshold <= 1.0) {
            return Err(AppError::Config(format!(
                "strategy: similarity_threshold ({}) must be in (0, 1]",
                s.similarity_threshold
            )));
        }
        if s.min_chunks_required == 0 {
            return Err(AppError::Config(
                "strategy: min_chunks_required must be at least 1".to_string(),
            ));
        }

        if self.synthesis.snippet_max_chars < 10 {
            return Err(AppError::Config(
                "synthesis: snippet_max_chars must be at least 10".to_string(),
            ));
        }

        Ok(())
    }
}

/// Path of the tuning file inside a workspace.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(DATA_DIR).join("rag.yaml")
}

/// Load `rag.yaml`, or defaults when the file does not exist.
pub fn load_config(workspace: &Path) -> AppResult<RagConfig> {
    let config_path = get_config_path(workspace);

    let config = if config_path.exists() {
        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read {:?}: {}", config_path, e))
        })?;

        let config: RagConfig = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse {:?}: {}", config_path, e))
        })?;

        tracing::debug!("Loaded RAG config from {:?}", config_path);
        config
    } else {
        tracing::debug!("No {:?}; using default RAG config", config_path);
        RagConfig::default()
    };

    config.validate()?;
    Ok(config)
}

/// Write `rag.yaml`.
pub fn save_config(workspace: &Path, config: &RagConfig) -> AppResult<()> {
    config.validate()?;
    let config_path = get_config_path(workspace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let yaml = serde_yaml::to_string(config)?;
    fs::write(&config_path, yaml)?;

    tracing::debug!("Saved RAG config to {:?}", config_path);
    Ok(())
}
