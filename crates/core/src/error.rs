//! Error types shared by every pagewise crate.
//!
//! Besides the usual configuration/I/O/provider categories, the enum carries the
//! request-level taxonomy used by the answer pipeline. Only `RetrievalFailed` and
//! `GenerationFailed` ever abort a question; the compression and formatting
//! variants are produced and absorbed inside the pipeline so they can be logged
//! with a stable tag.

use thiserror::Error;

/// Text shown to end users when a question cannot be answered.
pub const USER_FACING_FAILURE: &str =
    "Something went wrong while answering your question. Please try again later.";

/// Unified error type for pagewise.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generation provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector store errors
    #[error("Vector store error: {0}")]
    Store(String),

    /// Chunking, ingestion and document management errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Query embedding or vector search failed; fatal for the request.
    #[error("Retrieval failed: {0}")]
    RetrievalFailed(String),

    /// Main answer generation failed; fatal for the request.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// A chunk could not be compressed; the original text is used instead.
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    /// The reformatting pass failed; the unformatted answer is used instead.
    #[error("Formatting failed: {0}")]
    FormattingFailed(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Stable tag for logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Llm(_) => "llm",
            AppError::Embedding(_) => "embedding",
            AppError::Store(_) => "store",
            AppError::Knowledge(_) => "knowledge",
            AppError::Prompt(_) => "prompt",
            AppError::Serialization(_) => "serialization",
            AppError::RetrievalFailed(_) => "retrieval_failed",
            AppError::GenerationFailed(_) => "generation_failed",
            AppError::CompressionFailed(_) => "compression_failed",
            AppError::FormattingFailed(_) => "formatting_failed",
            AppError::Other(_) => "other",
        }
    }

    /// Whether a pipeline stage can continue with its unmodified input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::CompressionFailed(_) | AppError::FormattingFailed(_)
        )
    }

    /// Message safe to show to whoever asked the question.
    ///
    /// Request failures collapse into one opaque sentence. Operator-facing
    /// errors (bad config, unreadable files) keep their description.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(_) | AppError::Io(_) => self.to_string(),
            _ => USER_FACING_FAILURE.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failures_are_opaque() {
        let err = AppError::RetrievalFailed("connection refused at 10.0.0.3:6333".to_string());
        assert_eq!(err.kind(), "retrieval_failed");
        assert_eq!(err.user_message(), USER_FACING_FAILURE);
        assert!(!err.user_message().contains("10.0.0.3"));

        let err = AppError::GenerationFailed("model not found".to_string());
        assert_eq!(err.kind(), "generation_failed");
        assert_eq!(err.user_message(), USER_FACING_FAILURE);
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(AppError::CompressionFailed("x".into()).is_recoverable());
        assert!(AppError::FormattingFailed("x".into()).is_recoverable());
        assert!(!AppError::GenerationFailed("x".into()).is_recoverable());
    }

    #[test]
    fn test_config_errors_keep_detail() {
        let err = AppError::Config("unknown store backend: redis".to_string());
        assert!(err.user_message().contains("redis"));
    }
}
