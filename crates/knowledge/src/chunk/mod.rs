//! Page-aware document chunking.

pub mod chunker;
pub mod sentences;
pub mod stats;

pub use chunker::SemanticChunker;
pub use sentences::{PunctuationSplitter, Segment, SentenceSplitter};
pub use stats::{validate_chunks, ChunkIssue, ChunkStatistics};
