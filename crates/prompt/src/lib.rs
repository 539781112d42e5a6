//! Prompt templates for pagewise.
//!
//! - YAML prompt definitions compiled into the binary
//! - Per-workspace overrides under `.pagewise/prompts/`
//! - Handlebars rendering

pub mod builder;
pub mod catalog;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use catalog::{
    PromptCatalog, ANSWER_BLENDED, ANSWER_DOCUMENT, ANSWER_FORMAT, ANSWER_GENERAL,
    CHUNK_COMPRESS,
};
pub use loader::{list_prompts, load_prompt, parse_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, GenerationHints, PromptDefinition};
