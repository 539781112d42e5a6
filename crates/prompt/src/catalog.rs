//! Built-in prompt set with optional workspace overrides.

use crate::builder::build_prompt;
use crate::loader::{list_prompts, load_prompt, parse_prompt};
use crate::types::{BuiltPrompt, PromptDefinition};
use pagewise_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// Answer grounded in document excerpts.
pub const ANSWER_DOCUMENT: &str = "answer.document";
/// Answer from general knowledge only.
pub const ANSWER_GENERAL: &str = "answer.general";
/// Answer blending excerpts with general knowledge.
pub const ANSWER_BLENDED: &str = "answer.blended";
/// Per-chunk compression rewrite.
pub const CHUNK_COMPRESS: &str = "chunk.compress";
/// Post-hoc restructuring of an answer.
pub const ANSWER_FORMAT: &str = "answer.format";

const BUILTIN: &[(&str, &str)] = &[
    (ANSWER_DOCUMENT, include_str!("../prompts/answer.document.yml")),
    (ANSWER_GENERAL, include_str!("../prompts/answer.general.yml")),
    (ANSWER_BLENDED, include_str!("../prompts/answer.blended.yml")),
    (CHUNK_COMPRESS, include_str!("../prompts/chunk.compress.yml")),
    (ANSWER_FORMAT, include_str!("../prompts/answer.format.yml")),
];

/// Prompt definitions keyed by ID.
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    prompts: HashMap<String, PromptDefinition>,
}

impl PromptCatalog {
    /// The prompts compiled into the binary.
    pub fn builtin() -> AppResult<Self> {
        let mut prompts = HashMap::new();
        for (id, yaml) in BUILTIN {
            let definition = parse_prompt(yaml, id)?;
            prompts.insert(definition.id.clone(), definition);
        }
        Ok(Self { prompts })
    }

    /// Built-in prompts, replaced by any `.pagewise/prompts/<id>.yml` files.
    pub fn with_workspace_overrides(workspace_path: &Path) -> AppResult<Self> {
        let mut catalog = Self::builtin()?;
        for id in list_prompts(workspace_path)? {
            let definition = load_prompt(workspace_path, &id)?;
            catalog.prompts.insert(id, definition);
        }
        Ok(catalog)
    }

    /// Look up a definition.
    pub fn get(&self, id: &str) -> AppResult<&PromptDefinition> {
        self.prompts
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", id)))
    }

    /// Render a prompt by ID.
    pub fn render(&self, id: &str, variables: &HashMap<String, String>) -> AppResult<BuiltPrompt> {
        build_prompt(self.get(id)?, variables)
    }

    /// All known prompt IDs, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.prompts.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
