//! Prompt definitions and rendered prompts.

use serde::{Deserialize, Serialize};

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier (e.g., "answer.document")
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Optional system template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// User template with Handlebars syntax
    pub template: String,

    /// Suggested sampling settings for this prompt
    #[serde(default)]
    pub generation: GenerationHints,
}

/// Sampling settings a prompt was written for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(rename = "maxTokens", default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A rendered prompt ready for a generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered system message
    pub system: Option<String>,

    /// Rendered user message
    pub user: String,

    /// Where the prompt came from
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a rendered prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Sampling hints copied from the definition
    pub generation: GenerationHints,

    /// Names of the non-empty variables used while rendering
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: Vec<String>,
}
