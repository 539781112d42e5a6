//! Rendering prompt definitions with Handlebars.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use handlebars::Handlebars;
use pagewise_core::{AppError, AppResult};
use std::collections::HashMap;

/// Render a definition's system and user templates.
///
/// Empty variables are falsy inside `{{#if}}` blocks, so optional sections are
/// switched off by passing an empty string.
///
/// # Example
/// ```no_run
/// use pagewise_prompt::{build_prompt, PromptCatalog, ANSWER_GENERAL};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = PromptCatalog::builtin()?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What is entropy?".to_string());
///
/// let built = build_prompt(catalog.get(ANSWER_GENERAL)?, &vars)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: &HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let user = render_template(&definition.template, variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, variables))
        .transpose()?;

    let mut resolved_variables: Vec<String> = variables
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, _)| key.clone())
        .collect();
    resolved_variables.sort();

    Ok(BuiltPrompt {
        system,
        user: user.trim().to_string(),
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            generation: definition.generation,
            resolved_variables,
        },
    })
}

fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Prompts are plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
