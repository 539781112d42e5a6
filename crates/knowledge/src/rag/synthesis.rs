//! Prompt construction and generation calls.

use crate::config::SynthesisConfig;
use crate::types::{AnswerStrategy, ChatTurn, RetrievedChunk};
use futures::future::join_all;
use pagewise_core::{AppError, AppResult};
use pagewise_llm::{LlmClient, LlmRequest};
use pagewise_prompt::{
    BuiltPrompt, PromptCatalog, ANSWER_BLENDED, ANSWER_DOCUMENT, ANSWER_FORMAT, ANSWER_GENERAL,
    CHUNK_COMPRESS,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Closing sentence required on general-knowledge answers.
pub const EXTERNAL_DISCLOSURE: &str = "Note: This information was not found in the uploaded document. It has been answered using general knowledge sources.";

/// Section headings whose joint presence means an answer is already structured.
const STRUCTURE_MARKERS: [&str; 2] = ["## Definition", "## Sources"];

/// Drives every generation call made while answering one question.
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptCatalog>,
    config: SynthesisConfig,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptCatalog>, config: SynthesisConfig) -> Self {
        Self {
            llm,
            prompts,
            config,
        }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Produce the raw answer for `strategy`.
    ///
    /// Only the main generation call can fail the request; compression
    /// failures fall back to the chunk's own text.
    pub async fn generate(
        &self,
        strategy: AnswerStrategy,
        question: &str,
        chunks: &[RetrievedChunk],
        history: &[ChatTurn],
        wants_table: bool,
        temperature: Option<f32>,
    ) -> AppResult<String> {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("history".to_string(), render_history(history, self.config.history_turns));
        vars.insert(
            "table".to_string(),
            if wants_table { "yes" } else { "" }.to_string(),
        );

        let prompt_id = match strategy {
            AnswerStrategy::PdfOnly => ANSWER_DOCUMENT,
            AnswerStrategy::Mixed => ANSWER_BLENDED,
            AnswerStrategy::ExternalOnly => ANSWER_GENERAL,
        };

        if strategy.uses_document() {
            let texts = self.compress_all(chunks).await;
            vars.insert("excerpts".to_string(), render_excerpts(chunks, &texts));
        } else {
            vars.insert("disclosure".to_string(), EXTERNAL_DISCLOSURE.to_string());
        }

        let prompt = self
            .prompts
            .render(prompt_id, &vars)
            .map_err(|e| AppError::GenerationFailed(e.to_string()))?;

        let request = self
            .request(&prompt)
            .with_temperature(temperature.unwrap_or(self.config.temperature))
            .with_top_p(self.config.top_p)
            .with_max_tokens(self.config.max_tokens.max(2000));

        tracing::debug!(
            strategy = %strategy,
            prompt = prompt_id,
            prompt_chars = prompt.user.len(),
            "Generating answer"
        );

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| AppError::GenerationFailed(e.to_string()))?;

        if response.content.trim().is_empty() {
            return Err(AppError::GenerationFailed(
                "model returned an empty answer".to_string(),
            ));
        }
        Ok(response.content)
    }

    /// Compressed text for each chunk, in chunk order.
    ///
    /// Calls run concurrently; any chunk whose call fails or comes back empty
    /// keeps its original text.
    pub async fn compress_all(&self, chunks: &[RetrievedChunk]) -> Vec<String> {
        if !self.config.compress_chunks {
            return chunks.iter().map(|c| c.text().to_string()).collect();
        }

        join_all(chunks.iter().map(|chunk| async move {
            match self.compress(chunk).await {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(
                        kind = err.kind(),
                        chunk_id = %chunk.chunk.chunk_id,
                        page = chunk.page_number(),
                        error = %err,
                        "Using uncompressed chunk text"
                    );
                    chunk.text().to_string()
                }
            }
        }))
        .await
    }

    async fn compress(&self, chunk: &RetrievedChunk) -> AppResult<String> {
        let mut vars = HashMap::new();
        vars.insert("text".to_string(), chunk.text().to_string());

        let prompt = self
            .prompts
            .render(CHUNK_COMPRESS, &vars)
            .map_err(|e| AppError::CompressionFailed(e.to_string()))?;
        let request = self
            .request(&prompt)
            .with_temperature(self.config.compression_temperature)
            .with_max_tokens(self.config.compression_max_tokens);

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| AppError::CompressionFailed(e.to_string()))?;

        let text = response.content.trim();
        if text.is_empty() {
            return Err(AppError::CompressionFailed("empty rewrite".to_string()));
        }
        Ok(text.to_string())
    }

    /// Restructure an answer that is missing the standard sections.
    ///
    /// Returns the input unchanged when formatting is disabled, not needed, or
    /// fails.
    pub async fn format_answer(&self, question: &str, answer: String) -> String {
        if !self.config.smart_formatting || is_structured(&answer) {
            return answer;
        }

        match self.reformat(question, &answer).await {
            Ok(formatted) => formatted,
            Err(err) => {
                tracing::warn!(kind = err.kind(), error = %err, "Keeping unformatted answer");
                answer
            }
        }
    }

    async fn reformat(&self, question: &str, answer: &str) -> AppResult<String> {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("answer".to_string(), answer.to_string());

        let prompt = self
            .prompts
            .render(ANSWER_FORMAT, &vars)
            .map_err(|e| AppError::FormattingFailed(e.to_string()))?;
        let request = self
            .request(&prompt)
            .with_temperature(self.config.formatting_temperature)
            .with_max_tokens(self.config.formatting_max_tokens);

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| AppError::FormattingFailed(e.to_string()))?;

        if response.content.trim().is_empty() {
            return Err(AppError::FormattingFailed("empty rewrite".to_string()));
        }
        Ok(response.content)
    }

    fn request(&self, prompt: &BuiltPrompt) -> LlmRequest {
        let request = LlmRequest::new(prompt.user.clone(), self.config.model.clone());
        match &prompt.system {
            Some(system) if !system.trim().is_empty() => request.with_system(system.clone()),
            _ => request,
        }
    }
}

fn is_structured(answer: &str) -> bool {
    STRUCTURE_MARKERS.iter().all(|marker| answer.contains(marker))
}

/// Page-tagged excerpt block; `texts[i]` replaces the text of `chunks[i]`.
pub fn render_excerpts(chunks: &[RetrievedChunk], texts: &[String]) -> String {
    chunks
        .iter()
        .zip(texts)
        .map(|(chunk, text)| format!("From the document (Page {}):\n{}", chunk.page_number(), text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The most recent `max_turns` turns as `Role: text` lines.
pub fn render_history(history: &[ChatTurn], max_turns: usize) -> String {
    let start = history.len().saturating_sub(max_turns);
    history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}
