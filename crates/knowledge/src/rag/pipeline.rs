//! The per-question answer pipeline.

use super::postprocess;
use super::strategy::{is_comparison_question, select_strategy};
use super::synthesis::Synthesizer;
use crate::config::RagConfig;
use crate::retrieval::Retriever;
use crate::types::{AnswerResult, AnswerStrategy, ChatTurn, RetrievedChunk};
use pagewise_core::AppResult;
use tracing::Instrument;
use uuid::Uuid;

/// Per-request overrides of the configured retrieval and generation settings.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub top_k: Option<usize>,
    pub final_k: Option<usize>,
    pub rerank: Option<bool>,
    pub temperature: Option<f32>,
    /// Neighbouring chunks merged into each excerpt before synthesis;
    /// `None` uses the configured window.
    pub context_window: Option<usize>,
}

/// Retriever, strategist, synthesizer and post-processor wired together.
///
/// Holds no per-request state, so one instance serves concurrent questions.
pub struct QaPipeline {
    retriever: Retriever,
    synthesizer: Synthesizer,
    config: RagConfig,
}

impl QaPipeline {
    pub fn new(retriever: Retriever, synthesizer: Synthesizer, config: RagConfig) -> Self {
        Self {
            retriever,
            synthesizer,
            config,
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    /// Answer `question` against document `doc_id`.
    ///
    /// Fails only with `RetrievalFailed` or `GenerationFailed`; every other
    /// stage degrades to its unmodified input.
    pub async fn answer(
        &self,
        doc_id: &str,
        question: &str,
        history: &[ChatTurn],
        options: AskOptions,
    ) -> AppResult<AnswerResult> {
        let span = tracing::info_span!("answer", request_id = %Uuid::new_v4(), doc_id);
        self.run(doc_id, question, history, options)
            .instrument(span)
            .await
            .inspect_err(|e| tracing::error!(kind = e.kind(), error = %e, "Question failed"))
    }

    async fn run(
        &self,
        doc_id: &str,
        question: &str,
        history: &[ChatTurn],
        options: AskOptions,
    ) -> AppResult<AnswerResult> {
        let retrieval = &self.config.retrieval;
        let top_k = options.top_k.unwrap_or(retrieval.top_k);
        let final_k = options.final_k.unwrap_or(retrieval.final_k);
        let rerank = options.rerank.unwrap_or(retrieval.rerank);

        let mut chunks = self
            .retriever
            .retrieve(question, doc_id, top_k, final_k, rerank)
            .await?;

        let strategy = select_strategy(&chunks, &self.config.strategy);
        let wants_table = is_comparison_question(question);
        tracing::info!(
            strategy = %strategy,
            chunks = chunks.len(),
            table = wants_table,
            "Selected answer strategy"
        );

        if !strategy.uses_document() {
            chunks.clear();
        } else {
            let window = options.context_window.unwrap_or(retrieval.context_window);
            if window > 0 {
                chunks = self.retriever.expand_context(&chunks, window).await;
            }
        }

        let raw = self
            .synthesizer
            .generate(
                strategy,
                question,
                &chunks,
                history,
                wants_table,
                options.temperature,
            )
            .await?;

        let formatted = self.synthesizer.format_answer(question, raw).await;
        Ok(self.finish(doc_id, strategy, formatted, &chunks))
    }

    fn finish(
        &self,
        doc_id: &str,
        strategy: AnswerStrategy,
        answer: String,
        chunks: &[RetrievedChunk],
    ) -> AnswerResult {
        let synthesis = self.synthesizer.config();

        let answer_text = postprocess::correct_sources(&answer, strategy, chunks);
        let citations = if strategy.uses_document() {
            postprocess::extract_citations(&answer_text, chunks, synthesis.snippet_max_chars)
        } else {
            Vec::new()
        };
        let follow_up = postprocess::extract_follow_up(&answer_text);
        let confidence = postprocess::confidence(strategy, chunks);

        tracing::info!(
            confidence,
            citations = citations.len(),
            answer_chars = answer_text.len(),
            "Answer ready"
        );

        AnswerResult {
            doc_id: doc_id.to_string(),
            sources: postprocess::source_list(strategy, chunks),
            citations,
            follow_up,
            confidence,
            strategy,
            used_chunks: postprocess::used_chunks(strategy, chunks, synthesis.used_chunk_preview_chars),
            answer_text,
        }
    }
}
