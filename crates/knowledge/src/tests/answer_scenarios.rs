//! End-to-end question answering over an ingested document.

use super::support::{
    biology_pages, pipeline, pipeline_with, seeded_store, FailingEmbedder, TopicEmbedder,
    UnreachableStore,
};
use crate::config::RagConfig;
use crate::rag::synthesis::EXTERNAL_DISCLOSURE;
use crate::rag::AskOptions;
use crate::types::{AnswerStrategy, ChatTurn};
use pagewise_core::error::USER_FACING_FAILURE;
use pagewise_llm::{LlmRequest, MockLlmClient};
use std::sync::Arc;

const MAIN_DOCUMENT_MARKER: &str = "Answer using the structure";

const STRUCTURED_ANSWER: &str = "## Definition\nOsmosis is the diffusion of water [p.1].\n\n\
## Explanation\nDiffusion moves particles down a gradient [p.2]. Osmosis is a special case [p.3].\n\n\
## Table\n| | Osmosis | Diffusion |\n|---|---|---|\n| Moves | water | any particle |\n\n\
## Follow-up Question\nWould you like to see an experiment?\n\n\
## Sources\nPages 1, 2, 99";

fn main_request(llm: &MockLlmClient) -> LlmRequest {
    llm.requests()
        .into_iter()
        .find(|r| r.prompt.contains("Question:"))
        .expect("main generation request")
}

fn scripted_llm() -> MockLlmClient {
    MockLlmClient::new("unused")
        .when_contains(MAIN_DOCUMENT_MARKER, STRUCTURED_ANSWER)
        .fail_when_contains("BETAMARK", "compression timed out")
        .when_contains("ALPHAMARK", "Compressed alpha: osmosis moves water passively.")
        .when_contains("GAMMAMARK", "Compressed gamma: osmosis is diffusion of water.")
}

#[tokio::test]
async fn test_single_page_three_sentences_single_chunk() {
    let store = seeded_store(
        "short",
        &[crate::types::Page::new(1, "Sentence one. Sentence two. Sentence three.")],
    )
    .await;
    let chunks = crate::store::VectorStore::chunks(store.as_ref(), "short")
        .await
        .unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Sentence one. Sentence two. Sentence three.");
}

#[tokio::test]
async fn test_unrelated_question_is_answered_from_general_knowledge() {
    let store = seeded_store("bio", &biology_pages()).await;
    let llm = Arc::new(MockLlmClient::new(
        "## Definition\nMars has no capital.\n\n## Sources\nPage 4",
    ));
    let pipeline = pipeline(store, llm.clone());

    let result = pipeline
        .answer("bio", "What is the capital of Mars?", &[], AskOptions::default())
        .await
        .unwrap();

    assert_eq!(result.strategy, AnswerStrategy::ExternalOnly);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.sources, vec!["External sources"]);
    assert!(result.citations.is_empty());
    assert!(result.used_chunks.is_empty());
    assert!(result.answer_text.ends_with("## Sources\nExternal sources"));

    // No compression calls; the disclosure is demanded of the model.
    assert_eq!(llm.call_count(), 1);
    let request = main_request(&llm);
    assert!(request.system.unwrap_or_default().contains(EXTERNAL_DISCLOSURE));
    assert!(!request.prompt.contains("From the document"));
}

#[tokio::test]
async fn test_unknown_document_routes_to_external() {
    let store = seeded_store("bio", &biology_pages()).await;
    let llm = Arc::new(MockLlmClient::new("General answer."));
    let result = pipeline(store, llm)
        .answer("other", "What is osmosis?", &[], AskOptions::default())
        .await
        .unwrap();
    assert_eq!(result.strategy, AnswerStrategy::ExternalOnly);
    assert_eq!(result.confidence, 0.0);
}

#[tokio::test]
async fn test_comparison_question_gets_table_instruction() {
    let store = seeded_store("bio", &biology_pages()).await;
    let llm = Arc::new(scripted_llm());
    let pipeline = pipeline(store, llm.clone());

    let result = pipeline
        .answer(
            "bio",
            "What is the difference between osmosis and diffusion?",
            &[],
            AskOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.strategy, AnswerStrategy::PdfOnly);
    let request = main_request(&llm);
    assert!(request.prompt.contains("comparison table"));
    assert_eq!(request.max_tokens, Some(2000));

    assert_eq!(result.sources, vec!["Page 1", "Page 2", "Page 3"]);
    assert!(result.answer_text.contains("## Sources\nPages 1, 2, 3"));
    assert!(!result.answer_text.contains("99"));

    let cited: Vec<u32> = result.citations.iter().map(|c| c.page_number).collect();
    assert_eq!(cited, vec![1, 2, 3]);
    assert_eq!(result.follow_up, "Would you like to see an experiment?");
    assert!(result.confidence > 0.5 && result.confidence <= 1.0);
    assert_eq!(result.used_chunks.len(), 3);
}

#[tokio::test]
async fn test_compression_failure_uses_original_chunk_text() {
    let store = seeded_store("bio", &biology_pages()).await;
    let llm = Arc::new(scripted_llm());
    let pipeline = pipeline(store, llm.clone());

    let result = pipeline
        .answer("bio", "How do osmosis and diffusion work?", &[], AskOptions::default())
        .await
        .unwrap();

    assert_eq!(result.strategy, AnswerStrategy::PdfOnly);
    assert!(result.answer_text.starts_with("## Definition"));
    // Three compression calls and the main answer.
    assert_eq!(llm.call_count(), 4);

    let prompt = main_request(&llm).prompt;
    assert!(prompt.contains("Compressed alpha: osmosis moves water passively."));
    assert!(prompt.contains("Compressed gamma: osmosis is diffusion of water."));
    assert!(prompt.contains(
        "From the document (Page 2):\nDiffusion spreads particles from high to low concentration."
    ));
    assert!(!prompt.contains("ALPHAMARK"));
}

#[tokio::test]
async fn test_partial_coverage_blends_sources() {
    let store = seeded_store("bio", &biology_pages()).await;
    let llm = Arc::new(MockLlmClient::new(
        "## Definition\nBlended [p.3].\n\n## Sources\nPage 3",
    ));
    let mut config = RagConfig::default();
    config.strategy.min_coverage_chars = 10_000;
    config.synthesis.compress_chunks = false;
    let pipeline = pipeline_with(Arc::new(TopicEmbedder), store, llm.clone(), config);

    let result = pipeline
        .answer("bio", "Explain osmosis", &[], AskOptions::default())
        .await
        .unwrap();

    assert_eq!(result.strategy, AnswerStrategy::Mixed);
    assert_eq!(result.sources.last().unwrap(), "External sources");
    assert!(result.answer_text.contains("External sources"));
    assert!(result.confidence > 0.0 && result.confidence <= 0.7);
    assert!(main_request(&llm).prompt.contains("partial coverage"));
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_history_is_bounded_to_recent_turns() {
    let store = seeded_store("bio", &biology_pages()).await;
    let llm = Arc::new(MockLlmClient::new("## Definition\nX\n\n## Sources\nPage 1"));
    let pipeline = pipeline(store, llm.clone());

    let history: Vec<ChatTurn> = (0..12)
        .map(|i| {
            if i % 2 == 0 {
                ChatTurn::user(format!("turn-{:02}", i))
            } else {
                ChatTurn::assistant(format!("turn-{:02}", i))
            }
        })
        .collect();

    pipeline
        .answer("bio", "What is the capital of Mars?", &history, AskOptions::default())
        .await
        .unwrap();

    let prompt = main_request(&llm).prompt;
    assert!(!prompt.contains("turn-00"));
    assert!(!prompt.contains("turn-01"));
    assert!(prompt.contains("User: turn-02"));
    assert!(prompt.contains("Assistant: turn-11"));
}

#[tokio::test]
async fn test_unstructured_answer_is_reformatted() {
    let store = seeded_store("bio", &biology_pages()).await;
    let llm = Arc::new(
        MockLlmClient::new("unused")
            .when_contains("Reorganize", "## Definition\nOsmosis [p.1].\n\n## Sources\nPage 1")
            .when_contains(MAIN_DOCUMENT_MARKER, "Osmosis moves water [p.1]."),
    );
    let mut config = RagConfig::default();
    config.synthesis.compress_chunks = false;
    let pipeline = pipeline_with(Arc::new(TopicEmbedder), store, llm.clone(), config);

    let result = pipeline
        .answer("bio", "What is osmosis?", &[], AskOptions::default())
        .await
        .unwrap();

    assert!(result.answer_text.starts_with("## Definition\nOsmosis [p.1]."));
    assert_eq!(llm.call_count(), 2);
    let format_request = &llm.requests()[1];
    assert_eq!(format_request.temperature, Some(0.1));
    assert_eq!(format_request.max_tokens, Some(1500));
}

#[tokio::test]
async fn test_context_window_widens_excerpts() {
    let store = seeded_store("bio", &biology_pages()).await;
    let llm = Arc::new(MockLlmClient::new("## Definition\nX\n\n## Sources\nPage 1"));
    let mut config = RagConfig::default();
    config.synthesis.compress_chunks = false;
    let pipeline = pipeline_with(Arc::new(TopicEmbedder), store, llm.clone(), config);

    let options = AskOptions {
        final_k: Some(1),
        context_window: Some(1),
        ..AskOptions::default()
    };
    let result = pipeline
        .answer("bio", "What is osmosis and diffusion?", &[], options)
        .await
        .unwrap();

    assert_eq!(result.used_chunks.len(), 1);
    // The middle page neighbours every other page.
    assert!(main_request(&llm).prompt.contains("BETAMARK"));
}

#[tokio::test]
async fn test_configured_context_window_applies_without_override() {
    let store = seeded_store("bio", &biology_pages()).await;
    let llm = Arc::new(MockLlmClient::new("## Definition\nX\n\n## Sources\nPage 1"));
    let mut config = RagConfig::default();
    config.synthesis.compress_chunks = false;
    config.retrieval.context_window = 1;
    let pipeline = pipeline_with(Arc::new(TopicEmbedder), store, llm.clone(), config);

    let options = AskOptions {
        final_k: Some(1),
        ..AskOptions::default()
    };
    pipeline
        .answer("bio", "What is osmosis and diffusion?", &[], options)
        .await
        .unwrap();

    assert!(main_request(&llm).prompt.contains("BETAMARK"));
}

#[tokio::test]
async fn test_context_window_override_can_disable_configured_window() {
    let store = seeded_store("bio", &biology_pages()).await;
    let llm = Arc::new(MockLlmClient::new("## Definition\nX\n\n## Sources\nPage 1"));
    let mut config = RagConfig::default();
    config.synthesis.compress_chunks = false;
    config.retrieval.context_window = 2;
    let pipeline = pipeline_with(Arc::new(TopicEmbedder), store, llm.clone(), config);

    let options = AskOptions {
        final_k: Some(1),
        context_window: Some(0),
        ..AskOptions::default()
    };
    pipeline
        .answer("bio", "What is osmosis?", &[], options)
        .await
        .unwrap();

    let prompt = main_request(&llm).prompt;
    let markers = ["ALPHAMARK", "BETAMARK", "GAMMAMARK"]
        .iter()
        .filter(|m| prompt.contains(*m))
        .count();
    assert_eq!(markers, 1);
}

#[tokio::test]
async fn test_embedding_failure_is_retrieval_failure() {
    let store = seeded_store("bio", &biology_pages()).await;
    let llm = Arc::new(MockLlmClient::new("never"));
    let pipeline = pipeline_with(Arc::new(FailingEmbedder), store, llm.clone(), RagConfig::default());

    let err = pipeline
        .answer("bio", "What is osmosis?", &[], AskOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "retrieval_failed");
    assert_eq!(err.user_message(), USER_FACING_FAILURE);
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_store_failure_is_retrieval_failure() {
    let llm = Arc::new(MockLlmClient::new("never"));
    let pipeline = pipeline(Arc::new(UnreachableStore), llm);
    let err = pipeline
        .answer("bio", "What is osmosis?", &[], AskOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "retrieval_failed");
}

#[tokio::test]
async fn test_main_generation_failure_is_fatal() {
    let store = seeded_store("bio", &biology_pages()).await;
    let llm = Arc::new(
        MockLlmClient::new("compressed").fail_when_contains(MAIN_DOCUMENT_MARKER, "overloaded"),
    );
    let err = pipeline(store, llm)
        .answer("bio", "What is osmosis?", &[], AskOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "generation_failed");
    assert!(!err.user_message().contains("overloaded"));
}
