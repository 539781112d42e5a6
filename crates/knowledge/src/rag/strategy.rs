//! Choosing how an answer is grounded.

use crate::config::StrategyConfig;
use crate::types::{AnswerStrategy, RetrievedChunk};

const TABLE_KEYWORDS: &[&str] = &[
    "difference",
    "differences",
    "compare",
    "comparison",
    "vs",
    "versus",
    "advantages",
    "disadvantages",
    "pros",
    "cons",
    "contrast",
    "similarities",
    "distinguish",
    "differentiate",
];

/// Pick a strategy from the quality of the retrieved chunks.
///
/// Chunks at or above the similarity threshold qualify. Enough qualifying
/// chunks with enough combined text give `PdfOnly`; qualifying chunks with too
/// little text give `Mixed`; anything else is `ExternalOnly`.
pub fn select_strategy(chunks: &[RetrievedChunk], config: &StrategyConfig) -> AnswerStrategy {
    if chunks.is_empty() {
        return AnswerStrategy::ExternalOnly;
    }

    let qualifying: Vec<&RetrievedChunk> = chunks
        .iter()
        .filter(|c| c.similarity_score >= config.similarity_threshold)
        .collect();

    if qualifying.is_empty() || qualifying.len() < config.min_chunks_required {
        return AnswerStrategy::ExternalOnly;
    }

    let coverage: usize = qualifying.iter().map(|c| c.text().chars().count()).sum();
    if coverage >= config.min_coverage_chars {
        AnswerStrategy::PdfOnly
    } else {
        AnswerStrategy::Mixed
    }
}

/// Whether a question asks for a comparison and deserves a table.
///
/// Matches whole words; keywords of six or more letters also match as word
/// prefixes ("compared", "contrasting").
pub fn is_comparison_question(question: &str) -> bool {
    let lower = question.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|word| {
            TABLE_KEYWORDS
                .iter()
                .any(|kw| word == *kw || (kw.len() >= 6 && word.starts_with(kw)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    fn chunk(text_len: usize, similarity: f32) -> RetrievedChunk {
        RetrievedChunk::new(
            Chunk {
                chunk_id: "d_chunk_0000".to_string(),
                doc_id: "d".to_string(),
                page_number: 1,
                text: "a".repeat(text_len),
                start_char: 0,
                end_char: text_len,
                token_estimate: 1,
                chunk_index: 0,
            },
            similarity,
        )
    }

    #[test]
    fn test_no_chunks_is_external() {
        assert_eq!(
            select_strategy(&[], &StrategyConfig::default()),
            AnswerStrategy::ExternalOnly
        );
    }

    #[test]
    fn test_enough_coverage_is_pdf_only() {
        let chunks = vec![chunk(120, 0.5), chunk(90, 0.31), chunk(500, 0.1)];
        assert_eq!(
            select_strategy(&chunks, &StrategyConfig::default()),
            AnswerStrategy::PdfOnly
        );
    }

    #[test]
    fn test_low_similarity_text_does_not_count() {
        // 500 chars below threshold do not add coverage.
        let chunks = vec![chunk(120, 0.5), chunk(500, 0.29)];
        assert_eq!(
            select_strategy(&chunks, &StrategyConfig::default()),
            AnswerStrategy::Mixed
        );
    }

    #[test]
    fn test_all_below_threshold_is_external() {
        let chunks = vec![chunk(800, 0.2), chunk(800, 0.1)];
        assert_eq!(
            select_strategy(&chunks, &StrategyConfig::default()),
            AnswerStrategy::ExternalOnly
        );
    }

    #[test]
    fn test_min_chunks_required() {
        let config = StrategyConfig {
            min_chunks_required: 2,
            ..Default::default()
        };
        assert_eq!(
            select_strategy(&[chunk(400, 0.9)], &config),
            AnswerStrategy::ExternalOnly
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let config = StrategyConfig::default();
        assert_eq!(
            select_strategy(&[chunk(200, 0.3)], &config),
            AnswerStrategy::PdfOnly
        );
    }

    #[test]
    fn test_comparison_detection() {
        assert!(is_comparison_question("What is the difference between X and Y?"));
        assert!(is_comparison_question("Mitosis vs meiosis"));
        assert!(is_comparison_question("Compare osmosis and diffusion"));
        assert!(is_comparison_question("How do the two methods contrast?"));
        assert!(is_comparison_question("What are the ADVANTAGES of PCR?"));
        assert!(is_comparison_question("How is it compared to glass?"));
        assert!(!is_comparison_question("What is osmosis?"));
        // Short keywords only match whole words.
        assert!(!is_comparison_question("Describe the canvas of the painting"));
        assert!(!is_comparison_question("Explain the consequences"));
    }
}
