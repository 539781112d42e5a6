//! Heuristic re-ranking of vector search candidates.
//!
//! The composite score mixes four signals in `[0, 1]`:
//!
//! | signal     | weight |
//! |------------|--------|
//! | keywords   | 0.4    |
//! | length     | 0.2    |
//! | position   | 0.1    |
//! | similarity | 0.3    |

use crate::types::RetrievedChunk;
use pagewise_core::{AppError, AppResult};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const KEYWORD_WEIGHT: f32 = 0.4;
const LENGTH_WEIGHT: f32 = 0.2;
const POSITION_WEIGHT: f32 = 0.1;
const SIMILARITY_WEIGHT: f32 = 0.3;

/// Added to the overlap ratio when the whole query appears in the chunk.
const PHRASE_BOOST: f32 = 0.3;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "this", "that", "these", "those", "i", "you", "he", "she", "it",
    "we", "they", "me", "him", "her", "us", "them", "my", "your", "his", "its", "our", "their",
];

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-z]+\b").expect("valid regex"));

static PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Lowercase alphabetic words of three or more letters, minus stop words.
pub fn extract_keywords(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| w.len() >= 3 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// The four signals behind a composite rank score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankSignals {
    pub keywords: f32,
    pub length: f32,
    pub position: f32,
    pub similarity: f32,
}

impl RankSignals {
    pub fn compute(query: &str, chunk: &RetrievedChunk, ideal_length: usize) -> Self {
        Self {
            keywords: keyword_score(query, chunk.text()),
            length: length_score(chunk.text().chars().count(), ideal_length),
            position: position_score(chunk.page_number()),
            // Written as a comparison so a NaN similarity stays NaN.
            similarity: if chunk.similarity_score > 1.0 {
                1.0
            } else {
                chunk.similarity_score
            },
        }
    }

    pub fn composite(&self) -> f32 {
        KEYWORD_WEIGHT * self.keywords
            + LENGTH_WEIGHT * self.length
            + POSITION_WEIGHT * self.position
            + SIMILARITY_WEIGHT * self.similarity
    }
}

/// Share of query keywords found in `text`, boosted when the punctuation-free
/// query occurs verbatim. Capped at 1.
pub fn keyword_score(query: &str, text: &str) -> f32 {
    let query_keywords = extract_keywords(query);
    if query_keywords.is_empty() {
        return 0.0;
    }
    let text_keywords = extract_keywords(text);

    let overlap = query_keywords.intersection(&text_keywords).count();
    let mut ratio = overlap as f32 / query_keywords.len() as f32;

    let query_clean = PUNCTUATION_RE.replace_all(&query.to_lowercase(), "").into_owned();
    let text_clean = PUNCTUATION_RE.replace_all(&text.to_lowercase(), "").into_owned();
    if text_clean.contains(&query_clean) {
        ratio += PHRASE_BOOST;
    }

    ratio.min(1.0)
}

/// Rises linearly to 1 at `ideal`, then falls by the relative excess, losing at
/// most half.
pub fn length_score(length: usize, ideal: usize) -> f32 {
    let ideal = ideal.max(1) as f32;
    let length = length as f32;
    if length <= ideal {
        length / ideal
    } else {
        1.0 - ((length - ideal) / ideal).min(0.5)
    }
}

/// Earlier pages score slightly higher.
pub fn position_score(page_number: u32) -> f32 {
    match page_number {
        0..=5 => 1.0,
        6..=20 => 0.9,
        _ => 0.8,
    }
}

/// Attach rank scores and reorder by them, highest first.
///
/// The sort is stable, so equal scores keep their incoming (similarity)
/// order. Fails without reordering if any score is not finite.
pub fn rerank(
    query: &str,
    mut candidates: Vec<RetrievedChunk>,
    ideal_length: usize,
) -> AppResult<Vec<RetrievedChunk>> {
    let scores: Vec<f32> = candidates
        .iter()
        .map(|c| RankSignals::compute(query, c, ideal_length).composite())
        .collect();

    if let Some((i, score)) = scores.iter().enumerate().find(|(_, s)| !s.is_finite()) {
        return Err(AppError::Knowledge(format!(
            "Rank score for {} is {}",
            candidates[i].chunk.chunk_id, score
        )));
    }

    for (candidate, score) in candidates.iter_mut().zip(scores) {
        candidate.rank_score = Some(score);
    }
    candidates.sort_by(|a, b| {
        b.rank_score
            .partial_cmp(&a.rank_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(candidates)
}
