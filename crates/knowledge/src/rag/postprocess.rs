//! Deterministic clean-up and scoring of a generated answer.
//!
//! Applied in a fixed order: source correction, citation extraction, follow-up
//! extraction, confidence scoring. Nothing here calls a collaborator.

use crate::chunk::PunctuationSplitter;
use crate::types::{AnswerStrategy, Citation, RetrievedChunk, UsedChunk};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

pub const EXTERNAL_SOURCES: &str = "External sources";

const SOURCES_HEADER: &str = "## Sources";
const FOLLOW_UP_HEADER: &str = "## Follow-up";

static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[p\.\s*(\d+)\]").expect("valid regex"));

/// Bold-text stand-ins for the sources heading, on a line of their own.
static BOLD_SOURCES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\*\*Sources:?\*\*:?[ \t]*$").expect("valid regex")
});

static FOLLOW_UP_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Do you want to [^?]+\?",
        r"(?i)Would you like [^?]+\?",
        r"(?i)Should I [^?]+\?",
        r"(?i)Want to [^?]+\?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

fn distinct_pages(chunks: &[RetrievedChunk]) -> Vec<u32> {
    chunks
        .iter()
        .map(|c| c.page_number())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Human-readable page summary: `Page 4`, `Pages 2, 5, 9` or
/// `Pages 2-40 (and others)`.
pub fn page_summary(pages: &[u32]) -> Option<String> {
    match pages {
        [] => None,
        [only] => Some(format!("Page {}", only)),
        [first, .., last] if pages.len() > 3 => {
            Some(format!("Pages {}-{} (and others)", first, last))
        }
        _ => Some(format!(
            "Pages {}",
            pages
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

/// Rewrite every `## Sources` section from the pages actually used, or append
/// one when the answer has none.
///
/// A section's body runs up to the next `##` heading or the end of the text;
/// whitespace between the body and what follows is kept.
/// A `**Sources**` line counts as the heading and is rewritten to `## Sources`.
pub fn correct_sources(answer: &str, strategy: AnswerStrategy, chunks: &[RetrievedChunk]) -> String {
    let body = sources_body(strategy, chunks);
    let answer = BOLD_SOURCES_RE.replace_all(answer, SOURCES_HEADER);
    let answer = answer.as_ref();

    if !answer.contains(SOURCES_HEADER) {
        return format!("{}\n\n{}\n{}", answer.trim_end(), SOURCES_HEADER, body);
    }

    let mut out = String::with_capacity(answer.len());
    let mut rest = answer;
    while let Some(pos) = rest.find(SOURCES_HEADER) {
        let after_header = pos + SOURCES_HEADER.len();
        out.push_str(&rest[..after_header]);
        out.push('\n');
        out.push_str(&body);

        let tail = &rest[after_header..];
        let section = &tail[..tail.find("\n##").unwrap_or(tail.len())];
        rest = &tail[section.trim_end().len()..];
    }
    out.push_str(rest);
    out
}

fn sources_body(strategy: AnswerStrategy, chunks: &[RetrievedChunk]) -> String {
    let pages = page_summary(&distinct_pages(chunks));
    match (strategy, pages) {
        (AnswerStrategy::ExternalOnly, _) | (_, None) => EXTERNAL_SOURCES.to_string(),
        (AnswerStrategy::PdfOnly, Some(pages)) => pages,
        (AnswerStrategy::Mixed, Some(pages)) => format!("{}\n{}", pages, EXTERNAL_SOURCES),
    }
}

/// Source labels for the result: one `Page N` per distinct page, ascending.
pub fn source_list(strategy: AnswerStrategy, chunks: &[RetrievedChunk]) -> Vec<String> {
    if strategy == AnswerStrategy::ExternalOnly {
        return vec![EXTERNAL_SOURCES.to_string()];
    }

    let mut sources: Vec<String> = distinct_pages(chunks)
        .into_iter()
        .map(|page| format!("Page {}", page))
        .collect();
    if strategy == AnswerStrategy::Mixed {
        sources.push(EXTERNAL_SOURCES.to_string());
    }
    sources
}

/// Citations for each `[p.N]` marker whose page is among `chunks`, in order of
/// first mention, each backed by that page's most similar chunk. Without any
/// usable marker, the first three chunks are cited instead.
pub fn extract_citations(answer: &str, chunks: &[RetrievedChunk], max_chars: usize) -> Vec<Citation> {
    let mut best_by_page: HashMap<u32, &RetrievedChunk> = HashMap::new();
    for chunk in chunks {
        best_by_page
            .entry(chunk.page_number())
            .and_modify(|best| {
                if chunk.similarity_score > best.similarity_score {
                    *best = chunk;
                }
            })
            .or_insert(chunk);
    }

    let mut seen = BTreeSet::new();
    let mut citations: Vec<Citation> = CITATION_RE
        .captures_iter(answer)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .filter(|page| seen.insert(*page))
        .filter_map(|page| best_by_page.get(&page).map(|chunk| citation(chunk, max_chars)))
        .collect();

    if citations.is_empty() {
        for chunk in chunks.iter().take(3) {
            let candidate = citation(chunk, max_chars);
            let duplicate = citations
                .iter()
                .any(|c| c.page_number == candidate.page_number && c.snippet == candidate.snippet);
            if !duplicate {
                citations.push(candidate);
            }
        }
    }

    citations
}

fn citation(chunk: &RetrievedChunk, max_chars: usize) -> Citation {
    Citation {
        page_number: chunk.page_number(),
        chunk_id: chunk.chunk.chunk_id.clone(),
        snippet: snippet(chunk.text(), max_chars),
        similarity_score: chunk.similarity_score,
    }
}

/// Shorten `text` to at most `max_chars` characters (plus an ellipsis when
/// cut mid-sentence). Prefers the first whole sentence, then a word boundary
/// in the last fifth of the limit.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    if let Some(sentence) = first_sentence(text) {
        if sentence.chars().count() <= max_chars {
            return sentence.to_string();
        }
    }

    let cut: String = text.chars().take(max_chars).collect();
    let min_break = max_chars * 4 / 5;
    let cut = match cut.rfind(' ') {
        Some(space) if cut[..space].chars().count() > min_break => cut[..space].to_string(),
        _ => cut,
    };
    format!("{}...", cut)
}

/// The leading sentence: text up to the first terminator run that is followed
/// by whitespace or the end, skipping prefixes no longer than a sentence
/// fragment (`Dr.`, `Fig. 2.`).
fn first_sentence(text: &str) -> Option<&str> {
    let min_chars = PunctuationSplitter::default().min_sentence_chars;
    let is_terminator = |c: char| matches!(c, '.' | '!' | '?');

    let mut from = 0;
    while let Some(offset) = text[from..].find(is_terminator) {
        let start = from + offset;
        let end = text[start..]
            .find(|c: char| !is_terminator(c))
            .map_or(text.len(), |run| start + run);
        let at_break = text[end..].chars().next().map_or(true, char::is_whitespace);
        if at_break && text[..end].chars().count() > min_chars {
            return Some(&text[..end]);
        }
        from = end;
    }
    None
}

/// The follow-up question offered to the reader.
pub fn extract_follow_up(answer: &str) -> String {
    if let Some(found) = FOLLOW_UP_RES.iter().find_map(|re| re.find(answer)) {
        return found.as_str().trim().to_string();
    }

    if let Some(question) = follow_up_section_question(answer) {
        return question;
    }

    let lower = answer.to_lowercase();
    if lower.contains("example") {
        "Would you like more examples?".to_string()
    } else if lower.contains("definition") || lower.contains("means") {
        "Do you want to see where this is used?".to_string()
    } else {
        "Would you like me to explain this further?".to_string()
    }
}

fn follow_up_section_question(answer: &str) -> Option<String> {
    let start = answer.find(FOLLOW_UP_HEADER)?;
    answer[start..]
        .lines()
        .skip(1)
        .take_while(|line| !line.starts_with("##"))
        .map(str::trim)
        .find(|line| line.ends_with('?'))
        .map(|line| line.trim_start_matches(['-', '*', ' ']).to_string())
}

/// Grounding confidence in `[0, 1]`; zero exactly when no document text backs
/// the answer.
pub fn confidence(strategy: AnswerStrategy, chunks: &[RetrievedChunk]) -> f32 {
    if strategy == AnswerStrategy::ExternalOnly || chunks.is_empty() {
        return 0.0;
    }

    let mean = chunks
        .iter()
        .map(|c| c.similarity_score.clamp(0.0, 1.0))
        .sum::<f32>()
        / chunks.len() as f32;

    let scaled = match strategy {
        AnswerStrategy::Mixed => mean * 0.7,
        _ => mean,
    };
    scaled.clamp(0.0, 1.0)
}

/// Summaries of the chunks that fed an answer.
pub fn used_chunks(
    strategy: AnswerStrategy,
    chunks: &[RetrievedChunk],
    preview_chars: usize,
) -> Vec<UsedChunk> {
    if !strategy.uses_document() {
        return Vec::new();
    }

    chunks
        .iter()
        .map(|c| {
            let preview = if c.text().chars().count() > preview_chars {
                format!("{}...", c.text().chars().take(preview_chars).collect::<String>())
            } else {
                c.text().to_string()
            };
            UsedChunk {
                chunk_id: c.chunk.chunk_id.clone(),
                page_number: c.page_number(),
                similarity_score: c.similarity_score,
                rank_score: c.rank_score,
                preview,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    fn chunk(index: usize, page: u32, text: &str, similarity: f32) -> RetrievedChunk {
        RetrievedChunk::new(
            Chunk {
                chunk_id: Chunk::make_id("doc", index),
                doc_id: "doc".to_string(),
                page_number: page,
                text: text.to_string(),
                start_char: 0,
                end_char: text.chars().count().max(1),
                token_estimate: 1,
                chunk_index: index,
            },
            similarity,
        )
    }

    fn pages(ps: &[u32]) -> Vec<RetrievedChunk> {
        ps.iter()
            .enumerate()
            .map(|(i, p)| chunk(i, *p, "text", 0.5))
            .collect()
    }

    #[test]
    fn test_page_summary_forms() {
        assert_eq!(page_summary(&[]), None);
        assert_eq!(page_summary(&[7]).unwrap(), "Page 7");
        assert_eq!(page_summary(&[2, 5, 9]).unwrap(), "Pages 2, 5, 9");
        assert_eq!(page_summary(&[2, 5, 9, 40]).unwrap(), "Pages 2-40 (and others)");
    }

    #[test]
    fn test_correct_sources_replaces_claimed_pages() {
        let answer = "## Definition\nX.\n\n## Sources\nPages 1, 99, 100\n\n## Follow-up Question\nMore?";
        let fixed = correct_sources(answer, AnswerStrategy::PdfOnly, &pages(&[4, 2, 4]));
        assert_eq!(
            fixed,
            "## Definition\nX.\n\n## Sources\nPages 2, 4\n\n## Follow-up Question\nMore?"
        );
    }

    #[test]
    fn test_correct_sources_at_end_of_text() {
        let answer = "## Definition\nX.\n\n## Sources\nPage 12\nPage 13\n";
        let fixed = correct_sources(answer, AnswerStrategy::PdfOnly, &pages(&[3]));
        assert_eq!(fixed, "## Definition\nX.\n\n## Sources\nPage 3\n");
    }

    #[test]
    fn test_correct_sources_appends_when_missing() {
        let fixed = correct_sources("Just text.\n", AnswerStrategy::PdfOnly, &pages(&[1, 2, 3, 4]));
        assert_eq!(fixed, "Just text.\n\n## Sources\nPages 1-4 (and others)");
    }

    #[test]
    fn test_correct_sources_rewrites_bold_heading() {
        let answer = "## Definition\nX.\n\n**Sources**\nPage 9";
        let fixed = correct_sources(answer, AnswerStrategy::PdfOnly, &pages(&[2]));
        assert_eq!(fixed, "## Definition\nX.\n\n## Sources\nPage 2");

        let answer = "**Sources:**\nPage 9\n\n## Follow-up\nMore?";
        let fixed = correct_sources(answer, AnswerStrategy::PdfOnly, &pages(&[2]));
        assert_eq!(fixed, "## Sources\nPage 2\n\n## Follow-up\nMore?");
    }

    #[test]
    fn test_correct_sources_external_and_mixed() {
        let answer = "## Sources\nPage 3";
        assert_eq!(
            correct_sources(answer, AnswerStrategy::ExternalOnly, &pages(&[3])),
            "## Sources\nExternal sources"
        );
        assert_eq!(
            correct_sources(answer, AnswerStrategy::Mixed, &pages(&[3])),
            "## Sources\nPage 3\nExternal sources"
        );
    }

    #[test]
    fn test_source_list() {
        let chunks = pages(&[9, 2, 9]);
        assert_eq!(
            source_list(AnswerStrategy::PdfOnly, &chunks),
            vec!["Page 2", "Page 9"]
        );
        assert_eq!(
            source_list(AnswerStrategy::Mixed, &chunks),
            vec!["Page 2", "Page 9", "External sources"]
        );
        assert_eq!(
            source_list(AnswerStrategy::ExternalOnly, &chunks),
            vec!["External sources"]
        );
    }

    #[test]
    fn test_citations_follow_markers_and_pick_best_chunk() {
        let chunks = vec![
            chunk(0, 3, "Weak match on page three.", 0.4),
            chunk(1, 3, "Strong match on page three.", 0.8),
            chunk(2, 5, "Page five text.", 0.6),
        ];
        let answer = "Water moves [p.5]. It is passive [p. 3] and [p.5]. Also [p.77].";
        let citations = extract_citations(answer, &chunks, 150);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].page_number, 5);
        assert_eq!(citations[1].page_number, 3);
        assert_eq!(citations[1].chunk_id, "doc_chunk_0001");
        assert_eq!(citations[1].snippet, "Strong match on page three.");
    }

    #[test]
    fn test_citations_fall_back_to_top_three() {
        let chunks = vec![
            chunk(0, 1, "One.", 0.9),
            chunk(1, 2, "Two.", 0.8),
            chunk(2, 3, "Three.", 0.7),
            chunk(3, 4, "Four.", 0.6),
        ];
        let citations = extract_citations("No markers here.", &chunks, 150);
        let cited: Vec<u32> = citations.iter().map(|c| c.page_number).collect();
        assert_eq!(cited, vec![1, 2, 3]);
    }

    #[test]
    fn test_snippet_prefers_sentence_then_word() {
        let text = format!("Short first sentence. {}", "word ".repeat(60));
        assert_eq!(snippet(&text, 150), "Short first sentence.");

        let long = "word ".repeat(60);
        let s = snippet(&long, 150);
        assert!(s.ends_with("..."));
        assert!(s.chars().count() <= 153);
        assert!(!s.trim_end_matches("...").ends_with(' '));

        assert_eq!(snippet("Fits entirely.", 150), "Fits entirely.");
    }

    #[test]
    fn test_snippet_skips_abbreviation_prefix() {
        let text = format!("Dr. Smith measured osmotic pressure. {}", "word ".repeat(60));
        assert_eq!(snippet(&text, 150), "Dr. Smith measured osmotic pressure.");

        let text = format!("Use e.g. salt water here. {}", "word ".repeat(60));
        assert_eq!(snippet(&text, 150), "Use e.g. salt water here.");
    }

    #[test]
    fn test_snippet_hard_cut_without_spaces() {
        let text = "x".repeat(200);
        assert_eq!(snippet(&text, 10), format!("{}...", "x".repeat(10)));
    }

    #[test]
    fn test_follow_up_patterns() {
        assert_eq!(
            extract_follow_up("Great. Would you like to see a diagram? Sure."),
            "Would you like to see a diagram?"
        );
        assert_eq!(
            extract_follow_up("do you want to explore osmosis further?"),
            "do you want to explore osmosis further?"
        );
    }

    #[test]
    fn test_follow_up_section() {
        let answer = "## Definition\nX\n\n## Follow-up Question\n- How does temperature affect diffusion?\n\n## Sources\nPage 1";
        assert_eq!(
            extract_follow_up(answer),
            "How does temperature affect diffusion?"
        );
    }

    #[test]
    fn test_follow_up_defaults() {
        assert_eq!(
            extract_follow_up("For example, a cell."),
            "Would you like more examples?"
        );
        assert_eq!(
            extract_follow_up("Osmosis means water movement."),
            "Do you want to see where this is used?"
        );
        assert_eq!(
            extract_follow_up("Water moves."),
            "Would you like me to explain this further?"
        );
    }

    #[test]
    fn test_confidence() {
        let chunks = vec![chunk(0, 1, "a", 0.8), chunk(1, 1, "b", 0.4)];
        assert_eq!(confidence(AnswerStrategy::ExternalOnly, &chunks), 0.0);
        assert!((confidence(AnswerStrategy::PdfOnly, &chunks) - 0.6).abs() < 1e-6);
        assert!((confidence(AnswerStrategy::Mixed, &chunks) - 0.42).abs() < 1e-6);

        let odd = vec![chunk(0, 1, "a", 1.4), chunk(1, 1, "b", -0.2)];
        assert!((confidence(AnswerStrategy::PdfOnly, &odd) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_used_chunks_preview() {
        let long = "y".repeat(250);
        let chunks = vec![chunk(0, 2, &long, 0.7)];
        let used = used_chunks(AnswerStrategy::PdfOnly, &chunks, 200);
        assert_eq!(used[0].preview.chars().count(), 203);
        assert!(used[0].preview.ends_with("..."));
        assert!(used_chunks(AnswerStrategy::ExternalOnly, &chunks, 200).is_empty());
    }
}
