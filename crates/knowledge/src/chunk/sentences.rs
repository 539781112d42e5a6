//! Sentence segmentation.
//!
//! Splitters return byte ranges into the input instead of owned strings, so the
//! chunker can report exact page offsets. Ranges never start or end with
//! whitespace, appear in text order, and together cover every non-whitespace
//! character of the input.

use text_splitter::TextSplitter;

/// A trimmed byte range of some text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn as_str<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    pub fn char_len(&self, text: &str) -> usize {
        self.as_str(text).chars().count()
    }

    fn shifted(self, offset: usize) -> Self {
        Self::new(self.start + offset, self.end + offset)
    }
}

/// Replaceable sentence tokenizer.
pub trait SentenceSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<Segment>;
}

/// Splits after runs of `.`, `!` or `?` that end the text or are followed by
/// whitespace and an uppercase letter.
///
/// Fragments of at most `min_sentence_chars` characters are glued onto the
/// following sentence (or the previous one at the end of the text). Text with
/// no sentence boundary at all falls back to [`split_by_length`].
#[derive(Debug, Clone)]
pub struct PunctuationSplitter {
    pub min_sentence_chars: usize,
    pub fallback_chars: usize,
}

impl Default for PunctuationSplitter {
    fn default() -> Self {
        Self {
            min_sentence_chars: 10,
            fallback_chars: 200,
        }
    }
}

impl SentenceSplitter for PunctuationSplitter {
    fn split(&self, text: &str) -> Vec<Segment> {
        let (pieces, found_boundary) = split_at_terminators(text);
        if !found_boundary {
            return split_by_length(text, self.fallback_chars);
        }
        merge_short(text, pieces, self.min_sentence_chars)
    }
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Raw pieces between sentence boundaries, and whether any boundary was seen.
fn split_at_terminators(text: &str) -> (Vec<Segment>, bool) {
    let mut pieces = Vec::new();
    let mut found_boundary = false;
    let mut piece_start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }

        while let Some(&(_, next)) = chars.peek() {
            if is_terminator(next) {
                chars.next();
            } else {
                break;
            }
        }
        let run_end = chars.peek().map(|&(i, _)| i).unwrap_or(text.len());

        if ends_sentence(&text[run_end..]) {
            found_boundary = true;
            push_trimmed(text, piece_start, run_end, &mut pieces);
            piece_start = run_end;
        }
    }

    push_trimmed(text, piece_start, text.len(), &mut pieces);
    (pieces, found_boundary)
}

fn ends_sentence(rest: &str) -> bool {
    let after_space = rest.trim_start();
    if after_space.is_empty() {
        return true;
    }
    if after_space.len() == rest.len() {
        return false;
    }
    after_space.chars().next().is_some_and(char::is_uppercase)
}

fn push_trimmed(text: &str, start: usize, end: usize, out: &mut Vec<Segment>) {
    let slice = &text[start..end];
    let trimmed = slice.trim_start();
    let lead = slice.len() - trimmed.len();
    let trimmed = trimmed.trim_end();
    if !trimmed.is_empty() {
        out.push(Segment::new(start + lead, start + lead + trimmed.len()));
    }
}

fn merge_short(text: &str, pieces: Vec<Segment>, min_chars: usize) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(pieces.len());
    let mut carry: Option<Segment> = None;

    for piece in pieces {
        let candidate = match carry.take() {
            Some(pending) => Segment::new(pending.start, piece.end),
            None => piece,
        };
        if candidate.char_len(text) <= min_chars {
            carry = Some(candidate);
        } else {
            merged.push(candidate);
        }
    }

    if let Some(pending) = carry {
        match merged.last_mut() {
            Some(last) => last.end = pending.end,
            None => merged.push(pending),
        }
    }

    merged
}

/// Split into segments of at most `max_chars` characters.
///
/// Breaks fall on the largest semantic unit that fits (sentence, then word,
/// then grapheme), so a single overlong word is cut as well.
pub fn split_by_length(text: &str, max_chars: usize) -> Vec<Segment> {
    TextSplitter::new(max_chars.max(1))
        .chunk_indices(text)
        .map(|(offset, piece)| Segment::new(offset, offset + piece.len()))
        .collect()
}

/// Break a segment that is longer than `max_chars` into bounded pieces.
pub fn split_long_segment(text: &str, segment: Segment, max_chars: usize) -> Vec<Segment> {
    if segment.char_len(text) <= max_chars {
        return vec![segment];
    }
    split_by_length(segment.as_str(text), max_chars)
        .into_iter()
        .map(|s| s.shifted(segment.start))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(text: &'a str, segments: &[Segment]) -> Vec<&'a str> {
        segments.iter().map(|s| s.as_str(text)).collect()
    }

    #[test]
    fn test_splits_on_terminator_before_capital() {
        let text = "Sentence one. Sentence two! Sentence three?";
        let segments = PunctuationSplitter::default().split(text);
        assert_eq!(
            texts(text, &segments),
            vec!["Sentence one.", "Sentence two!", "Sentence three?"]
        );
    }

    #[test]
    fn test_does_not_split_before_lowercase() {
        let text = "Values are approx. three times larger. Next sentence here.";
        let segments = PunctuationSplitter::default().split(text);
        assert_eq!(
            texts(text, &segments),
            vec!["Values are approx. three times larger.", "Next sentence here."]
        );
    }

    #[test]
    fn test_short_fragments_are_merged_forward() {
        let text = "Fig. 2. The membrane is selectively permeable.";
        let segments = PunctuationSplitter::default().split(text);
        assert_eq!(texts(text, &segments), vec![text]);
    }

    #[test]
    fn test_trailing_short_fragment_joins_previous() {
        let text = "Osmosis moves water across membranes. See below.";
        let segments = PunctuationSplitter::default().split(text);
        assert_eq!(texts(text, &segments), vec![text]);
    }

    fn assert_bounded_cover(text: &str, segments: &[Segment], max_chars: usize) {
        for segment in segments {
            let piece = segment.as_str(text);
            assert!(!piece.is_empty());
            assert_eq!(piece, piece.trim());
            assert!(piece.chars().count() <= max_chars, "too long: {:?}", piece);
        }
        let rebuilt: String = segments.iter().map(|s| s.as_str(text)).collect();
        let original: String = text.split_whitespace().collect();
        assert_eq!(rebuilt.split_whitespace().collect::<String>(), original);
        assert!(segments.windows(2).all(|w| w[0].end <= w[1].start));
    }

    #[test]
    fn test_no_boundary_uses_length_fallback() {
        let text = "alpha beta gamma delta epsilon";
        let splitter = PunctuationSplitter {
            min_sentence_chars: 10,
            fallback_chars: 11,
        };
        let segments = splitter.split(text);
        assert!(segments.len() >= 3);
        assert_bounded_cover(text, &segments, 11);
    }

    #[test]
    fn test_whitespace_only_gives_nothing() {
        assert!(PunctuationSplitter::default().split(" \n\t ").is_empty());
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Über die Zelle wird viel gesagt. Énergie libre est utile.";
        let segments = PunctuationSplitter::default().split(text);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].as_str(text), "Énergie libre est utile.");
    }

    #[test]
    fn test_split_long_segment_offsets() {
        let text = "xx one two three four";
        let seg = Segment::new(3, text.len());
        let parts = split_long_segment(text, seg, 8);
        assert!(parts.len() >= 3);
        assert!(parts.iter().all(|p| p.start >= 3));
        assert_eq!(parts[0].as_str(text), "one two");
        assert_eq!(parts.last().map(|p| p.as_str(text)), Some("four"));
        assert!(parts.iter().all(|p| p.char_len(text) <= 8));
    }

    #[test]
    fn test_short_segment_is_kept() {
        let text = "one two";
        let seg = Segment::new(0, text.len());
        assert_eq!(split_long_segment(text, seg, 80), vec![seg]);
    }

    #[test]
    fn test_oversized_word_is_cut() {
        let text = "a supercalifragilistic b";
        let parts = split_by_length(text, 5);
        assert_bounded_cover(text, &parts, 5);
        assert!(parts.len() >= 5);
    }

    #[test]
    fn test_multibyte_length_split() {
        let text = "ünïcödé wörds spläshed äcross bytes";
        let parts = split_by_length(text, 8);
        assert_bounded_cover(text, &parts, 8);
    }
}
