//! Sentence-buffering chunker.

use super::sentences::{split_long_segment, PunctuationSplitter, Segment, SentenceSplitter};
use crate::config::ChunkingConfig;
use crate::types::{Chunk, Page};

/// Turns extracted pages into overlapping, size-bounded chunks.
///
/// Sentences are accumulated until adding the next one would pass
/// `max_chunk_size` while the buffer already holds `min_chunk_size`
/// characters. The buffer is then emitted and the next one is seeded with an
/// overlap taken from its tail. A buffer below the minimum is still emitted
/// rather than grow past 120% of the maximum, and a seed that would push the
/// next chunk past that bound is dropped. Chunk text is the buffer's segments
/// joined by a single space.
pub struct SemanticChunker {
    config: ChunkingConfig,
    splitter: Box<dyn SentenceSplitter>,
}

impl SemanticChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self::with_splitter(config, Box::new(PunctuationSplitter::default()))
    }

    pub fn with_splitter(config: ChunkingConfig, splitter: Box<dyn SentenceSplitter>) -> Self {
        Self { config, splitter }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunk every page of a document. Chunk indices run across pages.
    pub fn chunk_document(&self, doc_id: &str, pages: &[Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in pages {
            if page.text.trim().is_empty() {
                tracing::debug!(doc_id, page = page.number, "Skipping empty page");
                continue;
            }
            let before = chunks.len();
            self.chunk_page(doc_id, page, &mut chunks);
            tracing::trace!(
                doc_id,
                page = page.number,
                produced = chunks.len() - before,
                "Chunked page"
            );
        }

        tracing::debug!(doc_id, pages = pages.len(), chunks = chunks.len(), "Chunked document");
        chunks
    }

    fn chunk_page(&self, doc_id: &str, page: &Page, out: &mut Vec<Chunk>) {
        let text = page.text.as_str();
        let max = self.config.max_chunk_size;
        let min = self.config.min_chunk_size;

        let segments: Vec<Segment> = self
            .splitter
            .split(text)
            .into_iter()
            .flat_map(|segment| split_long_segment(text, segment, max))
            .collect();

        let limit = max + max / 5;
        let mut buffer = Buffer::default();

        for segment in segments {
            let seg_len = segment.char_len(text);
            let grown = buffer.len_with(seg_len);
            if !buffer.is_empty() && grown > max && (buffer.len >= min || grown > limit) {
                if buffer.has_fresh() {
                    out.push(buffer.to_chunk(doc_id, page, out.len()));
                    buffer = buffer.overlap(text, self.config.overlap_size);
                } else {
                    buffer = Buffer::default();
                }
                if buffer.len_with(seg_len) > limit {
                    buffer = Buffer::default();
                }
            }
            buffer.push(segment, seg_len);
        }

        if buffer.has_fresh() {
            out.push(buffer.to_chunk(doc_id, page, out.len()));
        }
    }
}

/// Segments waiting to become a chunk, with the length of their joined text.
///
/// The first `seeded` segments were carried over from the previous chunk.
#[derive(Debug, Default)]
struct Buffer {
    segments: Vec<Segment>,
    len: usize,
    seeded: usize,
}

impl Buffer {
    fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the buffer holds text not already emitted.
    fn has_fresh(&self) -> bool {
        self.segments.len() > self.seeded
    }

    fn len_with(&self, seg_len: usize) -> usize {
        if self.is_empty() {
            seg_len
        } else {
            self.len + 1 + seg_len
        }
    }

    fn push(&mut self, segment: Segment, seg_len: usize) {
        self.len = self.len_with(seg_len);
        self.segments.push(segment);
    }

    fn joined(&self, text: &str) -> String {
        self.segments
            .iter()
            .map(|s| s.as_str(text))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_chunk(&self, doc_id: &str, page: &Page, index: usize) -> Chunk {
        let text = page.text.as_str();
        let body = self.joined(text);
        let (first, last) = match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => (first.start, last.end),
            _ => (0, 0),
        };
        let char_count = body.chars().count();

        Chunk {
            chunk_id: Chunk::make_id(doc_id, index),
            doc_id: doc_id.to_string(),
            page_number: page.number,
            start_char: char_offset(text, first),
            end_char: char_offset(text, last),
            token_estimate: (char_count / 4).max(1),
            chunk_index: index,
            text: body,
        }
    }

    /// Seed for the next buffer.
    ///
    /// The whole buffer if it fits in `overlap`; else its last segment if that
    /// fits; else the trailing `overlap` characters, advanced past the first
    /// space so the seed starts on a word.
    fn overlap(&self, text: &str, overlap: usize) -> Buffer {
        if overlap == 0 {
            return Buffer::default();
        }
        if self.len <= overlap {
            return Buffer::from_segments(text, self.segments.clone());
        }
        if let [_, .., last] = self.segments.as_slice() {
            if last.char_len(text) <= overlap {
                return Buffer::from_segments(text, vec![*last]);
            }
        }

        // Joined text as (char, page byte offset); `None` marks a joining space.
        let mut flat: Vec<(char, Option<usize>)> = Vec::with_capacity(self.len);
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                flat.push((' ', None));
            }
            flat.extend(
                segment
                    .as_str(text)
                    .char_indices()
                    .map(|(offset, c)| (c, Some(segment.start + offset))),
            );
        }

        let mut tail = &flat[flat.len().saturating_sub(overlap)..];
        if let Some(space) = tail.iter().position(|(c, _)| *c == ' ') {
            if space > 0 {
                tail = &tail[space + 1..];
            }
        }

        let mut segments = Vec::new();
        let mut current: Option<Segment> = None;
        for &(c, pos) in tail {
            match pos {
                Some(pos) if !c.is_whitespace() => {
                    let end = pos + c.len_utf8();
                    current = Some(match current {
                        Some(seg) => Segment::new(seg.start, end),
                        None => Segment::new(pos, end),
                    });
                }
                Some(_) => {}
                None => segments.extend(current.take()),
            }
        }
        segments.extend(current);

        Buffer::from_segments(text, segments)
    }

    /// A seed buffer made of carried-over segments.
    fn from_segments(text: &str, segments: Vec<Segment>) -> Buffer {
        let mut buffer = Buffer::default();
        for segment in segments {
            let seg_len = segment.char_len(text);
            buffer.push(segment, seg_len);
        }
        buffer.seeded = buffer.segments.len();
        buffer
    }
}

fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}
