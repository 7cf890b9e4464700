//! Overlapping sentence-window chunker.

use super::sentence::split_sentences;
use super::ChunkingConfig;
use std::ops::Range;

/// A chunk borrowed from the text it was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan<'a> {
    /// The chunk text, an exact slice of the input.
    pub text: &'a str,
    /// Byte offset of the chunk start in the input.
    pub start: usize,
    /// Byte offset one past the chunk end in the input.
    pub end: usize,
}

impl ChunkSpan<'_> {
    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Greedy sentence-window chunker.
///
/// Sentences are accumulated until the next one would push the chunk past
/// `chunk_size` characters. Each following chunk starts with the trailing
/// sentences of the previous chunk that fit in `overlap` characters.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    config: ChunkingConfig,
}

impl SentenceChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Iterate over the chunks of `text`.
    ///
    /// The iterator is lazy and `Clone`, so a partially consumed sequence can
    /// be restarted from any saved point.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        let sentences = split_sentences(text);
        let lengths = sentences.iter().map(|r| text[r.clone()].chars().count()).collect();

        Chunks {
            text,
            sentences,
            lengths,
            next: 0,
            carry: 0,
            chunk_size: self.config.chunk_size,
            overlap: self.config.overlap,
        }
    }
}

/// Iterator returned by [`SentenceChunker::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    sentences: Vec<Range<usize>>,
    lengths: Vec<usize>,
    /// First sentence not yet emitted.
    next: usize,
    /// First sentence carried over as overlap into the next chunk.
    carry: usize,
    chunk_size: usize,
    overlap: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = ChunkSpan<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let count = self.sentences.len();
        if self.next >= count {
            return None;
        }

        let mut first = self.carry;
        let mut len: usize = self.lengths[first..self.next].iter().sum();

        // Every chunk carries at least one new sentence; overlap goes first.
        if first < self.next && len + self.lengths[self.next] > self.chunk_size {
            first = self.next;
            len = 0;
        }

        let mut end = self.next;
        len += self.lengths[end];
        end += 1;
        while end < count && len + self.lengths[end] <= self.chunk_size {
            len += self.lengths[end];
            end += 1;
        }

        // Never carry the whole chunk, or the window could stop advancing.
        let mut carry = end;
        let mut carried = 0;
        while carry > first + 1 && carried + self.lengths[carry - 1] <= self.overlap {
            carry -= 1;
            carried += self.lengths[carry];
        }

        self.next = end;
        self.carry = carry;

        let start = self.sentences[first].start;
        let stop = self.sentences[end - 1].end;
        Some(ChunkSpan {
            text: &self.text[start..stop],
            start,
            end: stop,
        })
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(chunk_size: usize, overlap: usize) -> SentenceChunker {
        SentenceChunker::new(ChunkingConfig {
            chunk_size,
            overlap,
        })
    }

    /// Stitch chunks back together, dropping the part each chunk shares with
    /// the previous one.
    fn reconstruct(spans: &[ChunkSpan<'_>]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for span in spans {
            assert!(span.start <= covered, "gap before chunk at {}", span.start);
            out.push_str(&span.text[covered.saturating_sub(span.start)..]);
            covered = span.end;
        }
        out
    }

    const LESSON: &str = "Vector databases store embeddings. They support similarity search. \
        Each query is embedded first. Results are ranked by cosine similarity. \
        Filters narrow the candidate set. Dr. Smith explains the trade-offs. \
        Recall drops when filters are too strict. Latency is usually fine. \
        Indexes can be rebuilt at any time. That concludes the lesson.";

    #[test]
    fn test_single_chunk_when_everything_fits() {
        let body = "Sentence one. Sentence two. Sentence three.";
        let chunks: Vec<_> = chunker(800, 100).chunks(body).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, body);
    }

    #[test]
    fn test_empty_body_yields_nothing() {
        assert_eq!(chunker(800, 100).chunks("").count(), 0);
        assert_eq!(chunker(800, 100).chunks("   ").count(), 0);
    }

    #[test]
    fn test_chunks_respect_size_bound() {
        for (size, overlap) in [(60, 20), (80, 30), (120, 0), (150, 60)] {
            let chunks: Vec<_> = chunker(size, overlap).chunks(LESSON).collect();
            assert!(chunks.len() > 1);
            for chunk in &chunks {
                assert!(
                    chunk.char_len() <= size,
                    "chunk of {} chars exceeds {}",
                    chunk.char_len(),
                    size
                );
            }
        }
    }

    #[test]
    fn test_reconstruction_after_removing_overlap() {
        for (size, overlap) in [(60, 20), (80, 30), (120, 0), (150, 60), (10_000, 100)] {
            let chunks: Vec<_> = chunker(size, overlap).chunks(LESSON).collect();
            assert_eq!(reconstruct(&chunks), LESSON, "size={} overlap={}", size, overlap);
        }
    }

    #[test]
    fn test_overlap_is_bounded_and_present() {
        let chunks: Vec<_> = chunker(120, 50).chunks(LESSON).collect();
        let mut saw_overlap = false;
        for pair in chunks.windows(2) {
            assert!(pair[1].start <= pair[0].end);
            let shared = &LESSON[pair[1].start..pair[0].end];
            assert!(shared.chars().count() <= 50);
            assert!(pair[0].text.ends_with(shared));
            assert!(pair[1].text.starts_with(shared));
            saw_overlap |= !shared.is_empty();
        }
        assert!(saw_overlap);
    }

    #[test]
    fn test_no_overlap_when_disabled() {
        let chunks: Vec<_> = chunker(80, 0).chunks(LESSON).collect();
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start, pair[0].end);
        }
    }

    #[test]
    fn test_oversized_sentence_is_emitted_whole() {
        let long = "This single sentence is deliberately much longer than the configured chunk size.";
        let body = format!("Short one. {} Short two.", long);
        let chunks: Vec<_> = chunker(30, 10).chunks(&body).collect();

        assert!(chunks.iter().any(|c| c.text.trim_end() == long));
        assert_eq!(reconstruct(&chunks), body);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let mut chunks = chunker(80, 30).chunks(LESSON);
        let first = chunks.next().unwrap();
        let saved = chunks.clone();

        let rest: Vec<_> = chunks.collect();
        let replay: Vec<_> = saved.collect();
        assert_eq!(rest, replay);

        let again: Vec<_> = chunker(80, 30).chunks(LESSON).collect();
        assert_eq!(again[0], first);
    }
}
