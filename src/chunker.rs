//! Character-window text chunking with overlap.
//!
//! Section texts routinely exceed what an embedding model accepts in one
//! call, so they are split into bounded segments with a fixed overlap so
//! that context spanning a boundary appears in both neighbouring chunks.

use crate::errors::IngestError;

/// Default maximum chunk length in characters.
pub const DEFAULT_MAX_CHARS: usize = 1000;

/// Default overlap carried between consecutive chunks.
pub const DEFAULT_OVERLAP: usize = 200;

/// Splits text into ordered, size-bounded, overlapping segments.
///
/// Invariants:
/// - every segment is at most `max_chars` characters;
/// - consecutive segments share exactly `overlap` characters of context
///   (except possibly the last, which may be shorter);
/// - segments appear in source order, and concatenating the first segment
///   with each subsequent segment minus its leading `overlap` characters
///   reconstructs the input exactly;
/// - empty input yields no segments, non-empty input yields at least one.
#[derive(Debug, Clone)]
pub struct TextChunker {
    max_chars: usize,
    overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl TextChunker {
    /// Create a chunker, validating that the window can always advance.
    pub fn new(max_chars: usize, overlap: usize) -> Result<Self, IngestError> {
        if max_chars == 0 {
            return Err(IngestError::Chunking(
                "max_chars must be greater than zero".into(),
            ));
        }
        if overlap >= max_chars {
            return Err(IngestError::Chunking(format!(
                "overlap ({overlap}) must be smaller than max_chars ({max_chars})"
            )));
        }
        Ok(Self { max_chars, overlap })
    }

    /// Maximum segment length in characters.
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Overlap between consecutive segments in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered overlapping segments.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.max_chars {
            return vec![text.to_string()];
        }

        let stride = self.max_chars - self.overlap;
        let mut chunks = Vec::with_capacity(chars.len() / stride + 1);
        let mut start = 0;

        while start < chars.len() {
            let end = usize::min(start + self.max_chars, chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reassemble(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            if idx == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn empty_input_yields_no_segments() {
        let chunker = TextChunker::default();
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn short_input_yields_single_segment() {
        let chunker = TextChunker::new(100, 20).unwrap();
        let chunks = chunker.chunk("material agreement signed");
        assert_eq!(chunks, vec!["material agreement signed".to_string()]);
    }

    #[test]
    fn long_input_respects_bounds_and_order() {
        let chunker = TextChunker::new(10, 3).unwrap();
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunker.chunk(text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10);
        }
        // Consecutive chunks share the overlap region.
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().skip(pair[0].chars().count() - 3).collect();
            let head: String = pair[1].chars().take(3).collect();
            assert_eq!(tail, head);
        }
        assert_eq!(reassemble(&chunks, 3), text);
    }

    #[test]
    fn rejects_degenerate_parameters() {
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(10, 10).is_err());
        assert!(TextChunker::new(10, 15).is_err());
    }

    proptest! {
        #[test]
        fn prop_reassembly_is_lossless(
            text in ".{0,400}",
            max_chars in 2usize..64,
            overlap_frac in 0usize..100,
        ) {
            let overlap = overlap_frac * (max_chars - 1) / 100;
            let chunker = TextChunker::new(max_chars, overlap).unwrap();
            let chunks = chunker.chunk(&text);

            if text.is_empty() {
                prop_assert!(chunks.is_empty());
            } else {
                prop_assert!(!chunks.is_empty());
                prop_assert_eq!(reassemble(&chunks, overlap), text);
                for chunk in &chunks {
                    prop_assert!(chunk.chars().count() <= max_chars);
                }
            }
        }
    }
}
