//! crates/flashcards_core/src/chunker.rs
//!
//! Splits extracted text into overlapping windows. Sizes are measured in chars.

use crate::domain::Chunk;

pub const DEFAULT_CHUNK_SIZE: usize = 1500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChunkerError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// A fixed-size sliding window splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkerError> {
        if size == 0 {
            return Err(ChunkerError::ZeroSize);
        }
        if overlap >= size {
            return Err(ChunkerError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Splits `text` into chunks of at most `size` chars, each sharing exactly
    /// `overlap` chars with its predecessor.
    ///
    /// The window stops as soon as it reaches the end of the text, so the last
    /// chunk is never a suffix of the one before it.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let step = self.size - self.overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < total {
            let end = (start + self.size).min(total);
            chunks.push(Chunk {
                index: chunks.len(),
                text: chars[start..end].iter().collect(),
                overlap: if start == 0 { 0 } else { self.overlap },
            });
            if end == total {
                break;
            }
            start += step;
        }
        chunks
    }
}

/// Rebuilds the original text from a chunk sequence by dropping each overlap.
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    for chunk in chunks {
        text.extend(chunk.text.chars().skip(chunk.overlap));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(Chunker::new(0, 0), Err(ChunkerError::ZeroSize));
        assert_eq!(
            Chunker::new(10, 10),
            Err(ChunkerError::OverlapTooLarge {
                size: 10,
                overlap: 10
            })
        );
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(Chunker::default().split("").is_empty());
    }

    #[test]
    fn short_text_yields_one_chunk() {
        let chunks = Chunker::new(100, 10).unwrap().split("Paris is the capital of France.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].overlap, 0);
        assert_eq!(chunks[0].text, "Paris is the capital of France.");
    }

    #[test]
    fn consecutive_chunks_share_the_overlap() {
        let chunker = Chunker::new(4, 2).unwrap();
        let chunks = chunker.split("abcdefghij");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["abcd", "cdef", "efgh", "ghij"]);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].text.chars().skip(2).collect();
            let head: String = pair[1].text.chars().take(2).collect();
            assert_eq!(tail, head);
            assert_eq!(pair[1].overlap, 2);
        }
    }

    #[test]
    fn last_chunk_is_not_contained_in_previous() {
        let chunks = Chunker::new(5, 2).unwrap().split("abcdefgh");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["abcde", "defgh"]);
    }

    #[test]
    fn counts_chars_not_bytes() {
        let chunks = Chunker::new(3, 1).unwrap().split("héllo wörld");
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 3));
        assert_eq!(reassemble(&chunks), "héllo wörld");
    }

    #[test]
    fn split_is_deterministic() {
        let chunker = Chunker::new(7, 3).unwrap();
        let text = "The mitochondria is the powerhouse of the cell.";
        assert_eq!(chunker.split(text), chunker.split(text));
    }

    proptest! {
        #[test]
        fn reassembly_reproduces_input(
            text in "\\PC{1,400}",
            size in 1usize..64,
            overlap_seed in 0usize..64,
        ) {
            let overlap = overlap_seed % size;
            let chunker = Chunker::new(size, overlap).unwrap();
            let chunks = chunker.split(&text);
            prop_assert!(!chunks.is_empty());
            prop_assert_eq!(reassemble(&chunks), text);
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.index, i);
                prop_assert!(chunk.text.chars().count() <= size);
            }
        }
    }
}
