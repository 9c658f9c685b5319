use crate::chunk::Chunk;
use anyhow::{Result, ensure};
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum window size in grapheme clusters.
    pub chunk_size: usize,
    /// Overlap between consecutive windows, in grapheme clusters.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Overlap must be strictly smaller than the window so every window
    /// starts after the previous one and the split always terminates.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        ensure!(config.chunk_size > 0, "chunk_size must be positive");
        ensure!(
            config.chunk_overlap < config.chunk_size,
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            config.chunk_overlap,
            config.chunk_size
        );
        Ok(Self { config })
    }

    /// Split text into overlapping windows with stable, position-derived ids.
    ///
    /// Empty input yields a single empty chunk so every document is
    /// represented in the graph.
    pub fn split(&self, doc_id: &str, text: &str, source: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return vec![Chunk::new(doc_id, 0, String::new(), source)];
        }

        // Byte offsets of grapheme boundaries, so windows never cut a
        // cluster in half.
        let mut bounds: Vec<usize> = text.grapheme_indices(true).map(|(i, _)| i).collect();
        bounds.push(text.len());
        let total = bounds.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut index = 0;

        loop {
            let end = (start + self.config.chunk_size).min(total);
            let window = text[bounds[start]..bounds[end]].to_string();
            chunks.push(Chunk::new(doc_id, index, window, source));
            index += 1;

            if end == total {
                break;
            }
            start = end - self.config.chunk_overlap;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
        .unwrap()
    }

    #[test]
    fn short_text_yields_one_chunk() {
        let chunks = chunker(800, 100).split("d", "hello world", "a.txt");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
    }

    #[test]
    fn empty_text_yields_one_empty_chunk() {
        let chunks = chunker(800, 100).split("d", "", "a.txt");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
        assert_eq!(chunks[0].chunk_id, "d#0");
    }

    #[test]
    fn chunk_count_matches_window_arithmetic() {
        // ceil((L - O) / (W - O)) chunks for L > W
        let text = "x".repeat(1500);
        let chunks = chunker(800, 100).split("d", &text, "a.txt");
        assert_eq!(chunks.len(), 2);

        let text = "x".repeat(2200);
        let chunks = chunker(800, 100).split("d", &text, "a.txt");
        // ceil(2100 / 700) = 3
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn windows_overlap_and_cover_the_text() {
        let text: String = (0..50).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunker(20, 5).split("d", &text, "a.txt");

        // Reassemble by dropping the overlapping prefix of every window
        // after the first; the result must be the original text.
        let mut rebuilt = chunks[0].text.clone();
        for chunk in &chunks[1..] {
            rebuilt.push_str(&chunk.text[5..]);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn ids_are_stable_across_invocations() {
        let text = "y".repeat(3000);
        let c = chunker(800, 100);
        let first: Vec<String> = c.split("d", &text, "a.txt").into_iter().map(|c| c.chunk_id).collect();
        let second: Vec<String> = c.split("d", &text, "a.txt").into_iter().map(|c| c.chunk_id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn overlap_must_be_smaller_than_window() {
        assert!(
            Chunker::new(ChunkerConfig {
                chunk_size: 100,
                chunk_overlap: 100,
            })
            .is_err()
        );
    }
}
