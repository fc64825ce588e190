//! Boundary-aware text chunking for prompt-size-limited consumers.
//!
//! Windows are measured in characters, not bytes. A window that does not
//! reach the end of the text is shortened to end just after the last `.` or
//! `\n` it contains, provided that break lies in the back half of the window.

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};

/// Character offsets `[start, end)` of one window before trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub start: usize,
    pub end: usize,
}

impl ChunkSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    pub const DEFAULT_CHUNK_SIZE: usize = 1000;
    pub const DEFAULT_OVERLAP: usize = 200;

    /// Fails with `InvalidChunkConfig` unless `0 <= overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(Error::InvalidChunkConfig {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Window positions over `text`, in order. Consecutive spans share
    /// `overlap` characters, except where a shortened window would stall.
    pub fn spans(&self, text: &str) -> Vec<ChunkSpan> {
        let chars: Vec<char> = text.chars().collect();
        self.spans_of(&chars)
    }

    /// Trimmed chunks in order. Whitespace-only windows are dropped.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        self.spans_of(&chars)
            .into_iter()
            .filter_map(|span| {
                let window: String = chars[span.start..span.end].iter().collect();
                let trimmed = window.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect()
    }

    fn spans_of(&self, chars: &[char]) -> Vec<ChunkSpan> {
        let len = chars.len();
        let mut spans = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = (start + self.chunk_size).min(len);

            if end < len {
                let break_point = chars[start..end]
                    .iter()
                    .rposition(|c| *c == '.' || *c == '\n');
                if let Some(offset) = break_point {
                    if offset > self.chunk_size / 2 {
                        end = start + offset + 1;
                    }
                }
            }

            spans.push(ChunkSpan { start, end });

            if end >= len {
                break;
            }

            // A shortened window can be narrower than the overlap
            let next = end.saturating_sub(self.overlap);
            start = next.max(start + 1);
        }

        spans
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            overlap: Self::DEFAULT_OVERLAP,
        }
    }
}

/// Split `text` with the given parameters.
pub fn extract_text_chunks(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(TextChunker::new(chunk_size, overlap)?.chunk(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sentences(total_chars: usize) -> String {
        "The applicant must provide certified evidence. "
            .repeat(total_chars / 40 + 1)
            .chars()
            .take(total_chars)
            .collect()
    }

    fn reconstruct(text: &str, spans: &[ChunkSpan]) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::new();
        let mut covered = 0;
        for span in spans {
            if span.end > covered {
                let from = span.start.max(covered);
                out.extend(&chars[from..span.end]);
                covered = span.end;
            }
        }
        out
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_chunk_size() {
        for (size, overlap) in [(100, 100), (100, 150), (0, 0)] {
            let err = TextChunker::new(size, overlap).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidChunkConfig);
        }
        assert!(TextChunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let chunker = TextChunker::default();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.spans("").is_empty());
        assert!(chunker.chunk("   \n\t ").is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = TextChunker::default();
        assert_eq!(chunker.chunk("  Part 1. Information About You  "), vec![
            "Part 1. Information About You".to_string()
        ]);
    }

    #[test]
    fn test_2500_chars_break_on_sentence_boundaries() {
        let text = sentences(2500);
        let chunker = TextChunker::new(1000, 200).unwrap();
        let spans = chunker.spans(&text);
        let chunks = chunker.chunk(&text);

        assert!(spans.len() >= 3);
        for span in &spans[..spans.len() - 1] {
            assert!(span.len() <= 1000);
            assert!(span.len() > 500, "break must lie in the back half");
        }
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.ends_with('.'), "chunk should end on a period: {chunk:?}");
        }
        assert_eq!(spans.last().unwrap().end, text.chars().count());
    }

    #[test]
    fn test_consecutive_spans_share_overlap() {
        let text = sentences(2500);
        let spans = TextChunker::new(1000, 200).unwrap().spans(&text);
        for pair in spans.windows(2) {
            assert_eq!(pair[1].start, pair[0].end - 200);
        }
    }

    #[test]
    fn test_break_in_front_half_keeps_full_window() {
        // Only period sits at offset 10 of a 100-char window
        let text = format!("Intro text.{}", "x".repeat(300));
        let spans = TextChunker::new(100, 0).unwrap().spans(&text);
        assert_eq!(spans[0], ChunkSpan { start: 0, end: 100 });
    }

    #[test]
    fn test_newline_counts_as_boundary() {
        let text = format!("{}\n{}", "a".repeat(70), "b".repeat(100));
        let spans = TextChunker::new(100, 10).unwrap().spans(&text);
        assert_eq!(spans[0].end, 71);
        assert_eq!(spans[1].start, 61);
    }

    #[test]
    fn test_zero_overlap_tiles_input_exactly() {
        let text = sentences(3333);
        let spans = TextChunker::new(700, 0).unwrap().spans(&text);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans.last().unwrap().end, text.chars().count());
        for pair in spans.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        let chars: Vec<char> = text.chars().collect();
        let joined: String = spans
            .iter()
            .map(|s| chars[s.start..s.end].iter().collect::<String>())
            .collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn test_non_overlapping_portions_reconstruct_input() {
        let text = format!("  {}\n\n{}  ", sentences(1800), sentences(900));
        for (size, overlap) in [(1000, 200), (300, 299), (64, 16)] {
            let spans = TextChunker::new(size, overlap).unwrap().spans(&text);
            assert_eq!(reconstruct(&text, &spans), text);
        }
    }

    #[test]
    fn test_trimmed_chunks_rejoin_to_trimmed_input() {
        // No interior whitespace, so trimming only touches the outer edges
        let body = "Part-1.Information-About-You.Filing-Fee-Instructions.".repeat(30);
        let text = format!("  \n{body}\n  ");
        let chunker = TextChunker::new(120, 0).unwrap();

        let chunks = chunker.chunk(&text);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text.trim());
        assert!(chunks.iter().all(|c| c.chars().count() <= 120));
    }

    #[test]
    fn test_large_overlap_still_terminates() {
        // Shortened windows (61 chars) are narrower than the 90-char overlap
        let text = format!("{}.", "y".repeat(60)).repeat(40);
        let spans = TextChunker::new(100, 90).unwrap().spans(&text);
        assert_eq!(spans.last().unwrap().end, text.chars().count());
        for pair in spans.windows(2) {
            assert!(pair[1].start > pair[0].start);
        }
    }

    #[test]
    fn test_multibyte_text_is_char_indexed() {
        let text = "é".repeat(250);
        let chunks = extract_text_chunks(&text, 100, 20).unwrap();
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        assert_eq!(chunks[0].chars().count(), 100);
    }
}
