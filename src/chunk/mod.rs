//! Text chunking
//!
//! Splits text into fixed-size character windows:
//! - Windows are not aligned to words or sentences
//! - Each window is trimmed; blank windows are dropped
//! - Output is deterministic for a given `max_chars`

use crate::config::ChunkConfig;

/// Fixed-window chunker
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_chars: usize,
}

impl Chunker {
    /// Create a chunker; a zero window size is treated as one
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    pub fn from_config(config: &ChunkConfig) -> Self {
        Self::new(config.max_chars)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split `text` into ordered, trimmed, non-empty chunks
    pub fn chunk(&self, text: &str) -> Vec<String> {
        windows(text, self.max_chars)
            .filter_map(|window| {
                let trimmed = window.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from_config(&ChunkConfig::default())
    }
}

/// Split `text` into windows of `max_chars`
pub fn chunk(text: &str, max_chars: usize) -> Vec<String> {
    Chunker::new(max_chars).chunk(text)
}

/// Consecutive windows of at most `size` characters, cut on char boundaries
fn windows(text: &str, size: usize) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let cut = rest
            .char_indices()
            .nth(size)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(cut);
        rest = tail;
        Some(head)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(chunk("  hello world  ", 1000), vec!["hello world"]);
    }

    #[test]
    fn test_exact_windows() {
        let text = "a".repeat(2500);
        let chunks = chunk(&text, 1000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1000);
        assert_eq!(chunks[2].len(), 500);
    }

    #[test]
    fn test_blank_windows_dropped() {
        let text = format!("{}{}{}", "x".repeat(10), " ".repeat(10), "y".repeat(5));
        let chunks = chunk(&text, 10);
        assert_eq!(chunks, vec!["x".repeat(10), "y".repeat(5)]);
    }

    #[test]
    fn test_count_matches_non_blank_windows() {
        let text = "alpha \n\n\n\n\n\n\n\n\n\n\n\n beta gamma \t\t\t\t\t\t\t\t delta";
        let size = 7;
        let expected = windows(text, size).filter(|w| !w.trim().is_empty()).count();
        assert_eq!(chunk(text, size).len(), expected);
    }

    #[test]
    fn test_deterministic() {
        let text = "The mitochondria is the powerhouse of the cell. ".repeat(50);
        let chunker = Chunker::new(120);
        assert_eq!(chunker.chunk(&text), chunker.chunk(&text));
    }

    #[test]
    fn test_multibyte_characters_not_split() {
        let text = "é".repeat(15);
        let chunks = chunk(&text, 4);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].chars().count(), 4);
        assert_eq!(chunks[3].chars().count(), 3);
    }

    #[test]
    fn test_empty_and_zero_size() {
        assert!(chunk("", 10).is_empty());
        assert!(chunk("   \n\t ", 10).is_empty());
        assert_eq!(chunk("abc", 0), vec!["a", "b", "c"]);
    }
}
