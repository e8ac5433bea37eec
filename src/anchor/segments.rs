//! Probe segment extraction from captured text.

use crate::domain::Segment;

use super::text::normalize_whitespace;
use super::AnchorError;

/// Captured text below this many normalized characters is not worth probing
pub const MIN_INPUT_CHARS: usize = 10;

/// Sentences need at least this many trimmed characters to become a segment
pub const MIN_SENTENCE_CHARS: usize = 16;

/// At most this many sentence segments are produced
pub const MAX_SEGMENTS: usize = 3;

/// Length of the first-chunk fallback segment
pub const FALLBACK_CHARS: usize = 100;

/// Derives probe segments from captured snippet text
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentExtractor;

impl SegmentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Split captured text into up to three sentence segments.
    ///
    /// Falls back to the first 100 normalized characters when no sentence is
    /// long enough. Returned segments may still be shorter than
    /// [`Segment::MIN_CHARS`]; callers skip those.
    pub fn extract(&self, text: &str) -> Result<Vec<Segment>, AnchorError> {
        let clean = normalize_whitespace(text);
        let len = clean.chars().count();
        if len < MIN_INPUT_CHARS {
            return Err(AnchorError::InputTooShort {
                len,
                min: MIN_INPUT_CHARS,
            });
        }

        let sentences: Vec<Segment> = clean
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
            .take(MAX_SEGMENTS)
            .map(Segment::new)
            .collect();

        if !sentences.is_empty() {
            return Ok(sentences);
        }

        let chunk: String = clean.chars().take(FALLBACK_CHARS).collect();
        Ok(vec![Segment::new(chunk)])
    }

    /// Segments long enough to be used by the matching tiers
    pub fn usable(&self, text: &str) -> Result<Vec<Segment>, AnchorError> {
        let segments: Vec<Segment> = self
            .extract(text)?
            .into_iter()
            .filter(Segment::is_usable)
            .collect();

        if segments.is_empty() {
            let len = normalize_whitespace(text).chars().count();
            return Err(AnchorError::InputTooShort {
                len,
                min: Segment::MIN_CHARS,
            });
        }
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(segments: &[Segment]) -> Vec<&str> {
        segments.iter().map(Segment::as_str).collect()
    }

    #[test]
    fn test_sentence_segments_limited_to_three() {
        let text = "The first sentence is long enough. Short one! \
                    Second qualifying sentence here? Third qualifying sentence here. \
                    Fourth qualifying sentence here.";
        let segments = SegmentExtractor::new().extract(text).unwrap();
        assert_eq!(
            texts(&segments),
            vec![
                "The first sentence is long enough",
                "Second qualifying sentence here",
                "Third qualifying sentence here",
            ]
        );
    }

    #[test]
    fn test_whitespace_is_collapsed_before_splitting() {
        let text = "  Ownership   rules\n\tgovern memory in Rust.  ";
        let segments = SegmentExtractor::new().extract(text).unwrap();
        assert_eq!(texts(&segments), vec!["Ownership rules govern memory in Rust"]);
    }

    #[test]
    fn test_fallback_to_first_hundred_chars() {
        // no sentence reaches sixteen characters, so the first chunk is used
        let text = "Tiny bit. Small bit. ".repeat(10);
        let segments = SegmentExtractor::new().extract(&text).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].char_len(), FALLBACK_CHARS);
        assert!(segments[0].as_str().starts_with("Tiny bit. Small bit."));
    }

    #[test]
    fn test_short_input_rejected() {
        let err = SegmentExtractor::new().extract("  hi there ").unwrap_err();
        assert!(matches!(err, AnchorError::InputTooShort { len: 8, .. }));
    }

    #[test]
    fn test_usable_drops_short_fallback() {
        // twelve characters: passes the input floor, but the fallback segment is too short
        let err = SegmentExtractor::new().usable("a, b, c, d e").unwrap_err();
        assert!(matches!(err, AnchorError::InputTooShort { .. }));
    }
}
