//! Core data model: `Span` and `RedactionMode`.

use serde::{Deserialize, Serialize};

/// A half-open byte range recognized as belonging to a sensitive category,
/// together with its entity type, confidence, and the recognizer that
/// produced it.
///
/// Invariant: `0 <= start < end <= text.len()`, and both offsets fall on
/// UTF-8 character boundaries (true of every regex match and of every
/// `EntityAnalyzer` span by construction).
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub entity_type: String,
    pub confidence: f32,
    pub recognizer_id: String,
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        entity_type: impl Into<String>,
        confidence: f32,
        recognizer_id: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            entity_type: entity_type.into(),
            confidence,
            recognizer_id: recognizer_id.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether this span shares any character with `other`.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Redaction strategy applied by the Tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionMode {
    /// Generic type-only placeholder: `[ENTITY_TYPE]`.
    Mask,
    /// Type + per-session ordinal suffix: `[ENTITY_TYPE_A]`.
    Replace,
    /// A plausible surrogate value of the same entity type.
    Synthetic,
    /// Irreversible 16-hex-char SHA-256 prefix of the surface value.
    Hash,
}

impl Default for RedactionMode {
    fn default() -> Self {
        RedactionMode::Replace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_detection() {
        let a = Span::new(0, 5, "PERSON", 0.9, "r1");
        let b = Span::new(4, 8, "PERSON", 0.9, "r1");
        let c = Span::new(5, 8, "PERSON", 0.9, "r1");
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c), "adjacent, non-overlapping spans must not overlap");
    }

    #[test]
    fn default_mode_is_replace() {
        assert_eq!(RedactionMode::default(), RedactionMode::Replace);
    }
}
