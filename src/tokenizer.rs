//! Component 4.D: the Deterministic Tokenizer.
//!
//! Rewrites resolved spans into their redacted form, left to right, and
//! records the surface-to-token mapping the Vault will later persist. Spans
//! passed in are assumed already resolved (non-overlapping, ascending by
//! `start`) by [`crate::resolver`].

use crate::error::{AegisError, Result};
use crate::policy::normalize_surface;
use crate::span::{RedactionMode, Span};
use ring::digest::{digest, SHA256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entity the Tokenizer redacted: the token it wrote into the output,
/// the original surface text, and the entity type — everything the Vault
/// needs to build a `SessionMapping` entry.
///
/// `record_forward`/`record_reverse` tell the Vault which directions of the
/// mapping, if any, are worth persisting for this mode (§4.D "Vault
/// write"): REPLACE and SYNTHETIC get both directions, MASK gets only the
/// forward direction (it is deliberately not a bijection — many surfaces
/// share one token — so a reverse lookup would be meaningless), and HASH
/// gets neither: it is irreversible by design and the Vault never learns
/// about it.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenMapping {
    pub token: String,
    pub surface: String,
    pub entity_type: String,
    pub record_forward: bool,
    pub record_reverse: bool,
}

#[derive(Debug, Clone)]
pub struct TokenizationResult {
    pub output: String,
    pub mappings: Vec<TokenMapping>,
}

/// Per-session state the Tokenizer needs across calls: the REPLACE mode's
/// per-entity-type ordinal assignment. Every other mode is a pure function
/// of `(session_id, entity_type, normalized_surface)` and needs no state.
///
/// Held by the session owner (the Vault's `VaultSession`, in practice) and
/// threaded through successive `tokenize` calls so the bijection invariant —
/// the same normalized surface always gets the same label within a session —
/// holds across an entire conversation, not just one call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizerState {
    ordinals: HashMap<String, HashMap<String, u32>>,
    next_ordinal: HashMap<String, u32>,
}

impl TokenizerState {
    pub fn new() -> Self {
        Self::default()
    }

    fn ordinal_for(&mut self, entity_type: &str, normalized_surface: &str) -> u32 {
        if let Some(existing) = self
            .ordinals
            .get(entity_type)
            .and_then(|m| m.get(normalized_surface))
        {
            return *existing;
        }

        let next = self.next_ordinal.entry(entity_type.to_string()).or_insert(0);
        let assigned = *next;
        *next += 1;

        self.ordinals
            .entry(entity_type.to_string())
            .or_default()
            .insert(normalized_surface.to_string(), assigned);
        assigned
    }
}

/// Rewrite `text`'s resolved `spans` under `mode`, appending new mappings to
/// `state`. Spans must be non-overlapping and ascending by `start`, or this
/// fails closed with [`AegisError::InternalInvariantViolation`] — the
/// resolver's output contract, enforced again here because the Tokenizer is
/// the component that would silently corrupt output text if it were ever
/// violated upstream.
pub fn tokenize(
    text: &str,
    spans: &[Span],
    mode: RedactionMode,
    session_id: &str,
    state: &mut TokenizerState,
) -> Result<TokenizationResult> {
    let mut output = String::with_capacity(text.len());
    let mut mappings = Vec::with_capacity(spans.len());
    let mut cursor = 0usize;

    for span in spans {
        if span.start < cursor || span.end > text.len() {
            return Err(AegisError::InternalInvariantViolation(
                "tokenizer received overlapping or out-of-bounds spans".into(),
            ));
        }

        output.push_str(&text[cursor..span.start]);

        let surface = &text[span.start..span.end];
        let normalized = normalize_surface(surface);
        let token = token_for(mode, session_id, &span.entity_type, &normalized, state);

        output.push_str(&token);
        let (record_forward, record_reverse) = match mode {
            RedactionMode::Mask => (true, false),
            RedactionMode::Replace | RedactionMode::Synthetic => (true, true),
            RedactionMode::Hash => (false, false),
        };
        mappings.push(TokenMapping {
            token,
            surface: surface.to_string(),
            entity_type: span.entity_type.clone(),
            record_forward,
            record_reverse,
        });

        cursor = span.end;
    }

    output.push_str(&text[cursor..]);
    Ok(TokenizationResult { output, mappings })
}

fn entity_alias(entity_type: &str) -> &str {
    match entity_type {
        "PERSON" => "PATIENT",
        "EMAIL_ADDRESS" => "EMAIL",
        "DATE_TIME" => "DATE",
        other => other,
    }
}

fn token_for(
    mode: RedactionMode,
    session_id: &str,
    entity_type: &str,
    normalized_surface: &str,
    state: &mut TokenizerState,
) -> String {
    let alias = entity_alias(entity_type);
    match mode {
        RedactionMode::Mask => format!("[{alias}]"),
        RedactionMode::Replace => {
            let ordinal = state.ordinal_for(entity_type, normalized_surface);
            format!("[{alias}_{}]", ordinal_to_label(ordinal))
        }
        RedactionMode::Synthetic => {
            let seed = seed_from(session_id, entity_type, normalized_surface);
            synthetic_surrogate(entity_type, seed)
        }
        RedactionMode::Hash => {
            format!("[{alias}_{}]", hash_prefix(normalized_surface))
        }
    }
}

/// Bijective base-26 ordinal labeling: 0 -> "A", 25 -> "Z", 26 -> "AA", ...
pub fn ordinal_to_label(ordinal: u32) -> String {
    let mut n = ordinal + 1;
    let mut label = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        label.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).expect("ordinal label is ASCII by construction")
}

fn seed_from(session_id: &str, entity_type: &str, normalized_surface: &str) -> u64 {
    let mut material = Vec::with_capacity(session_id.len() + entity_type.len() + normalized_surface.len() + 2);
    material.extend_from_slice(session_id.as_bytes());
    material.push(0);
    material.extend_from_slice(entity_type.as_bytes());
    material.push(0);
    material.extend_from_slice(normalized_surface.as_bytes());

    let hash = digest(&SHA256, &material);
    let bytes = hash.as_ref();
    u64::from_be_bytes(bytes[0..8].try_into().expect("SHA-256 digest is 32 bytes"))
}

fn hash_prefix(normalized_surface: &str) -> String {
    let hash = digest(&SHA256, normalized_surface.as_bytes());
    hex::encode_upper(&hash.as_ref()[0..8])
}

const FIRST_NAMES: &[&str] = &["Alex", "Jordan", "Taylor", "Morgan", "Casey", "Riley", "Sam", "Drew"];
const LAST_NAMES: &[&str] = &["Rivera", "Chen", "Patel", "Novak", "Osei", "Keller", "Ibarra", "Thorne"];

/// A plausible, deterministically-seeded stand-in of the same entity type.
/// Not reversible without the Vault mapping; not meant to look real under
/// scrutiny, only to not look like a placeholder token.
fn synthetic_surrogate(entity_type: &str, seed: u64) -> String {
    match entity_type {
        "PERSON" => format!(
            "{} {}",
            FIRST_NAMES[(seed % FIRST_NAMES.len() as u64) as usize],
            LAST_NAMES[((seed >> 8) % LAST_NAMES.len() as u64) as usize]
        ),
        "EMAIL_ADDRESS" => format!("user{}@example.com", seed % 100_000),
        "PHONE_NUMBER" => format!("555-{:03}-{:04}", (seed / 10_000) % 1000, seed % 10_000),
        "US_SSN" => format!(
            "{:03}-{:02}-{:04}",
            (seed / 1_000_000) % 1000,
            (seed / 10_000) % 100,
            seed % 10_000
        ),
        "IP_ADDRESS" => format!("10.{}.{}.{}", (seed >> 16) % 256, (seed >> 8) % 256, seed % 256),
        "DATE_TIME" => format!("01/01/19{:02}", seed % 100),
        "CREDIT_CARD" => format!(
            "4111-{:04}-{:04}-{:04}",
            (seed / 100_000_000) % 10_000,
            (seed / 10_000) % 10_000,
            seed % 10_000
        ),
        "URL" => format!("https://example.com/{:x}", seed),
        other => format!("{}_{:x}", other.to_lowercase(), seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_labels_roll_over_like_spreadsheet_columns() {
        assert_eq!(ordinal_to_label(0), "A");
        assert_eq!(ordinal_to_label(25), "Z");
        assert_eq!(ordinal_to_label(26), "AA");
        assert_eq!(ordinal_to_label(27), "AB");
    }

    #[test]
    fn replace_mode_reuses_ordinal_for_same_surface() {
        let text = "John Doe met John Doe again.";
        let spans = vec![
            Span::new(0, 8, "PERSON", 0.9, "r"),
            Span::new(14, 22, "PERSON", 0.9, "r"),
        ];
        let mut state = TokenizerState::new();
        let result = tokenize(text, &spans, RedactionMode::Replace, "sess-1", &mut state).unwrap();
        assert_eq!(result.output, "[PATIENT_A] met [PATIENT_A] again.");
    }

    #[test]
    fn replace_mode_assigns_distinct_ordinals_per_surface() {
        let text = "John Doe and Jane Roe";
        let spans = vec![
            Span::new(0, 8, "PERSON", 0.9, "r"),
            Span::new(13, 21, "PERSON", 0.9, "r"),
        ];
        let mut state = TokenizerState::new();
        let result = tokenize(text, &spans, RedactionMode::Replace, "sess-1", &mut state).unwrap();
        assert_eq!(result.output, "[PATIENT_A] and [PATIENT_B]");
    }

    #[test]
    fn replace_mode_ordinals_are_independent_per_entity_type() {
        let text = "John emailed jane@example.com";
        let spans = vec![
            Span::new(0, 4, "PERSON", 0.9, "r"),
            Span::new(13, 30, "EMAIL_ADDRESS", 0.9, "r"),
        ];
        let mut state = TokenizerState::new();
        let result = tokenize(text, &spans, RedactionMode::Replace, "sess-1", &mut state).unwrap();
        assert_eq!(result.output, "[PATIENT_A] emailed [EMAIL_A]");
    }

    #[test]
    fn mask_mode_is_type_only_and_not_injective() {
        let text = "John Doe and Jane Roe";
        let spans = vec![
            Span::new(0, 8, "PERSON", 0.9, "r"),
            Span::new(13, 21, "PERSON", 0.9, "r"),
        ];
        let mut state = TokenizerState::new();
        let result = tokenize(text, &spans, RedactionMode::Mask, "sess-1", &mut state).unwrap();
        assert_eq!(result.output, "[PATIENT] and [PATIENT]");
    }

    #[test]
    fn hash_mode_is_deterministic_and_sixteen_hex_chars() {
        let text = "John Doe";
        let spans = vec![Span::new(0, 8, "PERSON", 0.9, "r")];
        let mut state = TokenizerState::new();
        let result = tokenize(text, &spans, RedactionMode::Hash, "sess-1", &mut state).unwrap();
        let token = &result.mappings[0].token;
        let inner = token.trim_start_matches("[PATIENT_").trim_end_matches(']');
        assert_eq!(inner.len(), 16);
        assert!(inner.chars().all(|c| c.is_ascii_hexdigit()));

        let mut state2 = TokenizerState::new();
        let result2 = tokenize(text, &spans, RedactionMode::Hash, "sess-1", &mut state2).unwrap();
        assert_eq!(result.output, result2.output);
    }

    #[test]
    fn synthetic_mode_is_deterministic_per_session_and_surface() {
        let text = "John Doe";
        let spans = vec![Span::new(0, 8, "PERSON", 0.9, "r")];
        let mut state = TokenizerState::new();
        let first = tokenize(text, &spans, RedactionMode::Synthetic, "sess-1", &mut state).unwrap();
        let mut state2 = TokenizerState::new();
        let second = tokenize(text, &spans, RedactionMode::Synthetic, "sess-1", &mut state2).unwrap();
        assert_eq!(first.output, second.output);
        assert_ne!(first.output, text);
    }

    #[test]
    fn overlapping_spans_are_rejected() {
        let text = "John Doe";
        let spans = vec![
            Span::new(0, 8, "PERSON", 0.9, "r"),
            Span::new(4, 8, "PERSON", 0.9, "r"),
        ];
        let mut state = TokenizerState::new();
        let result = tokenize(text, &spans, RedactionMode::Mask, "sess-1", &mut state);
        assert!(matches!(result, Err(AegisError::InternalInvariantViolation(_))));
    }
}
