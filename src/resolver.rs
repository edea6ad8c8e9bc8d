//! Component 4.C: the Span Resolver.
//!
//! Turns the raw, possibly-overlapping union of spans the registry produced
//! into a non-overlapping, ascending-by-start sequence, applying the
//! confidence threshold and the deterministic tie-break order from the
//! design.

use crate::error::{AegisError, Result};
use crate::span::Span;

/// Entity types with an explicit tie-break priority, highest first. Anything
/// not listed here falls back to alphabetical order, ranked after all of
/// these.
const PRIORITY_ORDER: &[&str] = &[
    "SECRET_KEY",
    "US_SSN",
    "MRN",
    "CREDIT_CARD",
    "EMAIL_ADDRESS",
    "PHONE_NUMBER",
    "IP_ADDRESS",
    "PERSON",
    "DATE_TIME",
    "URL",
];

fn priority_rank(entity_type: &str) -> usize {
    PRIORITY_ORDER
        .iter()
        .position(|t| *t == entity_type)
        .unwrap_or(PRIORITY_ORDER.len())
}

/// Resolve raw spans into a non-overlapping, ordered sequence.
///
/// 1. Drops spans below `confidence_score`.
/// 2. Greedily keeps the highest-priority span from each overlapping
///    cluster, breaking ties by: longer span, then entity type priority,
///    then earlier `start`, then lexicographic `recognizer_id`.
/// 3. Returns the survivors sorted ascending by `start`.
///
/// A zero-length span is an invariant violation and fails the whole
/// resolution closed, per the Failure Gate contract.
pub fn resolve(spans: Vec<Span>, confidence_score: f32) -> Result<Vec<Span>> {
    for span in &spans {
        if span.is_empty() {
            return Err(AegisError::InternalInvariantViolation(format!(
                "zero-length span for entity type {}",
                span.entity_type
            )));
        }
    }

    let mut candidates: Vec<Span> = spans
        .into_iter()
        .filter(|s| s.confidence >= confidence_score)
        .collect();

    // Highest priority first: higher confidence, then longer, then
    // higher-priority entity type, then earlier start, then recognizer_id.
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| priority_rank(&a.entity_type).cmp(&priority_rank(&b.entity_type)))
            // `priority_rank` collapses every type outside `PRIORITY_ORDER` to
            // the same rank, so two unlisted types (e.g. GENE_SEQUENCE vs.
            // CHEMICAL_CAS) would otherwise fall straight through to the
            // start/recognizer_id tie-breaks below, skipping "others
            // alphabetically" entirely. This only ever changes ordering when
            // the ranks above tied, which for two *listed* types means they
            // were the same entity type anyway.
            .then_with(|| a.entity_type.cmp(&b.entity_type))
            .then_with(|| a.start.cmp(&b.start))
            .then_with(|| a.recognizer_id.cmp(&b.recognizer_id))
    });

    let mut accepted: Vec<Span> = Vec::new();
    for candidate in candidates {
        if !accepted.iter().any(|a| a.overlaps(&candidate)) {
            accepted.push(candidate);
        }
    }

    accepted.sort_by(|a, b| a.start.cmp(&b.start));
    Ok(accepted)
}
