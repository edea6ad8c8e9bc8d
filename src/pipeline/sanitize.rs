//! Component 4.F: the Sanitize pipeline — the orchestration of recognition
//! (A), allow-listing (B), resolution (C), tokenization (D), and vault
//! persistence (E), in that order.

use crate::allowlist;
use crate::error::Result;
use crate::policy::AegisPolicy;
use crate::recognizers::RecognizerRegistry;
use crate::resolver;
use crate::vault::Vault;

/// Run text through the full sanitize pipeline for `session_id` and return
/// the redacted output. The resolved spans and their mappings are recorded
/// in `vault` as a side effect, keyed by `session_id`, so a later Reveal
/// call can reconstruct the original surfaces.
pub async fn sanitize(
    registry: &RecognizerRegistry,
    vault: &Vault,
    session_id: &str,
    text: &str,
    policy: &AegisPolicy,
) -> Result<String> {
    let raw_spans = registry.analyze(text, policy)?;
    let allowed = allowlist::filter_allow_listed(text, raw_spans, policy);
    let resolved = resolver::resolve(allowed, policy.confidence_score())?;
    let result = vault
        .tokenize_and_record(session_id, text, &resolved, policy.mode())
        .await?;
    Ok(result.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AegisPolicyBuilder, PolicyValidator};
    use crate::span::RedactionMode;
    use std::time::Duration;

    fn vault() -> Vault {
        Vault::new("test-root-key", Duration::from_secs(60), 100).unwrap()
    }

    #[tokio::test]
    async fn sanitizes_and_tokenizes_a_person() {
        let registry = RecognizerRegistry::with_builtins();
        let validator = PolicyValidator::new(registry.known_entity_types());
        let policy = AegisPolicyBuilder::new()
            .mode(RedactionMode::Replace)
            .build(&validator)
            .unwrap();
        let vault = vault();

        let output = sanitize(&registry, &vault, "sess-1", "Patient John Doe arrived.", &policy)
            .await
            .unwrap();
        assert_eq!(output, "Patient [PATIENT_A] arrived.");
    }

    #[tokio::test]
    async fn allow_listed_surfaces_are_never_tokenized() {
        let registry = RecognizerRegistry::with_builtins();
        let validator = PolicyValidator::new(registry.known_entity_types());
        let policy = AegisPolicyBuilder::new()
            .mode(RedactionMode::Replace)
            .allow_list(["John Doe"])
            .build(&validator)
            .unwrap();
        let vault = vault();

        let output = sanitize(&registry, &vault, "sess-1", "Patient John Doe arrived.", &policy)
            .await
            .unwrap();
        assert_eq!(output, "Patient John Doe arrived.");
    }
}
