//! Component 4.A: the Recognizer Registry.
//!
//! Combines rule-based recognizers with an optional model-backed
//! [`EntityAnalyzer`] — the indirection that lets this crate "consume an NER
//! capability without defining one" (see the crate's top-level docs).

mod builtin;
mod custom;

use crate::error::{AegisError, Result};
use crate::policy::AegisPolicy;
use crate::span::Span;
use std::collections::HashSet;
use std::sync::Arc;

pub use builtin::*;
pub use custom::*;

/// One entity recognizer: declares what it can emit, and emits it.
///
/// Implementations must be panic-free; a panic unwinding through `detect` is
/// caught at the registry boundary and turned into
/// [`AegisError::RecognizerFailure`], but a deliberate `Err` return is
/// cheaper and preferred.
pub trait Recognizer: Send + Sync {
    fn recognizer_id(&self) -> &str;
    fn entity_types(&self) -> &[&str];
    fn detect(&self, text: &str, language: &str) -> Result<Vec<Span>>;
}

/// The NER capability this crate consumes but does not define (§9: "Heavy
/// NER model held as a process-wide singleton"). Constructed once at
/// startup, shared read-only across every session thereafter.
pub trait EntityAnalyzer: Send + Sync {
    fn analyze(&self, text: &str, language: &str) -> Result<Vec<Span>>;
    fn name(&self) -> &str;
}

/// Default analyzer when no model-backed one is configured: emits nothing,
/// so the crate is usable and testable with rule-based recognizers alone.
pub struct NullAnalyzer;

impl EntityAnalyzer for NullAnalyzer {
    fn analyze(&self, _text: &str, _language: &str) -> Result<Vec<Span>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Holds every registered recognizer plus the (optional) model-backed
/// analyzer, and performs `analyze(text, policy) -> [Span]` by invoking all
/// of them and returning the union, unfiltered and undeduplicated — that is
/// the Span Resolver's job (component 4.C).
pub struct RecognizerRegistry {
    recognizers: Vec<Arc<dyn Recognizer>>,
    analyzer: Arc<dyn EntityAnalyzer>,
}

impl RecognizerRegistry {
    /// Registry with the built-in and custom recognizers of §4.A and no
    /// model-backed analyzer.
    pub fn with_builtins() -> Self {
        Self {
            recognizers: builtin::builtin_recognizers()
                .into_iter()
                .chain(custom::custom_recognizers())
                .collect(),
            analyzer: Arc::new(NullAnalyzer),
        }
    }

    /// Attach a model-backed analyzer (e.g. a local NER model, or a test
    /// mock) to an existing registry.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn EntityAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn register(&mut self, recognizer: Arc<dyn Recognizer>) {
        self.recognizers.push(recognizer);
    }

    pub fn analyzer_name(&self) -> &str {
        self.analyzer.name()
    }

    /// Every entity type label any registered recognizer can emit, used by
    /// the Policy Validator (4.H) to accept custom types without a
    /// compile-time change.
    pub fn known_entity_types(&self) -> HashSet<String> {
        self.recognizers
            .iter()
            .flat_map(|r| r.entity_types().iter().map(|t| t.to_string()))
            .collect()
    }

    /// Invoke every recognizer enabled by `policy.entity_types`, plus the
    /// model-backed analyzer (filtered the same way), and return the union
    /// of their spans. No deduplication or overlap resolution here.
    pub fn analyze(&self, text: &str, policy: &AegisPolicy) -> Result<Vec<Span>> {
        let mut spans = Vec::new();

        for recognizer in &self.recognizers {
            let enabled = recognizer
                .entity_types()
                .iter()
                .any(|t| policy.accepts_entity_type(t));
            if !enabled {
                continue;
            }
            let found = catch_recognizer(recognizer.as_ref(), text, policy.language())?;
            spans.extend(found);
        }

        let model_spans = self
            .analyzer
            .analyze(text, policy.language())
            .map_err(|e| AegisError::RecognizerFailure(e.to_string()))?;
        spans.extend(
            model_spans
                .into_iter()
                .filter(|s| policy.accepts_entity_type(&s.entity_type)),
        );

        Ok(spans)
    }
}

impl Default for RecognizerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn catch_recognizer(recognizer: &dyn Recognizer, text: &str, language: &str) -> Result<Vec<Span>> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| recognizer.detect(text, language)))
        .map_err(|_| {
            AegisError::RecognizerFailure(format!(
                "recognizer '{}' panicked",
                recognizer.recognizer_id()
            ))
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_builtin_and_custom_types() {
        let registry = RecognizerRegistry::with_builtins();
        let types = registry.known_entity_types();
        assert!(types.contains("PERSON"));
        assert!(types.contains("EMAIL_ADDRESS"));
        assert!(types.contains("SECRET_KEY"));
        assert!(types.contains("MRN"));
    }

    #[test]
    fn analyze_filters_by_policy_entity_types() {
        use crate::policy::AegisPolicyBuilder;
        let registry = RecognizerRegistry::with_builtins();
        let validator = crate::policy::PolicyValidator::new(registry.known_entity_types());
        let policy = AegisPolicyBuilder::new()
            .entity_types(["EMAIL_ADDRESS"])
            .build(&validator)
            .unwrap();

        let spans = registry
            .analyze("Contact a@b.com or call 555-123-4567", &policy)
            .unwrap();
        assert!(spans.iter().all(|s| s.entity_type == "EMAIL_ADDRESS"));
        assert!(!spans.is_empty());
    }
}
