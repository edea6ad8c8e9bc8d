//! `AegisPolicy` and its validator (component 4.H).

use crate::error::{AegisError, Result};
use crate::span::RedactionMode;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Immutable, validated sanitize configuration.
///
/// Constructed only through [`AegisPolicyBuilder`] or
/// [`PolicyValidator::validate`] so that an `AegisPolicy` in hand has already
/// passed validation — there is no way to observe an invalid one.
#[derive(Debug, Clone)]
pub struct AegisPolicy {
    allow_list: HashSet<String>,
    entity_types: HashSet<String>,
    mode: RedactionMode,
    confidence_score: f32,
    language: String,
}

impl AegisPolicy {
    pub fn allow_list(&self) -> &HashSet<String> {
        &self.allow_list
    }

    pub fn entity_types(&self) -> &HashSet<String> {
        &self.entity_types
    }

    /// Empty set means "all known entity types".
    pub fn accepts_entity_type(&self, entity_type: &str) -> bool {
        self.entity_types.is_empty() || self.entity_types.contains(entity_type)
    }

    pub fn mode(&self) -> RedactionMode {
        self.mode
    }

    pub fn confidence_score(&self) -> f32 {
        self.confidence_score
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Normalize (NFC, case-fold) a surface string the same way the
    /// allow-list and the Tokenizer do, so lookups against `allow_list` are
    /// consistent with every other normalization point in the pipeline.
    pub fn is_allow_listed(&self, surface: &str) -> bool {
        let normalized = normalize_surface(surface);
        self.allow_list.contains(&normalized)
    }
}

impl Default for AegisPolicy {
    fn default() -> Self {
        Self {
            allow_list: HashSet::new(),
            entity_types: HashSet::new(),
            mode: RedactionMode::default(),
            confidence_score: 0.85,
            language: "en".to_string(),
        }
    }
}

/// NFC-normalize and case-fold a surface string. Shared by the allow-list
/// filter and the Tokenizer so that "the same surface" means the same thing
/// everywhere in the pipeline.
pub fn normalize_surface(surface: &str) -> String {
    surface.trim_end().nfc().collect::<String>().to_lowercase()
}

/// Builder for `AegisPolicy`; the only way to construct one outside of
/// `Default`.
#[derive(Debug, Clone, Default)]
pub struct AegisPolicyBuilder {
    allow_list: HashSet<String>,
    entity_types: HashSet<String>,
    mode: Option<RedactionMode>,
    confidence_score: Option<f32>,
    language: Option<String>,
}

impl AegisPolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_list<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_list = items.into_iter().map(|s| normalize_surface(&s.into())).collect();
        self
    }

    pub fn entity_types<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_types = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn mode(mut self, mode: RedactionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn confidence_score(mut self, score: f32) -> Self {
        self.confidence_score = Some(score);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Validate and build, filling defaults for unset fields.
    pub fn build(self, validator: &PolicyValidator) -> Result<AegisPolicy> {
        let defaults = AegisPolicy::default();
        let policy = AegisPolicy {
            allow_list: self.allow_list,
            entity_types: self.entity_types,
            mode: self.mode.unwrap_or(defaults.mode),
            confidence_score: self.confidence_score.unwrap_or(defaults.confidence_score),
            language: self.language.unwrap_or(defaults.language),
        };
        validator.validate(&policy)?;
        Ok(policy)
    }
}

/// Validates policies against the set of entity types the caller's
/// `RecognizerRegistry` actually knows about.
pub struct PolicyValidator {
    known_entity_types: HashSet<String>,
}

impl PolicyValidator {
    pub fn new(known_entity_types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            known_entity_types: known_entity_types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn validate(&self, policy: &AegisPolicy) -> Result<()> {
        if !(0.0..=1.0).contains(&policy.confidence_score) {
            return Err(AegisError::PolicyInvalid(format!(
                "confidence_score {} not in [0.0, 1.0]",
                policy.confidence_score
            )));
        }

        for entity_type in &policy.entity_types {
            if !self.known_entity_types.contains(entity_type) {
                return Err(AegisError::PolicyInvalid(format!(
                    "unknown entity type: {entity_type}"
                )));
            }
        }

        if policy.language.trim().is_empty() {
            return Err(AegisError::PolicyInvalid("language must not be empty".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> PolicyValidator {
        PolicyValidator::new(["PERSON", "EMAIL_ADDRESS"])
    }

    #[test]
    fn default_policy_is_valid() {
        let policy = AegisPolicyBuilder::new().build(&validator()).unwrap();
        assert_eq!(policy.confidence_score(), 0.85);
        assert_eq!(policy.mode(), RedactionMode::Replace);
        assert_eq!(policy.language(), "en");
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let result = AegisPolicyBuilder::new().confidence_score(1.5).build(&validator());
        assert!(matches!(result, Err(AegisError::PolicyInvalid(_))));
    }

    #[test]
    fn rejects_unknown_entity_type() {
        let result = AegisPolicyBuilder::new()
            .entity_types(["NOT_A_REAL_TYPE"])
            .build(&validator());
        assert!(matches!(result, Err(AegisError::PolicyInvalid(_))));
    }

    #[test]
    fn allow_list_matches_case_insensitively() {
        let policy = AegisPolicyBuilder::new()
            .allow_list(["Tylenol"])
            .build(&validator())
            .unwrap();
        assert!(policy.is_allow_listed("tylenol"));
        assert!(policy.is_allow_listed("TYLENOL"));
    }
}
