//! Aegis: a bidirectional privacy filter between a trusted application and
//! an untrusted text consumer (an LLM, a third-party API, a log sink).
//!
//! `sanitize` recognizes sensitive spans in text and rewrites them into
//! tokens, recording the reversible mapping in a session-scoped,
//! encrypted [`Vault`]. `desanitize` scans previously-sanitized text for
//! those tokens and substitutes the originals back in, gated on caller
//! authorization. Everything else in this crate exists to make those two
//! operations correct and fail closed.

pub mod allowlist;
pub mod config;
pub mod error;
pub mod failure_gate;
pub mod health;
pub mod logging;
pub mod pipeline;
pub mod policy;
pub mod recognizers;
pub mod resolver;
pub mod span;
pub mod tokenizer;
pub mod vault;

pub use config::EngineConfig;
pub use error::{AegisError, Result};
pub use health::HealthStatus;
pub use policy::{AegisPolicy, AegisPolicyBuilder, PolicyValidator};
pub use recognizers::{EntityAnalyzer, NullAnalyzer, Recognizer, RecognizerRegistry};
pub use span::{RedactionMode, Span};
pub use vault::Vault;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// An opaque reference to one session's mapping lifetime. Every caller gets
/// the same handle shape — this crate has no network boundary across which
/// a "local" vs "remote" caller would need a different representation.
/// Contains no sensitive values, so it is safe to serialize as-is into a
/// response body (§6's `/sanitize` handle field for network callers).
#[derive(Debug, Clone, serde::Serialize)]
pub struct MappingHandle {
    pub session_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl MappingHandle {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }
}

/// The engine: the one type an embedding application holds. Construct once
/// per process (the model-backed [`EntityAnalyzer`] is expensive to load
/// and meant to be shared, per the registry's own contract) and call
/// `sanitize`/`desanitize` per request.
pub struct AegisEngine {
    registry: Arc<RecognizerRegistry>,
    vault: Vault,
    validator: PolicyValidator,
    operation_timeout: std::time::Duration,
    reveal_miss_count: AtomicU64,
}

impl AegisEngine {
    /// Build an engine from startup configuration and a recognizer
    /// registry (already carrying whatever model-backed analyzer the
    /// caller wants, or none).
    pub fn new(config: EngineConfig, registry: RecognizerRegistry) -> Result<Self> {
        let validator = PolicyValidator::new(registry.known_entity_types());
        let vault = Vault::new(&config.vault_root_key, config.vault_ttl, config.vault_max_sessions)?;

        Ok(Self {
            registry: Arc::new(registry),
            vault,
            validator,
            operation_timeout: config.operation_timeout,
            reveal_miss_count: AtomicU64::new(0),
        })
    }

    /// The validator governing policies built against this engine's
    /// recognizer registry — pass it to [`AegisPolicyBuilder::build`].
    pub fn policy_validator(&self) -> &PolicyValidator {
        &self.validator
    }

    /// Run `text` through the sanitize pipeline for `session_id` under
    /// `policy`, bounded by the engine's operation timeout.
    pub async fn sanitize(&self, session_id: &str, text: &str, policy: &AegisPolicy) -> Result<String> {
        failure_gate::run(
            self.operation_timeout,
            pipeline::sanitize::sanitize(&self.registry, &self.vault, session_id, text, policy),
        )
        .await
    }

    /// Reveal every token in `text` that `session_id`'s vault entry knows
    /// about, if `authorized`. Unknown tokens and unauthorized calls are
    /// silent non-reveals, not errors; see [`pipeline::reveal`].
    pub async fn desanitize(&self, session_id: &str, text: &str, authorized: bool) -> Result<String> {
        failure_gate::run(
            self.operation_timeout,
            pipeline::reveal::reveal(&self.vault, &self.reveal_miss_count, session_id, text, authorized),
        )
        .await
    }

    /// Forget a session ahead of its TTL.
    pub async fn purge(&self, session_id: &str) {
        self.vault.purge(session_id).await;
    }

    /// A snapshot of this session's mapping lifetime, if the vault still
    /// holds it.
    pub async fn mapping_handle(&self, session_id: &str) -> Option<MappingHandle> {
        self.vault.handle_for(session_id).await
    }

    /// Count of Reveal calls since startup that found no matching token —
    /// an operational signal a caller is passing stale or foreign tokens,
    /// not a reason to fail the call itself.
    pub fn reveal_miss_count(&self) -> u64 {
        self.reveal_miss_count.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub async fn health(&self) -> HealthStatus {
        health::health(&self.registry, &self.vault).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig {
            vault_root_key: "test-root-key".to_string(),
            vault_ttl: std::time::Duration::from_secs(60),
            vault_max_sessions: 100,
            model_name: None,
            language: "en".to_string(),
            operation_timeout: std::time::Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn sanitize_then_desanitize_roundtrips() {
        let engine = AegisEngine::new(config(), RecognizerRegistry::with_builtins()).unwrap();
        let policy = AegisPolicyBuilder::new()
            .mode(RedactionMode::Replace)
            .build(engine.policy_validator())
            .unwrap();

        let sanitized = engine.sanitize("sess-1", "Patient John Doe arrived.", &policy).await.unwrap();
        assert_eq!(sanitized, "Patient [PATIENT_A] arrived.");

        let revealed = engine.desanitize("sess-1", &sanitized, true).await.unwrap();
        assert_eq!(revealed, "Patient John Doe arrived.");
    }

    #[tokio::test]
    async fn unauthorized_reveal_leaves_tokens_in_place() {
        let engine = AegisEngine::new(config(), RecognizerRegistry::with_builtins()).unwrap();
        let policy = AegisPolicyBuilder::new()
            .mode(RedactionMode::Replace)
            .build(engine.policy_validator())
            .unwrap();

        let sanitized = engine.sanitize("sess-1", "Call sk-abcdefghijklmnopqrst now.", &policy).await.unwrap();
        assert!(sanitized.contains("[SECRET_KEY_A]"));

        let revealed = engine.desanitize("sess-1", &sanitized, false).await.unwrap();
        assert_eq!(revealed, sanitized);
    }

    #[tokio::test]
    async fn health_reports_the_configured_analyzer() {
        let engine = AegisEngine::new(config(), RecognizerRegistry::with_builtins()).unwrap();
        let status = engine.health().await;
        assert_eq!(status.status, "ok");
        assert_eq!(status.model_name, "none");
    }

    #[tokio::test]
    async fn mapping_handle_serializes_without_sensitive_fields() {
        let engine = AegisEngine::new(config(), RecognizerRegistry::with_builtins()).unwrap();
        let policy = AegisPolicyBuilder::new()
            .mode(RedactionMode::Replace)
            .build(engine.policy_validator())
            .unwrap();

        engine.sanitize("sess-1", "John Doe called.", &policy).await.unwrap();
        let handle = engine.mapping_handle("sess-1").await.unwrap();
        let json = handle.to_json().unwrap();
        assert!(json.contains("\"session_id\":\"sess-1\""));
        assert!(!json.contains("John Doe"));
    }
}
