//! Health surface: a cheap, side-effect-free snapshot of engine status for
//! an embedding application's own readiness checks.

use crate::error::Result;
use crate::recognizers::RecognizerRegistry;
use crate::vault::Vault;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub model_name: String,
    pub engine_name: &'static str,
    pub active_sessions: usize,
}

impl HealthStatus {
    /// Render as the `{status, engine, model}` JSON body §6 documents for
    /// `GET /health` — this crate has no HTTP transport of its own, but an
    /// embedding application building that route needs the same JSON shape
    /// we'd produce, not a re-derivation of it.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }
}

pub async fn health(registry: &RecognizerRegistry, vault: &Vault) -> HealthStatus {
    HealthStatus {
        status: "ok",
        model_name: registry.analyzer_name().to_string(),
        engine_name: "aegis-core",
        active_sessions: vault.session_count().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn reports_ok_with_no_sessions() {
        let registry = RecognizerRegistry::with_builtins();
        let vault = Vault::new("test-root-key", Duration::from_secs(60), 10).unwrap();
        let status = health(&registry, &vault).await;
        assert_eq!(status.status, "ok");
        assert_eq!(status.active_sessions, 0);
        assert_eq!(status.model_name, "none");
    }

    #[tokio::test]
    async fn serializes_to_the_documented_json_shape() {
        let registry = RecognizerRegistry::with_builtins();
        let vault = Vault::new("test-root-key", Duration::from_secs(60), 10).unwrap();
        let status = health(&registry, &vault).await;
        let json = status.to_json().unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"engine_name\":\"aegis-core\""));
    }
}
