//! Ambient configuration: how the crate reads its own startup parameters
//! from the process environment, with one namespaced prefix and fail-closed
//! validation for anything that has no safe default.

use crate::error::{AegisError, Result};
use std::time::Duration;

const ENV_VAULT_TTL_SECONDS: &str = "AEGIS_VAULT_TTL_SECONDS";
const ENV_VAULT_MAX_SESSIONS: &str = "AEGIS_VAULT_MAX_SESSIONS";
const ENV_VAULT_ROOT_KEY: &str = "AEGIS_VAULT_ROOT_KEY";
const ENV_MODEL_NAME: &str = "AEGIS_MODEL_NAME";
const ENV_LANGUAGE: &str = "AEGIS_LANGUAGE";
const ENV_OPERATION_TIMEOUT_MS: &str = "AEGIS_OPERATION_TIMEOUT_MS";

const DEFAULT_VAULT_TTL_SECONDS: u64 = 900;
const DEFAULT_VAULT_MAX_SESSIONS: usize = 10_000;
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 2000;

/// Engine-wide startup configuration.
///
/// `vault_root_key` has no default: a vault with no root key is a vault
/// that cannot encrypt, so [`EngineConfig::from_env`] fails closed rather
/// than starting with a made-up one.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub vault_root_key: String,
    pub vault_ttl: Duration,
    pub vault_max_sessions: usize,
    pub model_name: Option<String>,
    pub language: String,
    pub operation_timeout: Duration,
}

impl EngineConfig {
    /// Read configuration from the process environment. Fails closed if
    /// `AEGIS_VAULT_ROOT_KEY` is absent or empty, or if a numeric variable
    /// is present but unparsable — this is a startup-time error, there is
    /// no sensible default to fall back to for either case.
    pub fn from_env() -> Result<Self> {
        let vault_root_key = std::env::var(ENV_VAULT_ROOT_KEY)
            .map_err(|_| AegisError::Startup(format!("{ENV_VAULT_ROOT_KEY} is required")))?;
        if vault_root_key.trim().is_empty() {
            return Err(AegisError::Startup(format!("{ENV_VAULT_ROOT_KEY} must not be empty")));
        }

        let vault_ttl = Duration::from_secs(read_env_u64(ENV_VAULT_TTL_SECONDS, DEFAULT_VAULT_TTL_SECONDS)?);
        let vault_max_sessions =
            read_env_u64(ENV_VAULT_MAX_SESSIONS, DEFAULT_VAULT_MAX_SESSIONS as u64)? as usize;
        let operation_timeout =
            Duration::from_millis(read_env_u64(ENV_OPERATION_TIMEOUT_MS, DEFAULT_OPERATION_TIMEOUT_MS)?);

        let model_name = std::env::var(ENV_MODEL_NAME).ok().filter(|s| !s.trim().is_empty());
        let language = std::env::var(ENV_LANGUAGE).unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string());

        Ok(Self {
            vault_root_key,
            vault_ttl,
            vault_max_sessions,
            model_name,
            language,
            operation_timeout,
        })
    }
}

fn read_env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|_| AegisError::Startup(format!("{name} must be a non-negative integer, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}
