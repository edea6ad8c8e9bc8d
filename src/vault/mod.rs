//! Component 4.E: the Vault.
//!
//! A session-keyed, TTL-bound, encrypted-at-rest store of token <-> surface
//! mappings. Every session also carries its [`TokenizerState`] so REPLACE
//! mode's ordinal assignment survives across calls within the same session.
//!
//! Mirrors the application's own session manager: an `Arc<RwLock<_>>`
//! table touched on every access for a sliding TTL, plus a background
//! sweeper task that evicts what the caller never touches again.

mod crypto;

use crate::error::{AegisError, Result};
use crate::span::{RedactionMode, Span};
use crate::tokenizer::{self, TokenizationResult, TokenizerState};
use crypto::VaultCipher;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionMapping {
    /// token -> original surface text.
    forward: HashMap<String, String>,
    /// normalized surface -> token, so repeated mentions of the same entity
    /// resolve to the same token without re-deriving it.
    reverse: HashMap<String, String>,
}

#[derive(Default, Serialize, Deserialize)]
struct VaultPayload {
    mapping: SessionMapping,
    tokenizer_state: TokenizerState,
}

struct VaultEntry {
    encrypted_payload: Vec<u8>,
    created_at: chrono::DateTime<chrono::Utc>,
    last_touch: Instant,
    quarantined: bool,
}

impl VaultEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        Instant::now().duration_since(self.last_touch) > ttl
    }
}

#[derive(Clone, Copy)]
enum EvictionReason {
    Capacity,
    Ttl,
}

/// The Vault. Cheap to clone: all state lives behind `Arc`.
#[derive(Clone)]
pub struct Vault {
    sessions: Arc<RwLock<LruCache<String, VaultEntry>>>,
    evicted: Arc<RwLock<LruCache<String, EvictionReason>>>,
    cipher: Arc<VaultCipher>,
    ttl: Duration,
    shutdown_tx: Option<Arc<mpsc::Sender<()>>>,
}

impl Vault {
    /// Build a vault keyed by `root_key` (the operator-supplied secret; the
    /// Failure Gate's caller is expected to have already refused to start
    /// without one), holding at most `max_sessions` sessions for up to `ttl`
    /// of inactivity, and spawn its background sweeper.
    pub fn new(root_key: &str, ttl: Duration, max_sessions: usize) -> Result<Self> {
        let salt = crypto::generate_salt();
        let cipher = Arc::new(VaultCipher::derive(root_key, &salt)?);

        let capacity = NonZeroUsize::new(max_sessions).unwrap_or(NonZeroUsize::new(1000).unwrap());
        let sessions = Arc::new(RwLock::new(LruCache::new(capacity)));
        let evicted = Arc::new(RwLock::new(LruCache::new(capacity)));

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let sweep_sessions = sessions.clone();
        let sweep_evicted = evicted.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30).min(ttl).max(Duration::from_secs(1)));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        Self::sweep(&sweep_sessions, &sweep_evicted, ttl).await;
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("vault sweeper received shutdown signal");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            sessions,
            evicted,
            cipher,
            ttl,
            shutdown_tx: Some(Arc::new(shutdown_tx)),
        })
    }

    async fn sweep(
        sessions: &Arc<RwLock<LruCache<String, VaultEntry>>>,
        evicted: &Arc<RwLock<LruCache<String, EvictionReason>>>,
        ttl: Duration,
    ) {
        let mut sessions = sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(id, _)| id.clone())
            .collect();

        if expired.is_empty() {
            return;
        }

        let mut evicted = evicted.write().await;
        for id in &expired {
            sessions.pop(id);
            evicted.put(id.clone(), EvictionReason::Ttl);
        }
        tracing::debug!(count = expired.len(), "vault sweeper expired idle sessions");
    }

    async fn load_payload(&self, entry: &VaultEntry) -> Result<VaultPayload> {
        let plaintext = self.cipher.decrypt(&entry.encrypted_payload)?;
        bincode::deserialize(&plaintext).map_err(AegisError::from)
    }

    fn store_payload(&self, payload: &VaultPayload) -> Result<Vec<u8>> {
        let plaintext = bincode::serialize(payload)?;
        self.cipher.encrypt(&plaintext)
    }

    /// Tokenize `text`'s resolved `spans` for `session_id`, persisting both
    /// the new token/surface mappings and the advanced `TokenizerState`.
    /// Creates the session on first use; touches it (sliding TTL) on every
    /// call thereafter.
    pub async fn tokenize_and_record(
        &self,
        session_id: &str,
        text: &str,
        spans: &[Span],
        mode: RedactionMode,
    ) -> Result<TokenizationResult> {
        let mut sessions = self.sessions.write().await;

        let created_at = sessions.peek(session_id).map(|e| e.created_at);

        let mut payload = match sessions.get(session_id) {
            Some(entry) if entry.quarantined => return Err(AegisError::VaultCryptoFailure),
            Some(entry) => self.load_payload(entry).await?,
            None => VaultPayload::default(),
        };

        let result = tokenizer::tokenize(text, spans, mode, session_id, &mut payload.tokenizer_state)?;

        for mapping in &result.mappings {
            if mapping.record_forward {
                payload.mapping.forward.insert(mapping.token.clone(), mapping.surface.clone());
            }
            if mapping.record_reverse {
                let normalized = crate::policy::normalize_surface(&mapping.surface);
                payload.mapping.reverse.insert(normalized, mapping.token.clone());
            }
        }

        let encrypted_payload = self.store_payload(&payload)?;
        if let Some((evicted_id, _)) = sessions.push(
            session_id.to_string(),
            VaultEntry {
                encrypted_payload,
                created_at: created_at.unwrap_or_else(chrono::Utc::now),
                last_touch: Instant::now(),
                quarantined: false,
            },
        ) {
            if evicted_id != session_id {
                drop(sessions);
                self.evicted.write().await.put(evicted_id, EvictionReason::Capacity);
            }
        }

        Ok(result)
    }

    /// Look up the original surface for `token` within `session_id`.
    ///
    /// `Ok(None)` means the session is known but the token is not — the
    /// caller's Reveal pipeline treats this as a silent non-reveal, not a
    /// failure. An `Err` means the session itself cannot be read: expired,
    /// evicted, quarantined, or never seen.
    pub async fn lookup_forward(&self, session_id: &str, token: &str) -> Result<Option<String>> {
        let mut sessions = self.sessions.write().await;

        let (expired, quarantined) = match sessions.peek(session_id) {
            Some(entry) => (entry.is_expired(self.ttl), entry.quarantined),
            None => return Err(self.absence_reason(session_id).await),
        };

        if expired {
            sessions.pop(session_id);
            drop(sessions);
            self.evicted.write().await.put(session_id.to_string(), EvictionReason::Ttl);
            return Err(AegisError::VaultTtlExpired);
        }

        if quarantined {
            return Err(AegisError::VaultCryptoFailure);
        }

        let payload_result = {
            let entry = sessions.peek(session_id).expect("checked for presence above");
            self.load_payload(entry).await
        };

        match payload_result {
            Ok(payload) => {
                if let Some(entry) = sessions.get_mut(session_id) {
                    entry.last_touch = Instant::now();
                }
                Ok(payload.mapping.forward.get(token).cloned())
            }
            Err(_) => {
                if let Some(entry) = sessions.get_mut(session_id) {
                    entry.quarantined = true;
                }
                Err(AegisError::VaultCryptoFailure)
            }
        }
    }

    async fn absence_reason(&self, session_id: &str) -> AegisError {
        match self.evicted.read().await.peek(session_id) {
            Some(EvictionReason::Capacity) => AegisError::VaultCapacityExceeded,
            Some(EvictionReason::Ttl) => AegisError::VaultTtlExpired,
            None => AegisError::VaultTtlExpired,
        }
    }

    /// Explicitly forget a session, ahead of its TTL. Not an error
    /// condition, so it leaves no eviction tombstone behind.
    pub async fn purge(&self, session_id: &str) {
        self.sessions.write().await.pop(session_id);
        self.evicted.write().await.pop(session_id);
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// An opaque handle describing a session's lifetime, for callers that
    /// want to report it without reaching into vault internals. Returns
    /// `None` for a session the vault has never seen or has already
    /// forgotten.
    pub async fn handle_for(&self, session_id: &str) -> Option<crate::MappingHandle> {
        let sessions = self.sessions.read().await;
        let entry = sessions.peek(session_id)?;
        let elapsed = Instant::now().duration_since(entry.last_touch);
        let remaining = self.ttl.checked_sub(elapsed).unwrap_or_default();
        Some(crate::MappingHandle {
            session_id: session_id.to_string(),
            created_at: entry.created_at,
            expires_at: chrono::Utc::now() + chrono::Duration::from_std(remaining).unwrap_or_default(),
        })
    }
}

impl Drop for Vault {
    fn drop(&mut self) {
        if let Some(tx) = &self.shutdown_tx {
            if let Err(e) = tx.try_send(()) {
                tracing::debug!(error = ?e, "vault sweeper shutdown signal not delivered");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::RedactionMode;

    fn vault() -> Vault {
        Vault::new("test-root-key", Duration::from_secs(60), 100).unwrap()
    }

    #[tokio::test]
    async fn records_and_reveals_a_mapping() {
        let vault = vault();
        let text = "John Doe called.";
        let spans = vec![Span::new(0, 8, "PERSON", 0.9, "r")];
        let result = vault
            .tokenize_and_record("sess-1", text, &spans, RedactionMode::Replace)
            .await
            .unwrap();

        let token = &result.mappings[0].token;
        let revealed = vault.lookup_forward("sess-1", token).await.unwrap();
        assert_eq!(revealed.as_deref(), Some("John Doe"));
    }

    #[tokio::test]
    async fn unknown_token_in_known_session_is_silent_miss() {
        let vault = vault();
        let spans = vec![Span::new(0, 8, "PERSON", 0.9, "r")];
        vault
            .tokenize_and_record("sess-1", "John Doe called.", &spans, RedactionMode::Replace)
            .await
            .unwrap();

        let revealed = vault.lookup_forward("sess-1", "[PATIENT_Z]").await.unwrap();
        assert!(revealed.is_none());
    }

    #[tokio::test]
    async fn unknown_session_fails_closed() {
        let vault = vault();
        let result = vault.lookup_forward("never-seen", "[PATIENT_A]").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn purge_forgets_the_session() {
        let vault = vault();
        let spans = vec![Span::new(0, 8, "PERSON", 0.9, "r")];
        let result = vault
            .tokenize_and_record("sess-1", "John Doe called.", &spans, RedactionMode::Replace)
            .await
            .unwrap();

        vault.purge("sess-1").await;
        let revealed = vault.lookup_forward("sess-1", &result.mappings[0].token).await;
        assert!(revealed.is_err());
    }

    #[tokio::test]
    async fn hash_mode_writes_nothing_to_the_vault() {
        let vault = vault();
        let spans = vec![Span::new(0, 8, "PERSON", 0.9, "r")];
        let result = vault
            .tokenize_and_record("sess-1", "John Doe called.", &spans, RedactionMode::Hash)
            .await
            .unwrap();

        let token = &result.mappings[0].token;
        let revealed = vault.lookup_forward("sess-1", token).await.unwrap();
        assert!(revealed.is_none(), "HASH mode must not be reversible even within its own session");
    }

    #[tokio::test]
    async fn mask_mode_writes_forward_only() {
        let vault = vault();
        let spans = vec![
            Span::new(0, 8, "PERSON", 0.9, "r"),
            Span::new(13, 21, "PERSON", 0.9, "r"),
        ];
        let result = vault
            .tokenize_and_record("sess-1", "John Doe and Jane Roe", &spans, RedactionMode::Mask)
            .await
            .unwrap();

        assert_eq!(result.output, "[PATIENT] and [PATIENT]");
        let revealed = vault.lookup_forward("sess-1", "[PATIENT]").await.unwrap();
        assert!(revealed.is_some(), "MASK still records the forward direction");
    }

    #[tokio::test]
    async fn ordinals_persist_across_calls_in_the_same_session() {
        let vault = vault();
        let spans_a = vec![Span::new(0, 4, "PERSON", 0.9, "r")];
        let first = vault
            .tokenize_and_record("sess-1", "John said hi.", &spans_a, RedactionMode::Replace)
            .await
            .unwrap();
        assert_eq!(first.output, "[PATIENT_A] said hi.");

        let spans_b = vec![Span::new(0, 4, "PERSON", 0.9, "r")];
        let second = vault
            .tokenize_and_record("sess-1", "Jane left.", &spans_b, RedactionMode::Replace)
            .await
            .unwrap();
        assert_eq!(second.output, "[PATIENT_B] left.");
    }

    /// Property 7 ("TTL respected"): a lookup past `created_at + ttl` with no
    /// intervening access fails with `VaultTtlExpired`, not a silent miss and
    /// not a stale hit. Uses tokio's paused clock so the test doesn't
    /// actually wait out a real TTL.
    #[tokio::test(start_paused = true)]
    async fn ttl_respected_lookup_fails_after_expiry() {
        let vault = Vault::new("test-root-key", Duration::from_secs(5), 100).unwrap();
        let spans = vec![Span::new(0, 8, "PERSON", 0.9, "r")];
        let result = vault
            .tokenize_and_record("sess-ttl", "John Doe called.", &spans, RedactionMode::Replace)
            .await
            .unwrap();
        let token = result.mappings[0].token.clone();

        // Still inside the TTL window: the mapping resolves normally.
        assert_eq!(
            vault.lookup_forward("sess-ttl", &token).await.unwrap().as_deref(),
            Some("John Doe")
        );

        tokio::time::advance(Duration::from_secs(6)).await;

        let looked_up = vault.lookup_forward("sess-ttl", &token).await;
        assert!(matches!(looked_up, Err(AegisError::VaultTtlExpired)));
    }

    /// The sliding-window half of property 7: an access before expiry
    /// extends `last_touch`, so a second wait that would have expired the
    /// session from `created_at` alone does not expire it when each half is
    /// bridged by a touching access.
    #[tokio::test(start_paused = true)]
    async fn ttl_slides_forward_on_access() {
        let vault = Vault::new("test-root-key", Duration::from_secs(5), 100).unwrap();
        let spans = vec![Span::new(0, 8, "PERSON", 0.9, "r")];
        let result = vault
            .tokenize_and_record("sess-slide", "John Doe called.", &spans, RedactionMode::Replace)
            .await
            .unwrap();
        let token = result.mappings[0].token.clone();

        tokio::time::advance(Duration::from_secs(3)).await;
        // Touches the session at t=3s, extending expiry to t=8s.
        assert!(vault.lookup_forward("sess-slide", &token).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(3)).await;
        // t=6s: past the original t=5s deadline, but inside the slid one.
        assert!(vault.lookup_forward("sess-slide", &token).await.unwrap().is_some());
    }
}
