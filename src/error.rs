//! Crate-wide error type.
//!
//! Mirrors the error kinds enumerated in the design: most are fatal and
//! propagate straight to the Failure Gate, a small number (`VaultTtlExpired`,
//! `VaultCapacityExceeded`) are locally recoverable by the component that
//! raises them.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AegisError>;

#[derive(Debug, Error)]
pub enum AegisError {
    #[error("policy invalid: {0}")]
    PolicyInvalid(String),

    #[error("recognizer failed: {0}")]
    RecognizerFailure(String),

    #[error("vault session expired")]
    VaultTtlExpired,

    #[error("vault capacity exceeded, evicted least-recently-used session")]
    VaultCapacityExceeded,

    #[error("vault decryption failed, session quarantined")]
    VaultCryptoFailure,

    #[error("operation exceeded its wall-clock budget")]
    Timeout,

    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),

    #[error("startup configuration error: {0}")]
    Startup(String),
}

impl From<regex::Error> for AegisError {
    fn from(err: regex::Error) -> Self {
        AegisError::RecognizerFailure(err.to_string())
    }
}

impl From<serde_json::Error> for AegisError {
    fn from(err: serde_json::Error) -> Self {
        AegisError::InternalInvariantViolation(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for AegisError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        AegisError::InternalInvariantViolation(err.to_string())
    }
}

impl From<aes_gcm::Error> for AegisError {
    fn from(_err: aes_gcm::Error) -> Self {
        AegisError::VaultCryptoFailure
    }
}

impl From<tokio::time::error::Elapsed> for AegisError {
    fn from(_err: tokio::time::error::Elapsed) -> Self {
        AegisError::Timeout
    }
}
