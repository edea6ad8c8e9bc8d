//! Component 4.I: the Failure Gate.
//!
//! The single point where an internal failure of any kind — a panic caught
//! at the recognizer boundary, a vault crypto error, a blown wall-clock
//! budget — gets turned into the one external failure signal callers see.
//! Every entrypoint in [`crate::lib`] runs through this, never the raw
//! pipeline function directly.

use crate::error::{AegisError, Result};
use std::future::Future;
use std::time::Duration;

/// Run `fut` under a wall-clock budget of `timeout`. A fatal error from
/// `fut` itself propagates unchanged; a blown budget propagates as
/// [`AegisError::Timeout`]. Either way, the caller gets a single `Result`
/// and never has to distinguish "it failed" from "it ran out of time" —
/// both are a reason to refuse the operation, not to guess at partial
/// output.
pub async fn run<F, T>(timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_elapsed) => Err(AegisError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_a_successful_result() {
        let result = run(Duration::from_secs(1), async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn passes_through_a_fatal_error_unchanged() {
        let result: Result<()> = run(Duration::from_secs(1), async {
            Err(AegisError::PolicyInvalid("bad".into()))
        })
        .await;
        assert!(matches!(result, Err(AegisError::PolicyInvalid(_))));
    }

    #[tokio::test]
    async fn translates_a_blown_budget_to_timeout() {
        let result: Result<()> = run(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(AegisError::Timeout)));
    }
}
