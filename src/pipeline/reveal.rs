//! Component 4.G: the Reveal pipeline.
//!
//! Scans previously-sanitized text for bracketed tokens and, if the caller
//! is authorized, substitutes back the original surface from the Vault.
//! A token the Vault doesn't recognize, or an unauthorized call, is a
//! silent non-reveal — the text comes back with that token untouched, not
//! an error. Misses are tallied, not rejected.

use crate::error::Result;
use crate::vault::Vault;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[[A-Z][A-Z0-9_]*\]").expect("token pattern is valid"))
}

/// Reveal every token in `text` the caller is authorized to see.
///
/// `authorized = false` returns `text` completely unchanged: no scanning,
/// no vault access, no miss-counting — an unauthorized caller leaves no
/// trace of having tried.
pub async fn reveal(vault: &Vault, miss_count: &AtomicU64, session_id: &str, text: &str, authorized: bool) -> Result<String> {
    if !authorized {
        return Ok(text.to_string());
    }

    let mut output = String::with_capacity(text.len());
    let mut cursor = 0usize;

    for m in token_pattern().find_iter(text) {
        output.push_str(&text[cursor..m.start()]);

        match vault.lookup_forward(session_id, m.as_str()).await {
            Ok(Some(surface)) => output.push_str(&surface),
            Ok(None) => {
                miss_count.fetch_add(1, Ordering::Relaxed);
                output.push_str(m.as_str());
            }
            Err(_) => {
                miss_count.fetch_add(1, Ordering::Relaxed);
                output.push_str(m.as_str());
            }
        }

        cursor = m.end();
    }

    output.push_str(&text[cursor..]);
    Ok(output)
}
