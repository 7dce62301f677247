//! API key lookup for binaries and applications.
//!
//! The client itself takes the key per call; this only answers "where do I
//! get one from" for callers that do not hold it already.

use keyring::Entry;
use std::env;

pub const KEYRING_SERVICE: &str = "geo-resilient-client";
pub const KEYRING_USER: &str = "gemini";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Resolve the API key: OS keyring first, then `GEMINI_API_KEY`.
pub fn resolve_api_key() -> Option<String> {
    if let Ok(entry) = Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        if let Ok(key) = entry.get_password() {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }
    }
    env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty())
}

/// Store `key` in the OS keyring for later [`resolve_api_key`] calls.
pub fn store_api_key(key: &str) -> crate::Result<()> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER).map_err(|e| {
        crate::Error::configuration_with_context(
            format!("keyring unavailable: {}", e),
            crate::ErrorContext::new().with_source("credentials"),
        )
    })?;
    entry.set_password(key).map_err(|e| {
        crate::Error::configuration_with_context(
            format!("failed to store API key: {}", e),
            crate::ErrorContext::new().with_source("credentials"),
        )
    })
}
