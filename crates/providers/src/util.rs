//! Shared utility functions for provider adapters.

use fd_domain::config::AuthConfig;
use fd_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key from an [`AuthConfig`].
///
/// Precedence:
/// 1. `key` field (plaintext — warn)
/// 2. `env` field (reads environment variable)
/// 3. Error
pub fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    if let Some(ref key) = auth.key {
        if !key.is_empty() {
            tracing::warn!(
                "API key loaded from plaintext config field 'key' — prefer 'env' instead"
            );
            return Ok(key.clone());
        }
    }

    std::env::var(&auth.env).map_err(|_| {
        Error::Auth(format!(
            "environment variable '{}' not set or not valid UTF-8",
            auth.env
        ))
    })
}
