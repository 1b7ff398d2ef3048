//! Shared utility functions for provider adapters.

use pp_domain::agent::agent_output_schema;
use pp_domain::config::AuthConfig;
use pp_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the API key from an [`AuthConfig`].
///
/// Precedence:
/// 1. `key` field (plaintext, warns)
/// 2. `env` variable
/// 3. each `fallback_env` variable, in order
///
/// Empty variables count as unset. Failure is an [`Error::Auth`], which
/// callers report as a configuration problem.
pub fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    if let Some(ref key) = auth.key {
        tracing::warn!("API key loaded from plaintext config field 'key'; prefer 'env'");
        return Ok(key.clone());
    }

    let candidates: Vec<&str> = auth
        .env
        .iter()
        .chain(auth.fallback_env.iter())
        .map(String::as_str)
        .collect();

    for name in &candidates {
        if let Some(val) = non_empty_env(name) {
            return Ok(val);
        }
    }

    if candidates.is_empty() {
        return Err(Error::Auth(
            "no API key configured: set 'key' or 'env' in the provider auth config".into(),
        ));
    }
    Err(Error::Auth(format!(
        "Missing API key. Please set {}",
        candidates.join(" / ")
    )))
}

/// Pull a readable message out of an upstream error body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}


/// System text asking a structured-output backend for an AgentOutput
/// object as its terminal message.
pub(crate) fn output_contract() -> String {
    format!(
        "Respond with a single JSON object (no prose, no code fence) matching this schema:\n{}",
        agent_output_schema()
    )
}
