//! Credential gates: public API key and internal shared secret.
//!
//! The two gates deliberately disagree about an unconfigured server:
//! - API key: no `PUBLIC_API_KEY` configured means no key enforcement
//!   (fail open), though a key header must still be present
//! - Internal secret: no `INTERNAL_API_SECRET` configured rejects everything
//!   with a 500 (fail closed), since the endpoints behind it are privileged

use axum::http::request::Parts;
use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::config::env::SecuritySettings;
use crate::security::audit::log_security_event;
use crate::security::error::AdmissionError;
use crate::security::identity::ClientIdentity;

pub const X_API_KEY: &str = "x-api-key";
pub const X_INTERNAL_SECRET: &str = "x-internal-secret";

/// How an API-key gate treats a missing or wrong key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyMode {
    /// Reject without a valid key.
    #[default]
    Required,
    /// Never reject; a valid key only unlocks the richer rate-limit tier.
    Optional,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Compare secrets without short-circuiting on the first differing byte.
fn secrets_match(supplied: &str, expected: &str) -> bool {
    let supplied = Sha256::digest(supplied.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    supplied
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Required-mode API key check.
pub fn require_api_key(
    headers: &HeaderMap,
    settings: &SecuritySettings,
) -> Result<(), AdmissionError> {
    let Some(supplied) = header_str(headers, X_API_KEY) else {
        return Err(AdmissionError::MissingApiKey {
            hint: settings.api_key_hint(),
        });
    };

    let Some(expected) = settings.public_api_key.as_deref() else {
        return Ok(());
    };

    if secrets_match(supplied, expected) {
        Ok(())
    } else {
        Err(AdmissionError::InvalidApiKey)
    }
}

/// Optional-mode API key check: true only for a configured, matching key.
pub fn has_valid_api_key(headers: &HeaderMap, settings: &SecuritySettings) -> bool {
    match (header_str(headers, X_API_KEY), settings.public_api_key.as_deref()) {
        (Some(supplied), Some(expected)) => secrets_match(supplied, expected),
        _ => false,
    }
}

/// Shared-secret check for server-to-server calls.
pub fn validate_internal_secret(
    parts: &Parts,
    identity: &ClientIdentity,
    settings: &SecuritySettings,
) -> Result<(), AdmissionError> {
    let Some(expected) = settings.internal_secret.as_deref() else {
        tracing::error!("SECURITY WARNING: INTERNAL_API_SECRET not configured");
        return Err(AdmissionError::InternalSecretNotConfigured);
    };

    match header_str(&parts.headers, X_INTERNAL_SECRET) {
        Some(supplied) if secrets_match(supplied, expected) => Ok(()),
        supplied => {
            let reason = if supplied.is_some() { "mismatch" } else { "missing" };
            log_security_event("unauthorized_internal_access", identity, parts, reason);
            Err(AdmissionError::Unauthorized)
        }
    }
}
