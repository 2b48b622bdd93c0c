//! Cross-origin gating.
//!
//! # Responsibilities
//! - Echo allow-listed origins back in `Access-Control-Allow-Origin`
//! - Answer preflight (`OPTIONS`) requests directly
//! - Reject state-changing requests from foreign origins (`validate_origin`)
//!
//! # Design Decisions
//! - Development mode allows any origin and skips origin validation
//! - Origin validation falls back to `Referer` when `Origin` is absent

use axum::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ORIGIN,
    REFERER,
};
use axum::http::{HeaderMap, Method};

use crate::config::env::SecuritySettings;
use crate::security::error::AdmissionError;

const ALLOWED_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS,PATCH";
const ALLOWED_HEADERS: &str = "Content-Type,Authorization,X-API-Key,X-Internal-Secret";
const PREFLIGHT_MAX_AGE_SECS: &str = "86400";

/// What the caller should do after CORS headers are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorsOutcome {
    Continue,
    /// Preflight answered; nothing else runs.
    Preflight,
}

pub fn apply_cors(
    method: &Method,
    request_headers: &HeaderMap,
    settings: &SecuritySettings,
    response_headers: &mut HeaderMap,
) -> CorsOutcome {
    let origin = request_headers.get(ORIGIN);
    let origin_str = origin.and_then(|v| v.to_str().ok()).unwrap_or_default();

    match origin {
        Some(value) if settings.is_origin_allowed(origin_str) => {
            response_headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value.clone());
        }
        _ if settings.environment.is_development() => {
            let echoed = origin
                .filter(|_| !origin_str.is_empty())
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static("*"));
            response_headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, echoed);
        }
        _ => {}
    }

    response_headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    response_headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
    response_headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
    response_headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(PREFLIGHT_MAX_AGE_SECS));

    if method == Method::OPTIONS {
        CorsOutcome::Preflight
    } else {
        CorsOutcome::Continue
    }
}

/// Check the declared origin (or referrer) against the allow-list.
pub fn validate_origin(
    request_headers: &HeaderMap,
    settings: &SecuritySettings,
) -> Result<(), AdmissionError> {
    if settings.environment.is_development() {
        return Ok(());
    }

    let declared = request_headers
        .get(ORIGIN)
        .or_else(|| request_headers.get(REFERER))
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if settings
        .allowed_origins
        .iter()
        .any(|allowed| origin_matches(declared, allowed))
    {
        Ok(())
    } else {
        Err(AdmissionError::OriginRejected)
    }
}

/// Exact origin, or a referrer URL under it.
fn origin_matches(declared: &str, allowed: &str) -> bool {
    let allowed = allowed.trim_end_matches('/');
    if allowed.is_empty() {
        return false;
    }
    match declared.strip_prefix(allowed) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}
