//! Security event logging.
//!
//! Events go to the `security` tracing target so they can be routed or
//! filtered separately (`RUST_LOG=security=warn`).

use axum::http::request::Parts;

use crate::security::identity::ClientIdentity;

pub const SECURITY_TARGET: &str = "security";

/// Record a security-relevant rejection together with the caller identity.
pub fn log_security_event(event: &str, identity: &ClientIdentity, parts: &Parts, detail: &str) {
    tracing::warn!(
        target: SECURITY_TARGET,
        event,
        client = %identity,
        method = %parts.method,
        uri = %parts.uri,
        detail,
        "[SECURITY] {}",
        event
    );
}
