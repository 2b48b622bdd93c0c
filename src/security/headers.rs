//! Hardening response headers.
//!
//! Stamped on every response that passes through a profile, whether it is
//! admitted, rejected or a preflight. HSTS only goes out in production.

use axum::http::header::{
    HeaderName, HeaderValue, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
    X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use axum::http::HeaderMap;

use crate::config::env::Environment;

pub const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

pub fn apply_security_headers(headers: &mut HeaderMap, environment: Environment) {
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        PERMISSIONS_POLICY,
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );

    if environment.is_production() {
        headers.insert(
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsts_only_in_production() {
        let mut dev = HeaderMap::new();
        apply_security_headers(&mut dev, Environment::Development);
        assert_eq!(dev.get(X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(dev.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert!(dev.get(PERMISSIONS_POLICY).is_some());
        assert!(dev.get(STRICT_TRANSPORT_SECURITY).is_none());

        let mut prod = HeaderMap::new();
        apply_security_headers(&mut prod, Environment::Production);
        assert_eq!(
            prod.get(STRICT_TRANSPORT_SECURITY).unwrap(),
            "max-age=31536000; includeSubDomains"
        );
    }
}
