//! Route matching logic.
//!
//! # Design Decisions
//! - Host matching is case-insensitive and ignores the port
//! - Path matching is case-sensitive, on path segments: `/api` matches
//!   `/api` and `/api/quotes` but not `/apiary`
//! - Empty condition = always matches (wildcard)

use axum::body::Body;
use axum::http::uri::Authority;
use axum::http::Request;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request<Body>) -> bool;
}

/// Matches the Host header.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        req.headers()
            .get("host")
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().host())
            .and_then(|h| h.parse::<Authority>().ok())
            .map(|authority| authority.host().eq_ignore_ascii_case(&self.expected_host))
            .unwrap_or(false)
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        match req.uri().path().strip_prefix(&self.prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.prefix.is_empty(),
            None => false,
        }
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.matchers.iter().all(|m| m.matches(req))
    }
}
