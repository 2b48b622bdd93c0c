//! Client identity derivation.
//!
//! The identity buckets rate-limit counters per caller. It is derived from
//! the network address and a short digest of the user agent, and it proves
//! nothing about who the caller is.

use axum::extract::ConnectInfo;
use axum::http::{header, request::Parts, HeaderMap};
use sha2::{Digest, Sha256};
use std::fmt;
use std::net::SocketAddr;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Low-cardinality caller key: `<address>:<signature>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity {
    pub address: String,
    /// First 8 hex characters of the user-agent digest.
    pub signature: String,
}

impl ClientIdentity {
    /// Derive the identity of the caller that sent `parts`.
    ///
    /// The transport peer is taken from axum's `ConnectInfo` extension when
    /// the server was started with connect info.
    pub fn from_parts(parts: &Parts) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self::derive(&parts.headers, peer)
    }

    pub fn derive(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let address = forwarded_address(headers)
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        Self {
            address,
            signature: signature(user_agent),
        }
    }

    /// Store key for this identity.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.signature)
    }
}

/// First hop of `X-Forwarded-For`, if present and non-empty.
fn forwarded_address(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(X_FORWARDED_FOR)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

fn signature(user_agent: &str) -> String {
    let digest = Sha256::digest(user_agent.as_bytes());
    hex::encode(&digest[..4])
}
