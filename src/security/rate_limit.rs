//! Window-counter rate limiting.
//!
//! # Algorithm
//! A counter per (profile, client identity) opens on the first request and is
//! reset wholesale when its window closes. A request is denied once the
//! counter exceeds `max`; `max = 0` therefore denies everything.
//!
//! # Headers
//! Every evaluation writes `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
//! `X-RateLimit-Reset` (ISO-8601). Denials add `Retry-After` in seconds.

use axum::http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use axum::http::HeaderMap;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::observability::metrics;
use crate::security::clock::Clock;
use crate::security::error::AdmissionError;
use crate::security::identity::ClientIdentity;
use crate::security::store::RateLimitStore;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

pub const DEFAULT_MESSAGE: &str = "Too many requests, please try again later.";

const MINUTE_MS: u64 = 60 * 1000;
const HOUR_MS: u64 = 60 * MINUTE_MS;

/// One rate-limit tier. Immutable once profiles are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max: u64,
    #[serde(default = "default_message")]
    pub message: String,
}

fn default_message() -> String {
    DEFAULT_MESSAGE.to_string()
}

impl RateLimitConfig {
    pub fn new(window_ms: u64, max: u64, message: impl Into<String>) -> Self {
        Self {
            window_ms,
            max,
            message: message.into(),
        }
    }

    /// 5 per 15 minutes, for login and password flows.
    pub fn strict() -> Self {
        Self::new(
            15 * MINUTE_MS,
            5,
            "Too many authentication attempts. Please try again in 15 minutes.",
        )
    }

    pub fn auth() -> Self {
        Self::new(15 * MINUTE_MS, 10, "Too many requests. Please try again later.")
    }

    /// 10 per hour, for contact and subscribe forms.
    pub fn moderate() -> Self {
        Self::new(HOUR_MS, 10, "Too many requests. Please try again in an hour.")
    }

    pub fn standard() -> Self {
        Self::new(MINUTE_MS, 100, "Rate limit exceeded. Please slow down.")
    }

    pub fn public_with_key() -> Self {
        Self::new(
            HOUR_MS,
            1000,
            "API rate limit exceeded. Please check your subscription plan.",
        )
    }

    /// Anonymous access to public data is disabled.
    pub fn public_without_key() -> Self {
        Self::new(
            MINUTE_MS,
            0,
            "API key required. Please include X-API-Key header in your request.",
        )
    }

    /// The named default tiers.
    pub fn presets() -> BTreeMap<String, RateLimitConfig> {
        [
            ("strict", Self::strict()),
            ("auth", Self::auth()),
            ("moderate", Self::moderate()),
            ("standard", Self::standard()),
            ("public_with_key", Self::public_with_key()),
            ("public_without_key", Self::public_without_key()),
        ]
        .into_iter()
        .map(|(name, config)| (name.to_string(), config))
        .collect()
    }
}

/// Result of counting one request against a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub limit: u64,
    pub count: u64,
    pub reset_time: DateTime<Utc>,
    /// Seconds until the window closes; set only on denial.
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        self.retry_after.is_none()
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }

    pub fn write_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining()));
        let reset = self.reset_time.to_rfc3339_opts(SecondsFormat::Millis, true);
        if let Ok(value) = HeaderValue::from_str(&reset) {
            headers.insert(X_RATELIMIT_RESET, value);
        }
        if let Some(retry_after) = self.retry_after {
            headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
        }
    }
}

/// Admit/deny decisions over a shared store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    /// Store key for `identity` under `namespace` (the profile name).
    pub fn key_for(namespace: &str, identity: &ClientIdentity) -> String {
        format!("ratelimit:{}:{}", namespace, identity)
    }

    /// Count one request for `key` and decide.
    pub fn evaluate(&self, key: &str, config: &RateLimitConfig) -> RateLimitDecision {
        let entry = self.store.increment(key, config.window_ms);

        let retry_after = (entry.count > config.max).then(|| {
            let millis = (entry.reset_time - self.clock.now()).num_milliseconds().max(0);
            (millis as u64).div_ceil(1000)
        });

        RateLimitDecision {
            limit: config.max,
            count: entry.count,
            reset_time: entry.reset_time,
            retry_after,
        }
    }

    /// Evaluate, stamp the quota headers, and map a denial to an error.
    pub fn check(
        &self,
        namespace: &str,
        identity: &ClientIdentity,
        config: &RateLimitConfig,
        headers: &mut HeaderMap,
    ) -> Result<(), AdmissionError> {
        let decision = self.evaluate(&Self::key_for(namespace, identity), config);
        decision.write_headers(headers);

        match decision.retry_after {
            None => Ok(()),
            Some(retry_after) => {
                metrics::record_rate_limited(namespace);
                Err(AdmissionError::RateLimitExceeded {
                    message: config.message.clone(),
                    retry_after,
                })
            }
        }
    }
}
