//! Configuration schema definitions.
//!
//! This module defines the file-based configuration for the gateway.
//! All types derive Serde traits for deserialization from TOML. Secrets and
//! allow-lists come from the environment instead (see `config::env`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::security::access_control::ApiKeyMode;
use crate::security::rate_limit::RateLimitConfig;

/// Root configuration for the admission gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The application requests are forwarded to once admitted.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate-limit store and tier configuration.
    pub rate_limit: RateLimitSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route definitions mapping requests to security profiles.
    pub routes: Vec<RouteConfig>,

    /// Profile applied when no route matches. `None` answers 404.
    pub default_profile: Option<String>,

    /// Operator-defined profiles, in addition to the built-in five.
    pub profiles: BTreeMap<String, ProfileConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream application.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Rate-limit store settings and tier overrides.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// How often closed windows are purged from the store.
    pub sweep_interval_secs: u64,

    /// Overrides for the named tiers, or new tiers.
    pub tiers: BTreeMap<String, TierOverride>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 5 * 60,
            tiers: BTreeMap::new(),
        }
    }
}

/// Partial tier definition. Unset fields keep the preset's value; a new tier
/// must set both `window_ms` and `max`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TierOverride {
    pub window_ms: Option<u64>,
    pub max: Option<u64>,
    pub message: Option<String>,
}

impl RateLimitSettings {
    /// Presets merged with overrides. Incomplete new tiers are left out;
    /// validation reports them.
    pub fn resolved_tiers(&self) -> BTreeMap<String, RateLimitConfig> {
        let mut tiers = RateLimitConfig::presets();

        for (name, tier) in &self.tiers {
            let merged = match tiers.get(name) {
                Some(base) => Some(RateLimitConfig {
                    window_ms: tier.window_ms.unwrap_or(base.window_ms),
                    max: tier.max.unwrap_or(base.max),
                    message: tier.message.clone().unwrap_or_else(|| base.message.clone()),
                }),
                None => match (tier.window_ms, tier.max) {
                    (Some(window_ms), Some(max)) => Some(RateLimitConfig {
                        window_ms,
                        max,
                        message: tier
                            .message
                            .clone()
                            .unwrap_or_else(|| crate::security::rate_limit::DEFAULT_MESSAGE.to_string()),
                    }),
                    _ => None,
                },
            };
            if let Some(config) = merged {
                tiers.insert(name.clone(), config);
            }
        }

        tiers
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Route configuration mapping requests to a profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Host header to match (exact match).
    #[serde(default)]
    pub host: Option<String>,

    /// Path prefix to match.
    #[serde(default)]
    pub path_prefix: Option<String>,

    /// Security profile guarding this route.
    pub profile: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// An operator-defined profile: gates run in order.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProfileConfig {
    pub gates: Vec<GateConfig>,
}

/// One gate in a profile definition. Rate-limit gates name a tier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateConfig {
    Headers,
    Cors,
    Origin,
    ApiKey {
        #[serde(default)]
        mode: ApiKeyMode,
    },
    InternalSecret,
    RateLimit {
        tier: String,
    },
    TieredRateLimit {
        with_key: String,
        without_key: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parses() {
        let raw = r#"
            default_profile = "basic"

            [listener]
            bind_address = "127.0.0.1:9000"

            [upstream]
            address = "127.0.0.1:3000"

            [rate_limit]
            sweep_interval_secs = 60

            [rate_limit.tiers.strict]
            max = 3

            [rate_limit.tiers.partner]
            window_ms = 60000
            max = 500

            [[routes]]
            name = "public-data"
            path_prefix = "/api/public"
            profile = "public"
            priority = 10

            [profiles.metered]
            gates = [
                { kind = "headers" },
                { kind = "cors" },
                { kind = "api_key", mode = "optional" },
                { kind = "tiered_rate_limit", with_key = "partner", without_key = "standard" },
            ]
        "#;
        let config: GatewayConfig = toml::from_str(raw).unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.default_profile.as_deref(), Some("basic"));
        assert_eq!(config.routes[0].profile, "public");
        assert_eq!(config.profiles["metered"].gates.len(), 4);
        assert_eq!(
            config.profiles["metered"].gates[2],
            GateConfig::ApiKey { mode: ApiKeyMode::Optional }
        );

        let tiers = config.rate_limit.resolved_tiers();
        assert_eq!(tiers["strict"].max, 3);
        assert_eq!(tiers["strict"].window_ms, 900_000);
        assert_eq!(tiers["partner"].max, 500);
        assert_eq!(tiers["partner"].message, crate::security::rate_limit::DEFAULT_MESSAGE);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.rate_limit.sweep_interval_secs, 300);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert!(config.routes.is_empty());
        assert_eq!(config.rate_limit.resolved_tiers().len(), 6);
    }

    #[test]
    fn test_incomplete_new_tier_is_skipped() {
        let mut settings = RateLimitSettings::default();
        settings.tiers.insert(
            "half".into(),
            TierOverride {
                max: Some(1),
                ..Default::default()
            },
        );
        assert!(!settings.resolved_tiers().contains_key("half"));
    }
}
