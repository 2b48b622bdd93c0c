//! Security profiles: named, ordered gate lists.
//!
//! # Request lifecycle
//! ```text
//! Start → Headers → CORS → [profile gates] → RateLimited → Admitted
//!                     │            │               │
//!                     ▼            └──────┬────────┘
//!              PreflightHandled        Rejected
//! ```
//! Any gate failure jumps straight to `Rejected`; later gates never run.
//!
//! # Built-in profiles
//! | Profile  | Gates                                   | Tier              |
//! |----------|-----------------------------------------|-------------------|
//! | public   | Headers → CORS → ApiKey(required) → RL  | `public_with_key` |
//! | auth     | Headers → CORS → Origin → RL            | `strict`          |
//! | form     | Headers → CORS → Origin → RL            | `moderate`        |
//! | internal | Headers → InternalSecret                | none              |
//! | basic    | Headers → CORS                          | none              |

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::schema::{GateConfig, GatewayConfig};
use crate::config::validation::ValidationError;
use crate::security::access_control::ApiKeyMode;
use crate::security::rate_limit::RateLimitConfig;

pub const PUBLIC: &str = "public";
pub const AUTH: &str = "auth";
pub const FORM: &str = "form";
pub const INTERNAL: &str = "internal";
pub const BASIC: &str = "basic";

pub const BUILTIN_PROFILES: [&str; 5] = [PUBLIC, AUTH, FORM, INTERNAL, BASIC];

/// Position of a request in the profile pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Headers,
    Cors,
    Gates,
    RateLimited,
    Admitted,
}

/// A single check in a profile pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Headers,
    Cors,
    Origin,
    ApiKey(ApiKeyMode),
    InternalSecret,
    RateLimit(RateLimitConfig),
    /// Uses `with_key` when an earlier `ApiKey` gate verified the caller's key.
    TieredRateLimit {
        with_key: RateLimitConfig,
        without_key: RateLimitConfig,
    },
}

impl Gate {
    pub fn stage(&self) -> Stage {
        match self {
            Gate::Headers => Stage::Headers,
            Gate::Cors => Stage::Cors,
            Gate::Origin | Gate::ApiKey(_) | Gate::InternalSecret => Stage::Gates,
            Gate::RateLimit(_) | Gate::TieredRateLimit { .. } => Stage::RateLimited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityProfile {
    pub name: String,
    pub gates: Vec<Gate>,
}

impl SecurityProfile {
    pub fn new(name: impl Into<String>, gates: Vec<Gate>) -> Self {
        Self {
            name: name.into(),
            gates,
        }
    }

    /// Public market data. A key is mandatory.
    pub fn public(tier: RateLimitConfig) -> Self {
        Self::new(
            PUBLIC,
            vec![
                Gate::Headers,
                Gate::Cors,
                Gate::ApiKey(ApiKeyMode::Required),
                Gate::RateLimit(tier),
            ],
        )
    }

    /// Login, signup and password reset.
    pub fn auth(tier: RateLimitConfig) -> Self {
        Self::new(
            AUTH,
            vec![Gate::Headers, Gate::Cors, Gate::Origin, Gate::RateLimit(tier)],
        )
    }

    /// Contact and subscribe forms.
    pub fn form(tier: RateLimitConfig) -> Self {
        Self::new(
            FORM,
            vec![Gate::Headers, Gate::Cors, Gate::Origin, Gate::RateLimit(tier)],
        )
    }

    /// Scheduled jobs and server-to-server calls.
    pub fn internal() -> Self {
        Self::new(INTERNAL, vec![Gate::Headers, Gate::InternalSecret])
    }

    pub fn basic() -> Self {
        Self::new(BASIC, vec![Gate::Headers, Gate::Cors])
    }

    /// The five built-in profiles over the given tiers.
    pub fn builtins(tiers: &BTreeMap<String, RateLimitConfig>) -> Vec<SecurityProfile> {
        let tier = |name: &str, preset: fn() -> RateLimitConfig| {
            tiers.get(name).cloned().unwrap_or_else(preset)
        };

        vec![
            Self::public(tier("public_with_key", RateLimitConfig::public_with_key)),
            Self::auth(tier("strict", RateLimitConfig::strict)),
            Self::form(tier("moderate", RateLimitConfig::moderate)),
            Self::internal(),
            Self::basic(),
        ]
    }
}

/// Resolve a configured gate against the tier table.
fn resolve_gate(
    profile: &str,
    gate: &GateConfig,
    tiers: &BTreeMap<String, RateLimitConfig>,
) -> Result<Gate, ValidationError> {
    let lookup = |tier: &String| {
        tiers.get(tier).cloned().ok_or_else(|| ValidationError::UnknownTier {
            profile: profile.to_string(),
            tier: tier.clone(),
        })
    };

    Ok(match gate {
        GateConfig::Headers => Gate::Headers,
        GateConfig::Cors => Gate::Cors,
        GateConfig::Origin => Gate::Origin,
        GateConfig::ApiKey { mode } => Gate::ApiKey(*mode),
        GateConfig::InternalSecret => Gate::InternalSecret,
        GateConfig::RateLimit { tier } => Gate::RateLimit(lookup(tier)?),
        GateConfig::TieredRateLimit {
            with_key,
            without_key,
        } => Gate::TieredRateLimit {
            with_key: lookup(with_key)?,
            without_key: lookup(without_key)?,
        },
    })
}

/// Built-in plus operator-defined profiles, keyed by name.
///
/// Collects every problem instead of stopping at the first.
pub fn build_profiles(
    config: &GatewayConfig,
) -> Result<BTreeMap<String, Arc<SecurityProfile>>, Vec<ValidationError>> {
    let tiers = config.rate_limit.resolved_tiers();
    let mut errors = Vec::new();

    let mut profiles: BTreeMap<String, Arc<SecurityProfile>> = SecurityProfile::builtins(&tiers)
        .into_iter()
        .map(|profile| (profile.name.clone(), Arc::new(profile)))
        .collect();

    for (name, definition) in &config.profiles {
        if BUILTIN_PROFILES.contains(&name.as_str()) {
            errors.push(ValidationError::ReservedProfileName(name.clone()));
            continue;
        }

        let mut gates = Vec::with_capacity(definition.gates.len());
        for gate in &definition.gates {
            match resolve_gate(name, gate, &tiers) {
                Ok(gate) => gates.push(gate),
                Err(e) => errors.push(e),
            }
        }
        profiles.insert(name.clone(), Arc::new(SecurityProfile::new(name.clone(), gates)));
    }

    if errors.is_empty() {
        Ok(profiles)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ProfileConfig, TierOverride};

    #[test]
    fn test_builtins_follow_tier_overrides() {
        let mut config = GatewayConfig::default();
        config.rate_limit.tiers.insert(
            "strict".into(),
            TierOverride {
                max: Some(2),
                ..Default::default()
            },
        );

        let profiles = build_profiles(&config).unwrap();
        assert_eq!(profiles.len(), 5);
        assert_eq!(
            profiles[AUTH].gates.last(),
            Some(&Gate::RateLimit(RateLimitConfig {
                max: 2,
                ..RateLimitConfig::strict()
            }))
        );
        assert_eq!(profiles[INTERNAL].gates, vec![Gate::Headers, Gate::InternalSecret]);
        assert_eq!(profiles[BASIC].gates, vec![Gate::Headers, Gate::Cors]);
    }

    #[test]
    fn test_custom_profile_resolves_tiers() {
        let mut config = GatewayConfig::default();
        config.profiles.insert(
            "metered".into(),
            ProfileConfig {
                gates: vec![
                    GateConfig::Headers,
                    GateConfig::ApiKey {
                        mode: ApiKeyMode::Optional,
                    },
                    GateConfig::TieredRateLimit {
                        with_key: "public_with_key".into(),
                        without_key: "standard".into(),
                    },
                ],
            },
        );

        let profiles = build_profiles(&config).unwrap();
        let metered = &profiles["metered"];
        assert_eq!(metered.gates[1], Gate::ApiKey(ApiKeyMode::Optional));
        assert_eq!(metered.gates[2].stage(), Stage::RateLimited);
    }

    #[test]
    fn test_invalid_profiles_collect_all_errors() {
        let mut config = GatewayConfig::default();
        config.profiles.insert(
            "basic".into(),
            ProfileConfig { gates: vec![] },
        );
        config.profiles.insert(
            "broken".into(),
            ProfileConfig {
                gates: vec![
                    GateConfig::RateLimit { tier: "nope".into() },
                    GateConfig::TieredRateLimit {
                        with_key: "also-nope".into(),
                        without_key: "standard".into(),
                    },
                ],
            },
        );

        let errors = build_profiles(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::ReservedProfileName("basic".into())));
    }
}
