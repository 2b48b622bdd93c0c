//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes and gates reference existing
//!   profiles and tiers)
//! - Validate value ranges (windows, intervals, timeouts > 0)
//! - Check environment-sourced origins are well-formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure functions over the loaded config and settings

use axum::http::uri::Authority;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::config::env::SecuritySettings;
use crate::config::schema::GatewayConfig;
use crate::security::profile::build_profiles;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rate-limit tier '{0}' has a zero-length window")]
    ZeroWindow(String),

    #[error("rate-limit tier '{0}' is new and must set both window_ms and max")]
    IncompleteTier(String),

    #[error("sweep_interval_secs must be greater than zero")]
    ZeroSweepInterval,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("profile '{profile}' references unknown rate-limit tier '{tier}'")]
    UnknownTier { profile: String, tier: String },

    #[error("profile '{0}' is built in and cannot be redefined")]
    ReservedProfileName(String),

    #[error("route '{route}' references unknown profile '{profile}'")]
    UnknownProfile { route: String, profile: String },

    #[error("default_profile '{0}' is not a known profile")]
    UnknownDefaultProfile(String),

    #[error("route '{0}' has neither host nor path_prefix and would match everything")]
    CatchAllRoute(String),

    #[error("upstream address '{0}' is not a valid host:port")]
    InvalidUpstream(String),

    #[error("allowed origin '{origin}' is invalid: {reason}")]
    InvalidOrigin { origin: String, reason: String },
}

/// Validate the file configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if Authority::from_str(&config.upstream.address).is_err() {
        errors.push(ValidationError::InvalidUpstream(config.upstream.address.clone()));
    }

    let tiers = config.rate_limit.resolved_tiers();
    for name in config.rate_limit.tiers.keys() {
        if !tiers.contains_key(name) {
            errors.push(ValidationError::IncompleteTier(name.clone()));
        }
    }
    for (name, tier) in &tiers {
        if tier.window_ms == 0 {
            errors.push(ValidationError::ZeroWindow(name.clone()));
        }
    }

    let profile_names: Vec<String> = match build_profiles(config) {
        Ok(profiles) => profiles.into_keys().collect(),
        Err(profile_errors) => {
            errors.extend(profile_errors);
            crate::security::profile::BUILTIN_PROFILES
                .iter()
                .map(|name| name.to_string())
                .chain(config.profiles.keys().cloned())
                .collect()
        }
    };

    for route in &config.routes {
        if !profile_names.contains(&route.profile) {
            errors.push(ValidationError::UnknownProfile {
                route: route.name.clone(),
                profile: route.profile.clone(),
            });
        }
        if route.host.is_none() && route.path_prefix.is_none() {
            errors.push(ValidationError::CatchAllRoute(route.name.clone()));
        }
    }

    if let Some(default) = &config.default_profile {
        if !profile_names.contains(default) {
            errors.push(ValidationError::UnknownDefaultProfile(default.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate environment-sourced settings.
pub fn validate_settings(settings: &SecuritySettings) -> Result<(), Vec<ValidationError>> {
    let errors: Vec<ValidationError> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            let reason = match Url::parse(origin) {
                Err(e) => e.to_string(),
                Ok(url) if !matches!(url.scheme(), "http" | "https") => {
                    format!("unsupported scheme '{}'", url.scheme())
                }
                Ok(_) => return None,
            };
            Some(ValidationError::InvalidOrigin {
                origin: origin.clone(),
                reason,
            })
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
