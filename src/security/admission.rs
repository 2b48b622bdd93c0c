//! The admission decision: run one profile's gates against one request.

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::env::SecuritySettings;
use crate::observability::metrics;
use crate::security::access_control::{
    has_valid_api_key, require_api_key, validate_internal_secret, ApiKeyMode,
};
use crate::security::audit::log_security_event;
use crate::security::cors::{apply_cors, validate_origin, CorsOutcome};
use crate::security::error::AdmissionError;
use crate::security::headers::apply_security_headers;
use crate::security::identity::ClientIdentity;
use crate::security::profile::{Gate, SecurityProfile, Stage};
use crate::security::rate_limit::RateLimiter;

/// Terminal state of a request's pass through a profile. Each variant
/// carries the response headers accumulated up to that point.
#[derive(Debug)]
pub enum Admission {
    Admitted { headers: HeaderMap },
    PreflightHandled { headers: HeaderMap },
    Rejected { headers: HeaderMap, error: AdmissionError },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }

    pub fn headers(&self) -> &HeaderMap {
        match self {
            Admission::Admitted { headers }
            | Admission::PreflightHandled { headers }
            | Admission::Rejected { headers, .. } => headers,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Admission::Admitted { .. } => "admitted",
            Admission::PreflightHandled { .. } => "preflight",
            Admission::Rejected { .. } => "rejected",
        }
    }

    /// Headers to stamp on the handler's response, or the response to send
    /// instead of running the handler.
    pub fn into_result(self) -> Result<HeaderMap, Response> {
        match self {
            Admission::Admitted { headers } => Ok(headers),
            Admission::PreflightHandled { headers } => {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::OK;
                *response.headers_mut() = headers;
                Err(response)
            }
            Admission::Rejected { headers, error } => {
                let mut response = error.into_response();
                merge_headers(&mut response, headers);
                Err(response)
            }
        }
    }
}

/// Copy `headers` onto `response` without overriding what is already there.
pub fn merge_headers(response: &mut Response, headers: HeaderMap) {
    let target = response.headers_mut();
    let mut last_name = None;
    for (name, value) in headers {
        let name = match name {
            Some(name) => {
                last_name = Some(name.clone());
                name
            }
            None => match &last_name {
                Some(name) => name.clone(),
                None => continue,
            },
        };
        if !target.contains_key(&name) {
            target.insert(name, value);
        }
    }
}

/// Shared admission state: settings, the limiter, and the profile table.
#[derive(Clone)]
pub struct AdmissionControl {
    settings: Arc<SecuritySettings>,
    limiter: RateLimiter,
    profiles: BTreeMap<String, Arc<SecurityProfile>>,
}

impl AdmissionControl {
    pub fn new(
        settings: Arc<SecuritySettings>,
        limiter: RateLimiter,
        profiles: BTreeMap<String, Arc<SecurityProfile>>,
    ) -> Self {
        Self {
            settings,
            limiter,
            profiles,
        }
    }

    /// Only the five built-in profiles, on the default tiers.
    pub fn with_builtin_profiles(settings: Arc<SecuritySettings>, limiter: RateLimiter) -> Self {
        let profiles = SecurityProfile::builtins(&crate::security::rate_limit::RateLimitConfig::presets())
            .into_iter()
            .map(|profile| (profile.name.clone(), Arc::new(profile)))
            .collect();
        Self::new(settings, limiter, profiles)
    }

    pub fn profile(&self, name: &str) -> Option<Arc<SecurityProfile>> {
        self.profiles.get(name).cloned()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Arc<SecurityProfile>> {
        self.profiles.values()
    }

    pub fn settings(&self) -> &SecuritySettings {
        &self.settings
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Run `profile` against the request head.
    pub fn admit(&self, profile: &SecurityProfile, parts: &Parts) -> Admission {
        let admission = self.run(profile, parts);
        metrics::record_decision(&profile.name, admission.outcome());
        admission
    }

    fn run(&self, profile: &SecurityProfile, parts: &Parts) -> Admission {
        let settings = self.settings.as_ref();
        let identity = ClientIdentity::from_parts(parts);
        let mut headers = HeaderMap::new();
        let mut key_verified = false;

        tracing::trace!(profile = %profile.name, stage = ?Stage::Start, client = %identity);

        for gate in &profile.gates {
            let result = match gate {
                Gate::Headers => {
                    apply_security_headers(&mut headers, settings.environment);
                    Ok(())
                }
                Gate::Cors => {
                    match apply_cors(&parts.method, &parts.headers, settings, &mut headers) {
                        CorsOutcome::Continue => Ok(()),
                        CorsOutcome::Preflight => {
                            return Admission::PreflightHandled { headers };
                        }
                    }
                }
                Gate::Origin => validate_origin(&parts.headers, settings).inspect_err(|_| {
                    log_security_event("origin_rejected", &identity, parts, "origin not allowed");
                }),
                Gate::ApiKey(ApiKeyMode::Required) => {
                    require_api_key(&parts.headers, settings).map(|()| {
                        key_verified = settings.public_api_key.is_some();
                    })
                }
                Gate::ApiKey(ApiKeyMode::Optional) => {
                    key_verified = has_valid_api_key(&parts.headers, settings);
                    Ok(())
                }
                Gate::InternalSecret => validate_internal_secret(parts, &identity, settings),
                Gate::RateLimit(config) => {
                    self.limiter
                        .check(&profile.name, &identity, config, &mut headers)
                }
                Gate::TieredRateLimit {
                    with_key,
                    without_key,
                } => {
                    let config = if key_verified { with_key } else { without_key };
                    self.limiter
                        .check(&profile.name, &identity, config, &mut headers)
                }
            };

            if let Err(error) = result {
                tracing::debug!(
                    profile = %profile.name,
                    stage = ?gate.stage(),
                    reason = error.kind(),
                    client = %identity,
                    "Request rejected"
                );
                return Admission::Rejected { headers, error };
            }
        }

        tracing::trace!(profile = %profile.name, stage = ?Stage::Admitted, client = %identity);
        Admission::Admitted { headers }
    }
}
