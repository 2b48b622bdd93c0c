//! Route lookup.
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in priority order; first match wins
//! - Unmatched requests fall back to the default profile, if any

use axum::body::Body;
use axum::http::Request;
use std::sync::Arc;

use crate::config::schema::RouteConfig;
use crate::config::validation::ValidationError;
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher};
use crate::security::admission::AdmissionControl;
use crate::security::profile::SecurityProfile;

/// A compiled route bound to its profile.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub profile: Arc<SecurityProfile>,
    pub priority: u32,
    matcher: AndMatcher,
}

impl Route {
    pub fn matches(&self, req: &Request<Body>) -> bool {
        self.matcher.matches(req)
    }
}

#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    default_profile: Option<Arc<SecurityProfile>>,
}

impl RouteTable {
    /// Compile route definitions against the known profiles.
    pub fn from_config(
        routes: &[RouteConfig],
        default_profile: Option<&str>,
        control: &AdmissionControl,
    ) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut compiled = Vec::with_capacity(routes.len());

        for route in routes {
            let Some(profile) = control.profile(&route.profile) else {
                errors.push(ValidationError::UnknownProfile {
                    route: route.name.clone(),
                    profile: route.profile.clone(),
                });
                continue;
            };

            let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
            if let Some(host) = &route.host {
                matchers.push(Box::new(HostMatcher::new(host.clone())));
            }
            if let Some(prefix) = &route.path_prefix {
                matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
            }

            compiled.push(Route {
                name: route.name.clone(),
                profile,
                priority: route.priority,
                matcher: AndMatcher::new(matchers),
            });
        }

        let default_profile = match default_profile {
            Some(name) => match control.profile(name) {
                Some(profile) => Some(profile),
                None => {
                    errors.push(ValidationError::UnknownDefaultProfile(name.to_string()));
                    None
                }
            },
            None => None,
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        // stable sort keeps declaration order among equal priorities
        compiled.sort_by(|a, b| b.priority.cmp(&a.priority));

        Ok(Self {
            routes: compiled,
            default_profile,
        })
    }

    /// Profile guarding `req`, if any.
    pub fn resolve(&self, req: &Request<Body>) -> Option<Arc<SecurityProfile>> {
        self.routes
            .iter()
            .find(|route| route.matches(req))
            .map(|route| {
                tracing::trace!(route = %route.name, profile = %route.profile.name, "Route matched");
                route.profile.clone()
            })
            .or_else(|| self.default_profile.clone())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
