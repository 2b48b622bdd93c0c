//! Request admission gateway.
//!
//! Every request passes through a security profile before it reaches the
//! application: security headers, CORS, origin checks, API-key and
//! internal-secret gates, and fixed-window rate limiting.

pub mod config;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::{GatewayConfig, SecuritySettings};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use security::{Admission, AdmissionControl, SecurityProfile};
