//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! process environment (+ .env)
//!     → env.rs (SecuritySettings: origins, API key, internal secret, mode)
//!
//! both shared via Arc for the lifetime of the process
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Secrets never live in the config file

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use env::{Environment, SecuritySettings};
pub use loader::{load_config, ConfigError};
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::RouteConfig;
