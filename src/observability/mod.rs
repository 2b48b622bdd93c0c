//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, `security` target for audits)
//!     → metrics.rs (admission counters, store gauge)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Security events use their own target so they can be routed separately
//! - Metrics are cheap (atomic increments) and safe to record before init

pub mod logging;
pub mod metrics;
