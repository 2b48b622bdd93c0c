//! Request admission subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity.rs (address + user-agent signature)
//!     → profile.rs (which gates, in which order)
//!     → admission.rs (run gates, accumulate headers)
//!         → headers.rs, cors.rs, access_control.rs, rate_limit.rs
//!     → Admitted | PreflightHandled | Rejected
//!
//! Background:
//!     sweeper.rs → store.rs (purge closed windows)
//! ```
//!
//! # Design Decisions
//! - Gates are data; one runner interprets every profile
//! - The store sits behind a trait so a shared backend can replace it
//! - Gate failures become responses here and never escape as errors

pub mod access_control;
pub mod admission;
pub mod audit;
pub mod clock;
pub mod cors;
pub mod error;
pub mod headers;
pub mod identity;
pub mod profile;
pub mod rate_limit;
pub mod store;
pub mod sweeper;

pub use access_control::ApiKeyMode;
pub use admission::{Admission, AdmissionControl};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AdmissionError;
pub use identity::ClientIdentity;
pub use profile::{Gate, SecurityProfile};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use store::{InMemoryStore, RateLimitEntry, RateLimitStore};
pub use sweeper::StoreSweeper;
