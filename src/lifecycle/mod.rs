//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config + settings → store, profiles, routes → sweeper → listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain in-flight requests → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{assemble, run, Gateway};
