//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → middleware/admission.rs (route → profile → admit or respond)
//!     → forward.rs (admitted requests go to the upstream app)
//!     → response stamped with admission headers
//!     → Send to client
//! ```

pub mod forward;
pub mod middleware;
pub mod server;

pub use server::GatewayServer;
