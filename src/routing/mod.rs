//! Routing subsystem: which security profile guards a request.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (route lookup, priority order)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: profile of the matched route, or the default profile
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Bind each route to its SecurityProfile
//!     → Sort by priority
//!     → Freeze as immutable RouteTable
//! ```

pub mod matcher;
pub mod router;

pub use router::RouteTable;
