pub mod admission;

pub use admission::{profile_middleware, route_admission_middleware, GatewayState, ProfileGuard};
