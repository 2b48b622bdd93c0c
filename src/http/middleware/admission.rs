//! Admission middleware.
//!
//! Wraps a handler (or the whole gateway) in a security profile: the profile
//! runs first, and the handler only sees requests that reach `Admitted`.
//! Headers accumulated by the gates are stamped onto the handler's response
//! unless the handler set them itself. A handler panic becomes the generic
//! 500 at this boundary.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::routing::RouteTable;
use crate::security::admission::{merge_headers, AdmissionControl};
use crate::security::error::{AdmissionError, ErrorBody};
use crate::security::profile::SecurityProfile;

/// State for guarding a fixed set of handlers with one profile.
#[derive(Clone)]
pub struct ProfileGuard {
    pub control: Arc<AdmissionControl>,
    pub profile: Arc<SecurityProfile>,
}

/// State for the gateway, where the profile depends on the route.
#[derive(Clone)]
pub struct GatewayState {
    pub control: Arc<AdmissionControl>,
    pub routes: Arc<RouteTable>,
}

/// Use with `axum::middleware::from_fn_with_state(ProfileGuard { .. }, profile_middleware)`.
pub async fn profile_middleware(
    State(guard): State<ProfileGuard>,
    request: Request<Body>,
    next: Next,
) -> Response {
    guard_request(&guard.control, &guard.profile, request, next).await
}

pub async fn route_admission_middleware(
    State(state): State<GatewayState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(profile) = state.routes.resolve(&request) else {
        tracing::warn!(path = %request.uri().path(), "No route matched");
        let body = ErrorBody {
            success: false,
            error: "No matching route".to_string(),
            hint: None,
            retry_after: None,
        };
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    };

    guard_request(&state.control, &profile, request, next).await
}

async fn guard_request(
    control: &AdmissionControl,
    profile: &SecurityProfile,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let headers = match control.admit(profile, &parts).into_result() {
        Ok(headers) => headers,
        Err(response) => return response,
    };

    let mut response = AssertUnwindSafe(next.run(Request::from_parts(parts, body)))
        .catch_unwind()
        .await
        .unwrap_or_else(handler_panicked);
    merge_headers(&mut response, headers);
    response
}

fn handler_panicked(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AdmissionError::HandlerFailure(format!("handler panicked: {}", detail)).into_response()
}
