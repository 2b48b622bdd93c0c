//! Forwarding of admitted requests to the upstream application.
//!
//! # Design Decisions
//! - Single upstream; the gateway only decides admission
//! - Bodies stream through in both directions, nothing is buffered
//! - Transport failures are handler failures: generic 500, detail in logs
//! - The peer address is appended to `X-Forwarded-For`

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{
        header::HeaderValue,
        uri::{Authority, InvalidUri, PathAndQuery, Scheme},
        Request, Uri,
    },
    response::Response,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::str::FromStr;

use crate::security::error::AdmissionError;
use crate::security::identity::X_FORWARDED_FOR;

/// The application behind the gateway.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl Upstream {
    pub fn new(address: &str) -> Result<Self, InvalidUri> {
        let authority = Authority::from_str(address)?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self { client, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }
}

pub async fn forward_handler(
    State(upstream): State<Upstream>,
    request: Request<Body>,
) -> Result<Response, AdmissionError> {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (mut parts, body) = request.into_parts();

    // URI rewrite
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(upstream.authority.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = Uri::from_parts(uri_parts)
        .map_err(|e| AdmissionError::HandlerFailure(format!("invalid upstream uri: {}", e)))?;

    if let Some(ConnectInfo(peer)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        let forwarded = match parts.headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{}, {}", existing, peer.ip()),
            None => peer.ip().to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded) {
            parts.headers.insert(X_FORWARDED_FOR, value);
        }
    }

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        uri = %parts.uri,
        "Forwarding admitted request"
    );

    let response = upstream
        .client
        .request(Request::from_parts(parts, body))
        .await
        .map_err(|e| {
            AdmissionError::HandlerFailure(format!(
                "upstream request {} failed: {}",
                request_id, e
            ))
        })?;

    let (parts, body) = response.into_parts();
    Ok(Response::from_parts(parts, Body::new(body)))
}
