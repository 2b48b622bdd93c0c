//! The assembled gateway: route table, admission, forwarding.

use admission_gateway::config::schema::{GateConfig, ProfileConfig, RouteConfig};
use admission_gateway::config::{ConfigError, GatewayConfig};
use admission_gateway::config::validation::ValidationError;
use admission_gateway::lifecycle::startup::assemble;
use admission_gateway::lifecycle::Shutdown;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceExt;

mod common;

use common::INTERNAL_SECRET;

fn route(name: &str, prefix: &str, profile: &str, priority: u32) -> RouteConfig {
    RouteConfig {
        name: name.to_string(),
        host: None,
        path_prefix: Some(prefix.to_string()),
        profile: profile.to_string(),
        priority,
    }
}

fn config(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstream.address = upstream.to_string();
    config.routes = vec![
        route("api", "/api", "basic", 0),
        route("internal", "/api/internal", "internal", 10),
    ];
    config
}

fn router(config: GatewayConfig) -> Router {
    let clock = common::manual_clock();
    assemble(config, common::configured_settings(), clock)
        .unwrap()
        .server
        .router()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[tokio::test]
async fn test_admitted_request_reaches_upstream() {
    let upstream = common::start_mock_backend().await;
    let app = router(config(upstream));

    let response = app
        .oneshot(Request::get("/api/quotes?symbol=ACME").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());
    assert_eq!(response.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    let echoed = body_text(response).await;
    assert!(echoed.starts_with("get /api/quotes?symbol=acme http/1.1"));
}

#[tokio::test]
async fn test_higher_priority_route_selects_internal_profile() {
    let upstream = common::start_mock_backend().await;
    let app = router(config(upstream));

    let denied = app
        .clone()
        .oneshot(Request::get("/api/internal/refresh").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let allowed = app
        .oneshot(
            Request::get("/api/internal/refresh")
                .header("x-internal-secret", INTERNAL_SECRET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
    // the secret header is forwarded untouched
    assert!(body_text(allowed).await.contains("x-internal-secret"));
}

#[tokio::test]
async fn test_unrouted_request_is_404_without_default() {
    let upstream = common::start_mock_backend().await;
    let app = router(config(upstream));

    let response = app
        .oneshot(Request::get("/apiary").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_text(response).await,
        r#"{"success":false,"error":"No matching route"}"#
    );
}

#[tokio::test]
async fn test_default_profile_covers_unrouted_paths() {
    let upstream = common::start_mock_backend().await;
    let mut config = config(upstream);
    config.default_profile = Some("internal".to_string());
    let app = router(config);

    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_custom_profile_from_config() {
    let upstream = common::start_mock_backend().await;
    let mut config = config(upstream);
    config.profiles.insert(
        "webhook".to_string(),
        ProfileConfig {
            gates: vec![GateConfig::Headers, GateConfig::RateLimit { tier: "strict".to_string() }],
        },
    );
    config.routes.push(route("hooks", "/hooks", "webhook", 0));
    let app = router(config);

    let mut last = StatusCode::OK;
    for _ in 0..6 {
        let response = app
            .clone()
            .oneshot(Request::post("/hooks/payments").body(Body::empty()).unwrap())
            .await
            .unwrap();
        last = response.status();
    }
    assert_eq!(last, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_unreachable_upstream_is_generic_500() {
    // nothing listens on the discard port
    let app = router(config("127.0.0.1:9".parse().unwrap()));

    let response = app
        .oneshot(Request::get("/api/quotes").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(body.contains("Internal server error"));
    assert!(!body.contains("127.0.0.1"));
}

#[test]
fn test_assemble_rejects_unknown_profiles() {
    let mut config = GatewayConfig::default();
    config.routes = vec![route("api", "/api", "premium", 0)];
    config.default_profile = Some("nope".to_string());

    let err = match assemble(config, common::configured_settings(), common::manual_clock()) {
        Err(err) => err,
        Ok(_) => panic!("unknown profiles must not assemble"),
    };
    match err {
        ConfigError::Validation(errors) => {
            assert!(errors.contains(&ValidationError::UnknownProfile {
                route: "api".to_string(),
                profile: "premium".to_string(),
            }));
            assert!(errors.contains(&ValidationError::UnknownDefaultProfile("nope".to_string())));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_end_to_end_over_tcp() {
    let upstream = common::start_mock_backend().await;
    let gateway = assemble(
        config(upstream),
        common::configured_settings(),
        common::manual_clock(),
    )
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = tokio::spawn(gateway.server.run(listener, shutdown.subscribe()));

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let response = client
        .get(format!("http://{}/api/quotes", addr))
        .header("x-forwarded-for", "203.0.113.50")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());
    assert_eq!(response.headers().get("x-content-type-options").unwrap(), "nosniff");
    let echoed = response.text().await.unwrap();
    // the transport peer is appended after the declared hop
    assert!(echoed.contains("x-forwarded-for: 203.0.113.50, 127.0.0.1"));

    drop(client);
    shutdown.trigger();
    server.await.unwrap().unwrap();
}
