//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router: route-selected admission in front of forwarding
//! - Wire up middleware (tracing, request ID, timeout)
//! - Serve with connect info so client identity sees the peer address

use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::GatewayConfig;
use crate::config::validation::ValidationError;
use crate::http::forward::{forward_handler, Upstream};
use crate::http::middleware::{route_admission_middleware, GatewayState};
use crate::routing::RouteTable;
use crate::security::admission::AdmissionControl;

/// The admission gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    pub fn new(
        config: GatewayConfig,
        control: Arc<AdmissionControl>,
        routes: Arc<RouteTable>,
    ) -> Result<Self, ValidationError> {
        let upstream = Upstream::new(&config.upstream.address)
            .map_err(|_| ValidationError::InvalidUpstream(config.upstream.address.clone()))?;

        let state = GatewayState { control, routes };
        let router = Self::build_router(&config, state, upstream);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: GatewayState, upstream: Upstream) -> Router {
        Router::new()
            .fallback(forward_handler)
            .with_state(upstream)
            .layer(middleware::from_fn_with_state(state, route_admission_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "Admission gateway starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
