//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the store, limiter, profiles and route table from configuration
//! - Start background tasks (store sweeper, metrics exporter)
//! - Bind the listener last, so traffic only arrives once everything is ready
//!
//! Any startup error is fatal.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::schema::GatewayConfig;
use crate::config::validation::ValidationError;
use crate::config::{ConfigError, SecuritySettings};
use crate::http::GatewayServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_shutdown_signal;
use crate::observability::metrics;
use crate::routing::RouteTable;
use crate::security::admission::AdmissionControl;
use crate::security::clock::Clock;
use crate::security::profile::build_profiles;
use crate::security::rate_limit::RateLimiter;
use crate::security::store::{InMemoryStore, RateLimitStore};
use crate::security::sweeper::StoreSweeper;

/// Everything the gateway needs, wired together but not yet serving.
pub struct Gateway {
    pub server: GatewayServer,
    pub control: Arc<AdmissionControl>,
    pub store: Arc<dyn RateLimitStore>,
}

/// Wire the gateway from configuration. The clock is injected so tests can
/// drive rate-limit windows by hand.
pub fn assemble(
    config: GatewayConfig,
    settings: SecuritySettings,
    clock: Arc<dyn Clock>,
) -> Result<Gateway, ConfigError> {
    let store: Arc<dyn RateLimitStore> = Arc::new(InMemoryStore::new(clock.clone()));
    let limiter = RateLimiter::new(store.clone(), clock);

    let profiles = build_profiles(&config)?;
    tracing::debug!(
        profiles = ?profiles.keys().collect::<Vec<_>>(),
        "Security profiles loaded"
    );

    let control = Arc::new(AdmissionControl::new(Arc::new(settings), limiter, profiles));
    let routes = Arc::new(RouteTable::from_config(
        &config.routes,
        config.default_profile.as_deref(),
        &control,
    )?);
    tracing::info!(routes = routes.routes().len(), "Route table compiled");

    let server = GatewayServer::new(config, control.clone(), routes)
        .map_err(|e: ValidationError| ConfigError::Validation(vec![e]))?;

    Ok(Gateway {
        server,
        control,
        store,
    })
}

/// Run the gateway until SIGINT/SIGTERM, then drain and exit.
pub async fn run(
    config: GatewayConfig,
    settings: SecuritySettings,
    clock: Arc<dyn Clock>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bind_address = config.listener.bind_address.clone();
    let sweep_interval = Duration::from_secs(config.rate_limit.sweep_interval_secs);
    let observability = config.observability.clone();

    let gateway = assemble(config, settings, clock)?;
    let shutdown = Shutdown::new();

    if observability.metrics_enabled {
        match observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let sweeper = StoreSweeper::new(gateway.store.clone(), sweep_interval);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.subscribe()));

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let mut server_handle = tokio::spawn(gateway.server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_handle => {
            // Server exited on its own; stop the sweeper and report.
            shutdown.trigger();
            let _ = sweeper_handle.await;
            result??;
            return Ok(());
        }
        _ = wait_for_shutdown_signal() => {
            tracing::info!("Initiating graceful shutdown");
        }
    }

    shutdown.trigger();
    server_handle.await??;
    let _ = sweeper_handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
