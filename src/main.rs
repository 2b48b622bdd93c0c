//! Admission gateway
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │               ADMISSION GATEWAY              │
//!     Client Request     │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!     ───────────────────┼─▶│  http   │──▶│ routing  │──▶│  profile  │  │
//!                        │  │ server  │   │  table   │   │   gates   │  │
//!                        │  └─────────┘   └──────────┘   └─────┬─────┘  │
//!                        │                      rejected ◀─────┤        │
//!     Client Response    │  ┌─────────┐                  ┌─────▼─────┐  │
//!     ◀──────────────────┼──│ headers │◀─────────────────│  forward  │◀─┼── Upstream
//!                        │  │  merged │                  │           │  │   App
//!                        │  └─────────┘                  └───────────┘  │
//!                        └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use admission_gateway::config::validation::validate_settings;
use admission_gateway::config::{load_config, GatewayConfig, SecuritySettings};
use admission_gateway::lifecycle::startup;
use admission_gateway::observability::logging::init_tracing;
use admission_gateway::security::clock::SystemClock;

#[derive(Parser)]
#[command(name = "admission-gateway")]
#[command(about = "Request admission gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal outside development.
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    init_tracing(&config.observability);
    tracing::info!("admission-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    let settings = SecuritySettings::from_env();
    if let Err(errors) = validate_settings(&settings) {
        for error in &errors {
            tracing::error!(error = %error, "Invalid security setting");
        }
        return Err(format!("{} invalid security setting(s)", errors.len()).into());
    }

    if settings.public_api_key.is_none() {
        tracing::warn!("PUBLIC_API_KEY is not set; API-key gates only check presence");
    }
    if settings.internal_secret.is_none() {
        tracing::warn!("INTERNAL_API_SECRET is not set; internal routes will answer 500");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        environment = ?settings.environment,
        allowed_origins = settings.allowed_origins.len(),
        routes = config.routes.len(),
        "Configuration loaded"
    );

    startup::run(config, settings, Arc::new(SystemClock)).await
}
