//! Infrastructure dashboard server
//!
//! Loads inventory and rollups into the in-memory store and serves the
//! dashboard payloads over HTTP.

use anyhow::Result;
use dashboard_lib::{
    health::HealthRegistry,
    observability::{DashboardMetrics, StructuredLogger},
    store::{names, InMemoryStore, StoreFixture, Stores},
};
use infra_dashboard::{api, config};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DASHBOARD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = config::DashboardConfig::load()?;
    info!(
        instance = %config.instance_name,
        fixture = %config.fixture_path.display(),
        pinned_now = ?config.pinned_now,
        "Dashboard configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register_stores().await;

    let store = match InMemoryStore::load(&config.fixture_path).await {
        Ok(store) => store,
        Err(err) => {
            warn!(
                path = %config.fixture_path.display(),
                error = %err,
                "Failed to load store fixture, serving an empty store"
            );
            for name in names::ALL {
                health_registry
                    .set_unhealthy(name, format!("fixture not loaded: {}", err))
                    .await;
            }
            InMemoryStore::new(StoreFixture::default())
        }
    };

    let metrics = DashboardMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(DASHBOARD_VERSION, &config.listen_addr());

    let app_state = Arc::new(
        api::AppState::new(
            Stores::from_shared(Arc::new(store)),
            health_registry.clone(),
            metrics,
        )
        .with_pinned_now(config.pinned_now),
    );

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.listen_addr(), app_state));

    tokio::select! {
        result = api_handle => {
            logger.log_shutdown("API server stopped");
            result??;
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
