//! VoloConnect server wiring: configuration and startup helpers for the
//! `voloconnect-server` binary.

pub mod config;

pub use config::Config;

use metrics_exporter_prometheus::PrometheusBuilder;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use voloconnect_postgres::PostgresLedger;

/// Install the Prometheus recorder with its own HTTP listener.
///
/// Metric descriptions are registered afterwards so they reach the recorder.
/// A bad address or a second install is logged and skipped; the API keeps
/// serving without metrics.
pub fn init_metrics(config: &Config) {
    let Some(addr) = config.server.metrics_address() else {
        tracing::warn!(
            host = %config.server.metrics_host,
            port = config.server.metrics_port,
            "Invalid metrics address, Prometheus exporter disabled"
        );
        return;
    };

    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            voloconnect_core::metrics::register_business_metrics();
            tracing::info!(address = %addr, "Prometheus exporter listening");
        }
        Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus exporter"),
    }
}

/// Connect to `PostgreSQL` and apply migrations when configured.
///
/// # Errors
///
/// Returns the ledger error when the pool cannot connect or a migration fails.
pub async fn connect_ledger(config: &Config) -> voloconnect_core::Result<PostgresLedger> {
    tracing::info!(database = %config.postgres.redacted_url(), "Connecting to database");
    let ledger =
        PostgresLedger::connect(&config.postgres.url, &config.postgres.pool_settings()).await?;

    if config.postgres.run_migrations {
        tracing::info!("Running database migrations");
        ledger.migrate().await?;
    }
    Ok(ledger)
}

/// CORS policy for browser clients.
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600))
}
