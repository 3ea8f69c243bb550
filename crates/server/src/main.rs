//! Adoption server - long-running adoption-likelihood service
//!
//! Loads the stored model once, answers predictions over HTTP and
//! periodically runs the end-to-end diagnostic for monitoring.

use adoption_lib::{
    health::{components, DiagnosticsReporter, HealthRegistry},
    observability::{PipelineMetrics, StructuredLogger},
    records::JsonRecordStore,
    store::ModelStore,
    PipelineConfig,
};
use adoption_server::api;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting adoption-server");

    let config_path = std::env::var_os("SHELTER_CONFIG").map(PathBuf::from);
    let config = PipelineConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    info!(
        instance = %config.server.instance,
        model_dir = %config.model_dir.display(),
        records = %config.records_path.display(),
        "Server configured"
    );

    let store = ModelStore::new(&config.model_dir)
        .with_context(|| format!("Failed to open model directory {:?}", config.model_dir))?;
    let records = Arc::new(JsonRecordStore::new(&config.records_path));

    let health_registry = HealthRegistry::new();
    for component in components::ALL {
        health_registry.register(component).await;
    }

    let metrics = PipelineMetrics::new();
    let logger = StructuredLogger::new(&config.server.instance);

    let reporter = DiagnosticsReporter::new(
        store.clone(),
        records,
        config.prediction.clone(),
        config.health.clone(),
    )
    .with_metrics(metrics.clone());

    let state = Arc::new(api::AppState::new(
        store,
        config.prediction.clone(),
        reporter,
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));
    logger.log_startup(SERVICE_VERSION, &state.predictor().await.model_identifier());

    // First diagnostic before reporting ready, so probes see real state
    state.run_diagnostics().await;
    health_registry.set_ready(true).await;

    let diagnostics_state = state.clone();
    let interval = config.health.interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            diagnostics_state.run_diagnostics().await;
        }
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let api_handle = tokio::spawn(api::serve(addr, state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    logger.log_shutdown("API server failed");
                    return Err(e);
                }
                Err(e) => {
                    logger.log_shutdown("API server task panicked");
                    return Err(e.into());
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
