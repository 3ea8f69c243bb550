//! HTTP API: health probes, Prometheus metrics, diagnostics and prediction

use adoption_lib::{
    health::{components, ComponentStatus, DiagnosticsReport, DiagnosticsReporter, HealthRegistry},
    observability::{PipelineMetrics, StructuredLogger},
    prediction::{PredictionConfig, PredictionService},
    store::{ArtifactKind, ModelStore},
    ModelInfo, PredictionRequest, PredictionResult,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: PipelineMetrics,
    pub logger: StructuredLogger,
    store: ModelStore,
    prediction_config: PredictionConfig,
    predictor: RwLock<Arc<PredictionService>>,
    reporter: Arc<DiagnosticsReporter>,
}

impl AppState {
    /// Build the state, loading the stored model once
    pub fn new(
        store: ModelStore,
        prediction_config: PredictionConfig,
        reporter: DiagnosticsReporter,
        health_registry: HealthRegistry,
        metrics: PipelineMetrics,
        logger: StructuredLogger,
    ) -> Self {
        let predictor = Self::load_predictor(&store, &prediction_config, &metrics, &logger);
        Self {
            health_registry,
            metrics,
            logger,
            store,
            prediction_config,
            predictor: RwLock::new(Arc::new(predictor)),
            reporter: Arc::new(reporter),
        }
    }

    fn load_predictor(
        store: &ModelStore,
        config: &PredictionConfig,
        metrics: &PipelineMetrics,
        logger: &StructuredLogger,
    ) -> PredictionService {
        let service = PredictionService::new(store, config.clone()).with_metrics(metrics.clone());
        match (service.model(), service.unavailable_reason()) {
            (Some(model), _) => {
                logger.log_model_loaded(&model.identifier(), model.feature_count(), model.validation_accuracy)
            }
            (None, Some(reason)) if store.has_model() => {
                let path = store.path_for(ArtifactKind::AdoptionModel);
                logger.log_model_rejected(&path.display().to_string(), reason)
            }
            _ => {}
        }
        service
    }

    pub async fn predictor(&self) -> Arc<PredictionService> {
        self.predictor.read().await.clone()
    }

    /// Replace the served model with whatever the store holds now
    pub async fn reload(&self) -> Arc<PredictionService> {
        let store = self.store.clone();
        let config = self.prediction_config.clone();
        let metrics = self.metrics.clone();
        let logger = self.logger.clone();
        let loaded = tokio::task::spawn_blocking(move || Self::load_predictor(&store, &config, &metrics, &logger)).await;
        let service = match loaded {
            Ok(service) => Arc::new(service),
            Err(e) => {
                error!(error = %e, "Model reload task failed, keeping current model");
                return self.predictor().await;
            }
        };
        *self.predictor.write().await = service.clone();
        service
    }

    /// Run one end-to-end diagnostic and publish it to the registry
    pub async fn run_diagnostics(&self) -> DiagnosticsReport {
        let reporter = self.reporter.clone();
        let report = match tokio::task::spawn_blocking(move || reporter.run_check()).await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Diagnostics task failed");
                self.health_registry
                    .set_unhealthy(components::PREDICTOR, format!("diagnostics task failed: {}", e))
                    .await;
                return DiagnosticsReport {
                    passed: false,
                    status: ComponentStatus::Unhealthy,
                    latency_ms: 0.0,
                    model: adoption_lib::FALLBACK_MODEL.to_string(),
                    record_id: None,
                    prediction: None,
                    detail: Some(e.to_string()),
                    components: Default::default(),
                    checked_at: chrono::Utc::now().timestamp(),
                };
            }
        };
        self.health_registry.record_diagnostics(&report).await;
        self.logger.log_health_check(
            report.status.as_str(),
            report.passed,
            report.latency_ms,
            report.detail.as_deref().unwrap_or(""),
        );
        report
    }
}

fn status_code(status: ComponentStatus) -> StatusCode {
    match status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Health check response - 200 while operational, 503 when unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    (status_code(health.status), Json(health))
}

/// Readiness check response - 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Run the load and predict diagnostic now
async fn diagnostics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.run_diagnostics().await;
    (status_code(report.status), Json(report))
}

/// Score one animal; always answers, falling back when needed
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictionRequest>,
) -> Json<PredictionResult> {
    let service = state.predictor().await;
    let result = service.predict_request(&request);
    state.logger.log_prediction(&request.animal.id, &result);
    Json(result)
}

async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    Json(state.predictor().await.describe())
}

/// Pick up a model written by an offline training run
async fn reload_model(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    let service = state.reload().await;
    info!(model = %service.model_identifier(), "Model reloaded");
    Json(service.describe())
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/diagnostics", get(diagnostics))
        .route("/predict", post(predict))
        .route("/model", get(model_info))
        .route("/model/reload", post(reload_model))
        .with_state(state)
}

/// Start the API server
pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
