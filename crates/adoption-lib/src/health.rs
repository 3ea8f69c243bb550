//! Health checks for the adoption service
//!
//! Provides component health tracking for liveness and readiness probes,
//! and an end-to-end diagnostic that loads the stored model and scores a
//! sample record the same way a real request would.

use crate::config::HealthConfig;
use crate::models::PredictionResult;
use crate::observability::PipelineMetrics;
use crate::prediction::{PredictionConfig, PredictionService};
use crate::records::RecordStore;
use crate::store::ModelStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Status of one component, or of the service as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Component is answering, but not as intended
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Healthy => "healthy",
            ComponentStatus::Degraded => "degraded",
            ComponentStatus::Unhealthy => "unhealthy",
        }
    }

    /// Gauge value exported to Prometheus
    pub fn code(&self) -> i64 {
        match self {
            ComponentStatus::Healthy => 2,
            ComponentStatus::Degraded => 1,
            ComponentStatus::Unhealthy => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across components, healthy when there are none
    pub fn compute_status<'a>(components: impl IntoIterator<Item = &'a ComponentHealth>) -> ComponentStatus {
        components
            .into_iter()
            .map(|c| c.status)
            .max_by_key(|s| 2 - s.code())
            .unwrap_or(ComponentStatus::Healthy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Names under which the service registers its components
pub mod components {
    pub const MODEL_STORE: &str = "model_store";
    pub const PREDICTOR: &str = "predictor";
    pub const RECORD_STORE: &str = "record_store";

    pub const ALL: [&str; 3] = [MODEL_STORE, PREDICTOR, RECORD_STORE];
}

/// Result of one end-to-end diagnostic run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    /// True only when the stored model answered validly within budget
    pub passed: bool,
    pub status: ComponentStatus,
    pub latency_ms: f64,
    /// Model that answered, or the fallback marker
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub components: BTreeMap<String, ComponentHealth>,
    pub checked_at: i64,
}

/// Runs load then predict against a sample record
pub struct DiagnosticsReporter {
    store: ModelStore,
    records: Arc<dyn RecordStore>,
    prediction: PredictionConfig,
    health: HealthConfig,
    metrics: Option<PipelineMetrics>,
}

impl DiagnosticsReporter {
    pub fn new(
        store: ModelStore,
        records: Arc<dyn RecordStore>,
        prediction: PredictionConfig,
        health: HealthConfig,
    ) -> Self {
        Self {
            store,
            records,
            prediction,
            health,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Exercise the whole serving path once
    ///
    /// A fresh [`PredictionService`] is built for every run so the check
    /// also covers artifact loading.
    pub fn run_check(&self) -> DiagnosticsReport {
        let start = Instant::now();
        let mut components = BTreeMap::new();

        let sample = match self.records.sample() {
            Ok(Some(record)) => {
                components.insert(components::RECORD_STORE.to_string(), ComponentHealth::healthy());
                record
            }
            Ok(None) => {
                return self.unhealthy(components, start, components::RECORD_STORE, "record store is empty")
            }
            Err(e) => {
                return self.unhealthy(
                    components,
                    start,
                    components::RECORD_STORE,
                    format!("record store unavailable: {}", e),
                )
            }
        };

        let service = PredictionService::new(&self.store, self.prediction.clone());
        let model_health = match service.unavailable_reason() {
            None => ComponentHealth::healthy(),
            Some(reason) => ComponentHealth::degraded(format!("serving fallback: {}", reason)),
        };
        components.insert(components::MODEL_STORE.to_string(), model_health);

        let outcome = service.try_predict(&sample.animal, sample.behavior.as_ref());
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let (predictor_health, prediction) = match outcome {
            Err(e) => (ComponentHealth::unhealthy(format!("prediction failed: {}", e)), None),
            Ok(p) if !p.probability.is_finite() || !(0.0..=1.0).contains(&p.probability) => (
                ComponentHealth::unhealthy(format!("invalid probability {}", p.probability)),
                Some(p),
            ),
            Ok(p) if latency_ms > self.health.max_latency_ms => (
                ComponentHealth::degraded(format!(
                    "latency {:.2}ms over {:.0}ms budget",
                    latency_ms, self.health.max_latency_ms
                )),
                Some(p),
            ),
            Ok(p) => (ComponentHealth::healthy(), Some(p)),
        };
        components.insert(components::PREDICTOR.to_string(), predictor_health);

        let status = HealthResponse::compute_status(components.values());
        let detail = components
            .values()
            .find_map(|c| c.message.clone());
        let report = DiagnosticsReport {
            passed: status == ComponentStatus::Healthy,
            status,
            latency_ms,
            model: service.model_identifier(),
            record_id: Some(sample.animal.id.clone()),
            prediction,
            detail,
            components,
            checked_at: chrono::Utc::now().timestamp(),
        };
        self.observe(&report);
        report
    }

    fn unhealthy(
        &self,
        mut components: BTreeMap<String, ComponentHealth>,
        start: Instant,
        component: &str,
        message: impl Into<String>,
    ) -> DiagnosticsReport {
        let message = message.into();
        components.insert(component.to_string(), ComponentHealth::unhealthy(message.clone()));
        let report = DiagnosticsReport {
            passed: false,
            status: ComponentStatus::Unhealthy,
            latency_ms: start.elapsed().as_secs_f64() * 1000.0,
            model: crate::models::FALLBACK_MODEL.to_string(),
            record_id: None,
            prediction: None,
            detail: Some(message),
            components,
            checked_at: chrono::Utc::now().timestamp(),
        };
        self.observe(&report);
        report
    }

    fn observe(&self, report: &DiagnosticsReport) {
        if let Some(metrics) = &self.metrics {
            metrics.observe_health_check(report.latency_ms / 1000.0, report.status.code());
        }
    }
}

/// Shared component health, updated by the diagnostics loop
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<BTreeMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(BTreeMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Components start healthy until a diagnostic says otherwise
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Copy every component status from a diagnostic run
    pub async fn record_diagnostics(&self, report: &DiagnosticsReport) {
        let mut components = self.components.write().await;
        for (name, health) in &report.components {
            components.insert(name.clone(), health.clone());
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let snapshot = self.components.read().await.clone();
        HealthResponse {
            status: HealthResponse::compute_status(snapshot.values()),
            components: snapshot,
        }
    }

    /// Ready once the first diagnostic ran, and while nothing is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let reason = if !*self.ready.read().await {
            Some("first diagnostic has not run yet")
        } else if self.health().await.status == ComponentStatus::Unhealthy {
            Some("a component is unhealthy")
        } else {
            None
        };
        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::InMemoryRecordStore;
    use crate::testing::{labeled, shelter_records};
    use crate::training::{Trainer, TrainingConfig};
    use tempfile::TempDir;

    fn reporter(dir: &TempDir, records: Vec<crate::models::ShelterRecord>) -> DiagnosticsReporter {
        DiagnosticsReporter::new(
            ModelStore::new(dir.path()).unwrap(),
            Arc::new(InMemoryRecordStore::new(records)),
            PredictionConfig::default(),
            HealthConfig::default(),
        )
    }

    #[test]
    fn test_check_passes_with_trained_model() {
        let dir = TempDir::new().unwrap();
        let model = Trainer::new(TrainingConfig::default())
            .train(&labeled(10, 10))
            .unwrap()
            .model;
        ModelStore::new(dir.path()).unwrap().save_model(&model).unwrap();

        let report = reporter(&dir, shelter_records(1, 1)).run_check();
        assert!(report.passed, "{:?}", report.detail);
        assert_eq!(report.status, ComponentStatus::Healthy);
        assert_eq!(report.model, model.identifier());
        assert!(report.latency_ms >= 0.0);
        let probability = report.prediction.unwrap().probability;
        assert!((0.0..=1.0).contains(&probability));
    }

    #[test]
    fn test_fallback_mode_is_degraded() {
        let dir = TempDir::new().unwrap();
        let report = reporter(&dir, shelter_records(1, 0)).run_check();
        assert!(!report.passed);
        assert_eq!(report.status, ComponentStatus::Degraded);
        assert_eq!(report.model, crate::models::FALLBACK_MODEL);
        assert_eq!(
            report.components[components::MODEL_STORE].status,
            ComponentStatus::Degraded
        );
    }

    #[test]
    fn test_empty_record_store_is_unhealthy() {
        let dir = TempDir::new().unwrap();
        let report = reporter(&dir, Vec::new()).run_check();
        assert!(!report.passed);
        assert_eq!(report.status, ComponentStatus::Unhealthy);
        assert_eq!(report.detail.as_deref(), Some("record store is empty"));
    }

    #[test]
    fn test_worst_component_wins() {
        let none: Vec<ComponentHealth> = Vec::new();
        assert_eq!(HealthResponse::compute_status(&none), ComponentStatus::Healthy);

        let mixed = [
            ComponentHealth::healthy(),
            ComponentHealth::degraded("slow"),
            ComponentHealth::healthy(),
        ];
        assert_eq!(HealthResponse::compute_status(&mixed), ComponentStatus::Degraded);

        let failing = [ComponentHealth::degraded("slow"), ComponentHealth::unhealthy("down")];
        assert_eq!(HealthResponse::compute_status(&failing), ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_registry_reports_degraded_component() {
        let registry = HealthRegistry::new();
        for name in components::ALL {
            registry.register(name).await;
        }
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);

        registry.set_degraded(components::MODEL_STORE, "serving fallback").await;
        let snapshot = registry.health().await;
        assert_eq!(snapshot.status, ComponentStatus::Degraded);
        assert_eq!(snapshot.components.len(), 3);
    }

    #[tokio::test]
    async fn test_readiness_follows_diagnostics() {
        let registry = HealthRegistry::new();
        assert!(!registry.readiness().await.ready);

        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);

        let dir = TempDir::new().unwrap();
        let report = reporter(&dir, Vec::new()).run_check();
        registry.record_diagnostics(&report).await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            registry.health().await.components[components::RECORD_STORE].status,
            ComponentStatus::Unhealthy
        );
    }
}
