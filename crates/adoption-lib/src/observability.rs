//! Observability for the adoption pipeline
//!
//! Provides:
//! - Prometheus metrics (prediction latency, fallbacks, training runs, model info)
//! - Structured logging of pipeline events with tracing

use crate::models::PredictionResult;
use crate::training::TrainingReport;
use prometheus::{
    register_gauge, register_gauge_vec, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge, Gauge, GaugeVec, Histogram, IntCounter,
    IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0,
];

static GLOBAL_METRICS: OnceLock<PipelineMetricsInner> = OnceLock::new();

struct PipelineMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions: IntCounter,
    prediction_fallbacks: IntCounter,
    prediction_errors: IntCounter,
    training_runs: IntCounterVec,
    model_validation_accuracy: Gauge,
    model_info: GaugeVec,
    cluster_count: IntGauge,
    health_check_latency_seconds: Histogram,
    health_status: IntGauge,
}

impl PipelineMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "shelter_adoption_prediction_latency_seconds",
                "Time spent extracting features and scoring one animal",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions: register_int_counter!(
                "shelter_adoption_predictions_total",
                "Predictions answered, including fallbacks"
            )
            .expect("Failed to register predictions_total"),

            prediction_fallbacks: register_int_counter!(
                "shelter_adoption_prediction_fallbacks_total",
                "Predictions answered by the fallback"
            )
            .expect("Failed to register prediction_fallbacks_total"),

            prediction_errors: register_int_counter!(
                "shelter_adoption_prediction_errors_total",
                "Feature extraction or inference failures"
            )
            .expect("Failed to register prediction_errors_total"),

            training_runs: register_int_counter_vec!(
                "shelter_adoption_training_runs_total",
                "Training runs by result",
                &["result"]
            )
            .expect("Failed to register training_runs_total"),

            model_validation_accuracy: register_gauge!(
                "shelter_adoption_model_validation_accuracy",
                "Validation accuracy of the loaded adoption model"
            )
            .expect("Failed to register model_validation_accuracy"),

            model_info: register_gauge_vec!(
                "shelter_adoption_model_info",
                "Currently loaded adoption model",
                &["name", "version"]
            )
            .expect("Failed to register model_info"),

            cluster_count: register_int_gauge!(
                "shelter_adoption_behavior_clusters",
                "Number of behavior clusters in the latest cluster model"
            )
            .expect("Failed to register behavior_clusters"),

            health_check_latency_seconds: register_histogram!(
                "shelter_adoption_health_check_latency_seconds",
                "End-to-end latency of the load and predict diagnostic",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register health_check_latency_seconds"),

            health_status: register_int_gauge!(
                "shelter_adoption_health_status",
                "Last diagnostic result: 2 healthy, 1 degraded, 0 unhealthy"
            )
            .expect("Failed to register health_status"),
        }
    }
}

/// Handle to the process-wide pipeline metrics
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct PipelineMetrics {
    _private: (),
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PipelineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PipelineMetrics")
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PipelineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PipelineMetricsInner {
        GLOBAL_METRICS.get_or_init(PipelineMetricsInner::new)
    }

    /// Record one answered prediction and its latency
    pub fn observe_prediction(&self, duration_secs: f64, fallback: bool) {
        let inner = self.inner();
        inner.prediction_latency_seconds.observe(duration_secs);
        inner.predictions.inc();
        if fallback {
            inner.prediction_fallbacks.inc();
        }
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    pub fn inc_training_runs(&self, success: bool) {
        let result = if success { "success" } else { "failure" };
        self.inner().training_runs.with_label_values(&[result]).inc();
    }

    /// Publish the loaded model, replacing any previous one
    pub fn set_model(&self, name: &str, version: &str, validation_accuracy: f64) {
        let inner = self.inner();
        inner.model_info.reset();
        inner.model_info.with_label_values(&[name, version]).set(1.0);
        inner.model_validation_accuracy.set(validation_accuracy);
    }

    pub fn clear_model(&self) {
        self.inner().model_info.reset();
        self.inner().model_validation_accuracy.set(0.0);
    }

    pub fn set_cluster_count(&self, k: usize) {
        self.inner().cluster_count.set(k as i64);
    }

    pub fn observe_health_check(&self, duration_secs: f64, status_code: i64) {
        self.inner().health_check_latency_seconds.observe(duration_secs);
        self.inner().health_status.set(status_code);
    }
}

/// Structured logger for pipeline events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_prediction(&self, record_id: &str, result: &PredictionResult) {
        if let Some(reason) = &result.fallback_reason {
            warn!(
                event = "prediction_fallback",
                instance = %self.instance,
                record_id = %record_id,
                reason = %reason,
                "Answered with fallback prediction"
            );
        } else {
            info!(
                event = "prediction_generated",
                instance = %self.instance,
                record_id = %record_id,
                probability = result.probability,
                class = result.class,
                confidence = %result.confidence,
                model = %result.model,
                "Generated adoption prediction"
            );
        }
    }

    pub fn log_training(&self, report: &TrainingReport, artifact: &str) {
        info!(
            event = "training_completed",
            instance = %self.instance,
            model_version = %report.model_version,
            chosen_model = %report.chosen_model,
            examples = report.total_examples,
            skipped = report.skipped_records,
            features = report.selected_features.len(),
            validation_accuracy = report.validation_accuracy,
            test_accuracy = report.test_accuracy,
            artifact = %artifact,
            "Adoption model trained"
        );
        if report.overfitting_warning {
            warn!(
                event = "overfitting_detected",
                instance = %self.instance,
                model_version = %report.model_version,
                overfitting_gap = report.overfitting_gap,
                "Train/validation gap above threshold"
            );
        }
    }

    pub fn log_training_failed(&self, reason: &str) {
        warn!(
            event = "training_failed",
            instance = %self.instance,
            reason = %reason,
            "Training did not produce a model, existing artifact kept"
        );
    }

    pub fn log_model_loaded(&self, model: &str, features: usize, validation_accuracy: f64) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            model = %model,
            features = features,
            validation_accuracy = validation_accuracy,
            "Adoption model loaded"
        );
    }

    pub fn log_model_rejected(&self, model: &str, reason: &str) {
        error!(
            event = "model_rejected",
            instance = %self.instance,
            model = %model,
            reason = %reason,
            "Stored model is incompatible, serving fallback predictions"
        );
    }

    pub fn log_clustering(&self, profiles: usize, k: usize, silhouette: f64) {
        info!(
            event = "clustering_completed",
            instance = %self.instance,
            profiles = profiles,
            k = k,
            silhouette = silhouette,
            "Behavior profiles clustered"
        );
    }

    pub fn log_health_check(&self, status: &str, passed: bool, latency_ms: f64, detail: &str) {
        if passed {
            info!(
                event = "health_check",
                instance = %self.instance,
                status = %status,
                latency_ms = latency_ms,
                "Diagnostics passed"
            );
        } else {
            warn!(
                event = "health_check",
                instance = %self.instance,
                status = %status,
                latency_ms = latency_ms,
                detail = %detail,
                "Diagnostics did not pass"
            );
        }
    }

    pub fn log_startup(&self, version: &str, model: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            model = %model,
            "Adoption service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Adoption service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_metrics_creation() {
        // collectors live in the global registry, so every handle shares them
        let metrics = PipelineMetrics::new();
        metrics.observe_prediction(0.0002, false);
        metrics.observe_prediction(0.0001, true);
        metrics.inc_prediction_errors();
        metrics.inc_training_runs(true);
        metrics.set_model("random_forest", "v20260101000000", 0.85);
        metrics.set_cluster_count(3);
        metrics.observe_health_check(0.003, 2);

        let names: Vec<String> = prometheus::gather().iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.iter().any(|n| n == "shelter_adoption_predictions_total"));
        assert!(names.iter().any(|n| n == "shelter_adoption_model_info"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance, "test-instance");
        logger.log_prediction("a1", &PredictionResult::fallback("no model"));
    }
}
