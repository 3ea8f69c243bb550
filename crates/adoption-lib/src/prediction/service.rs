//! Prediction service: one loaded model, always answers
//!
//! The model is loaded once at construction and never changes for the life
//! of the instance. Without a usable model, or when a record cannot be
//! scored, the service answers with the fallback result instead of failing.

use super::PredictionConfig;
use crate::error::{PipelineError, Result};
use crate::features::FeatureExtractor;
use crate::models::{
    AnimalRecord, BehaviorProfile, ConfidenceTier, PredictionRequest, PredictionResult,
};
use crate::observability::PipelineMetrics;
use crate::store::ModelStore;
use crate::training::TrainedModel;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Latency above which a prediction is counted as slow
pub const MAX_PREDICTION_MS: u128 = 5;

const NO_MODEL: &str = "no trained model available";

/// Counters since the service was built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionStats {
    pub predictions: u64,
    pub fallbacks: u64,
    pub slow_predictions: u64,
}

/// Model currently served, as reported by `GET /model` and `shelterctl model`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model: String,
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_accuracy: Option<f64>,
    /// RFC 3339 training time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<String>,
}

pub struct PredictionService {
    extractor: FeatureExtractor,
    model: Option<Arc<TrainedModel>>,
    /// Why the service runs without a model
    unavailable: Option<String>,
    config: PredictionConfig,
    metrics: Option<PipelineMetrics>,
    predictions: AtomicU64,
    fallbacks: AtomicU64,
    slow_predictions: AtomicU64,
}

impl PredictionService {
    /// Load the adoption model from `store` once
    pub fn new(store: &ModelStore, config: PredictionConfig) -> Self {
        Self::build(store.load_model(), config)
    }

    /// Serve an already trained model
    pub fn with_model(model: TrainedModel, config: PredictionConfig) -> Self {
        Self::build(Some(model), config)
    }

    pub fn without_model(config: PredictionConfig) -> Self {
        Self::build(None, config)
    }

    /// Record latency and outcome counts in the global metrics
    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        match &self.model {
            Some(model) => metrics.set_model(&model.name, &model.version, model.validation_accuracy),
            None => metrics.clear_model(),
        }
        self.metrics = Some(metrics);
        self
    }

    fn build(model: Option<TrainedModel>, config: PredictionConfig) -> Self {
        let extractor = FeatureExtractor::new();
        let (model, unavailable) = match model {
            None => {
                info!("No adoption model loaded, serving fallback predictions");
                (None, Some(NO_MODEL.to_string()))
            }
            Some(model) => match extractor.schema().ensure_compatible(&model.schema) {
                Ok(()) => {
                    info!(
                        model = %model.identifier(),
                        features = model.feature_count(),
                        validation_accuracy = model.validation_accuracy,
                        "Adoption model loaded"
                    );
                    (Some(Arc::new(model)), None)
                }
                Err(e) => {
                    error!(
                        model = %model.identifier(),
                        error = %e,
                        "Model was trained on a different feature schema, serving fallback predictions"
                    );
                    (None, Some(e.to_string()))
                }
            },
        };

        Self {
            extractor,
            model,
            unavailable,
            config,
            metrics: None,
            predictions: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            slow_predictions: AtomicU64::new(0),
        }
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_deref()
    }

    pub fn is_fallback_mode(&self) -> bool {
        self.model.is_none()
    }

    /// Why no model is served, `None` when one is
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }

    /// `name@version` of the served model, or the fallback marker
    pub fn model_identifier(&self) -> String {
        self.model
            .as_ref()
            .map(|m| m.identifier())
            .unwrap_or_else(|| crate::models::FALLBACK_MODEL.to_string())
    }

    pub fn describe(&self) -> ModelInfo {
        let model = self.model();
        ModelInfo {
            model: self.model_identifier(),
            fallback: self.is_fallback_mode(),
            reason: self.unavailable_reason().map(str::to_string),
            features: model.map(|m| m.feature_names()),
            validation_accuracy: model.map(|m| m.validation_accuracy),
            test_accuracy: model.map(|m| m.test_accuracy),
            trained_at: model
                .and_then(|m| chrono::DateTime::from_timestamp(m.trained_at, 0))
                .map(|t| t.to_rfc3339()),
        }
    }

    /// Score one animal, surfacing extraction and inference failures
    ///
    /// Fallback mode is not an error here: without a model the fallback
    /// result is returned as `Ok`.
    pub fn try_predict(
        &self,
        animal: &AnimalRecord,
        behavior: Option<&BehaviorProfile>,
    ) -> Result<PredictionResult> {
        let Some(model) = self.model.as_ref() else {
            return Ok(PredictionResult::fallback(
                self.unavailable.as_deref().unwrap_or(NO_MODEL),
            ));
        };

        let features = self.extractor.extract(animal, behavior)?;
        let probability = model.predict_proba(&features)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(PipelineError::InvalidInput(format!(
                "probability {} outside [0, 1]",
                probability
            )));
        }

        Ok(PredictionResult {
            probability,
            class: u8::from(probability >= self.config.decision_threshold),
            confidence: self.confidence(model),
            model: model.identifier(),
            fallback_reason: None,
        })
    }

    /// Score one animal, never failing
    pub fn predict(&self, animal: &AnimalRecord, behavior: Option<&BehaviorProfile>) -> PredictionResult {
        let start = Instant::now();
        let result = match self.try_predict(animal, behavior) {
            Ok(result) => result,
            Err(e) => {
                warn!(record_id = %animal.id, error = %e, "Prediction failed, using fallback");
                if let Some(metrics) = &self.metrics {
                    metrics.inc_prediction_errors();
                }
                PredictionResult::fallback(e.to_string())
            }
        };
        let elapsed = start.elapsed();

        self.predictions.fetch_add(1, Ordering::Relaxed);
        if result.is_fallback() {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
        }
        if elapsed.as_millis() > MAX_PREDICTION_MS {
            self.slow_predictions.fetch_add(1, Ordering::Relaxed);
            warn!(
                record_id = %animal.id,
                elapsed_ms = elapsed.as_millis(),
                "Prediction exceeded {}ms target",
                MAX_PREDICTION_MS
            );
        } else {
            debug!(record_id = %animal.id, elapsed_us = elapsed.as_micros(), "Prediction completed");
        }
        if let Some(metrics) = &self.metrics {
            metrics.observe_prediction(elapsed.as_secs_f64(), result.is_fallback());
        }
        result
    }

    pub fn predict_request(&self, request: &PredictionRequest) -> PredictionResult {
        self.predict(&request.animal, request.behavior.as_ref())
    }

    pub fn stats(&self) -> PredictionStats {
        PredictionStats {
            predictions: self.predictions.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            slow_predictions: self.slow_predictions.load(Ordering::Relaxed),
        }
    }

    fn confidence(&self, model: &TrainedModel) -> ConfidenceTier {
        if model.validation_accuracy < self.config.min_high_confidence_accuracy {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::High
        }
    }
}
