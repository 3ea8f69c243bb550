//! Adoption-likelihood serving

mod service;


pub use service::{ModelInfo, PredictionService, PredictionStats, MAX_PREDICTION_MS};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Probability at or above which the class is 1
    pub decision_threshold: f64,
    /// Models validated below this accuracy answer with medium confidence
    pub min_high_confidence_accuracy: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            decision_threshold: 0.5,
            min_high_confidence_accuracy: 0.0,
        }
    }
}
