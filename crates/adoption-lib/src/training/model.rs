//! Trained adoption model: classifier plus everything needed to feed it

use super::classifier::Classifier;
use super::engineering::{expand_row, FeatureTerm};
use crate::error::{PipelineError, Result};
use crate::features::{FeatureSchema, FeatureVector};
use crate::preprocessing::StandardScaler;
use serde::{Deserialize, Serialize};

/// Fitted model with its feature layout, scaler and metadata
///
/// Immutable once persisted; a later training run produces a new model
/// rather than modifying this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub name: String,
    pub version: String,
    pub schema: FeatureSchema,
    pub terms: Vec<FeatureTerm>,
    pub scaler: StandardScaler,
    pub classifier: Classifier,
    pub validation_accuracy: f64,
    pub test_accuracy: f64,
    pub trained_at: i64,
}

impl TrainedModel {
    /// `name@version`, reported in prediction results
    pub fn identifier(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    pub fn feature_count(&self) -> usize {
        self.terms.len()
    }

    /// Names of the model inputs in order
    pub fn feature_names(&self) -> Vec<String> {
        let base = self.schema.names();
        self.terms.iter().map(|t| t.name(&base)).collect()
    }

    /// Probability of adoption for a base feature vector
    pub fn predict_proba(&self, features: &FeatureVector) -> Result<f64> {
        features.conforms_to(&self.schema)?;
        let expanded = expand_row(features.as_slice(), &self.terms);
        let scaled = self.scaler.transform_row(&expanded)?;
        let probability = self.classifier.predict_proba_row(&scaled);
        if !probability.is_finite() {
            return Err(PipelineError::InvalidInput(format!(
                "model {} produced non-finite probability",
                self.identifier()
            )));
        }
        Ok(probability.clamp(0.0, 1.0))
    }

    /// Internal consistency check, used after loading from disk
    pub fn validate(&self) -> Result<()> {
        let n = self.terms.len();
        if n == 0 {
            return Err(PipelineError::Artifact("model has no feature terms".into()));
        }
        if self.terms.iter().any(|t| t.max_index() >= self.schema.len()) {
            return Err(PipelineError::Artifact(
                "feature term refers outside the schema".into(),
            ));
        }
        if self.scaler.n_features() != n || self.scaler.scales.len() != n {
            return Err(PipelineError::Artifact(format!(
                "scaler has {} features, model expects {}",
                self.scaler.n_features(),
                n
            )));
        }
        if self.classifier.n_features() != n || !self.classifier.is_consistent() {
            return Err(PipelineError::Artifact(format!(
                "classifier expects {} features, model provides {}",
                self.classifier.n_features(),
                n
            )));
        }
        Ok(())
    }
}
