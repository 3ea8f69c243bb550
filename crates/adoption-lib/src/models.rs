//! Core data models for the adoption pipeline

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Model name reported when no trained model could answer
pub const FALLBACK_MODEL: &str = "fallback";

/// Animal attributes consumed by the pipeline
///
/// Owned by the external record store. Fields arrive loosely typed (free-form
/// age text, flags as strings or booleans, numbers that may be quoted) and are
/// normalized by the feature extractor, never here, so one bad value fails
/// extraction for its record instead of deserialization of the whole export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub species: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub weight: Value,
    #[serde(default)]
    pub vaccinated: Value,
    #[serde(default)]
    pub adoption_fee: Value,
    #[serde(default)]
    pub days_in_care: Value,
    #[serde(default)]
    pub prior_owner: Value,
    /// 0 = none, 1 = mild, 2 = moderate, 3 = severe
    #[serde(default)]
    pub health_severity: Value,
}

/// Behavior assessment for one animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorProfile {
    #[serde(default)]
    pub energy_level: String,
    #[serde(default)]
    pub training_level: String,
    #[serde(default)]
    pub good_with_children: bool,
    #[serde(default)]
    pub good_with_dogs: bool,
    #[serde(default)]
    pub good_with_cats: bool,
    #[serde(default)]
    pub special_needs: bool,
}

/// Recorded result of a past adoption application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdoptionOutcome {
    Approved,
    Rejected,
    Pending,
}

/// One entry of the external record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelterRecord {
    pub animal: AnimalRecord,
    #[serde(default)]
    pub behavior: Option<BehaviorProfile>,
    #[serde(default)]
    pub outcome: Option<AdoptionOutcome>,
    /// Externally supplied likelihood flag, used when no outcome is recorded
    #[serde(default)]
    pub likely_adoptable: Option<bool>,
}

impl ShelterRecord {
    /// Binary training label: 1 = adopted, 0 = not adopted
    pub fn label(&self) -> Option<u8> {
        match self.outcome {
            Some(AdoptionOutcome::Approved) => Some(1),
            Some(AdoptionOutcome::Rejected) => Some(0),
            Some(AdoptionOutcome::Pending) | None => self.likely_adoptable.map(u8::from),
        }
    }

    pub fn to_labeled(&self) -> Option<LabeledExample> {
        self.label().map(|label| LabeledExample {
            animal: self.animal.clone(),
            behavior: self.behavior.clone(),
            label,
        })
    }
}

/// Animal plus its known outcome, the input of the trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub animal: AnimalRecord,
    pub behavior: Option<BehaviorProfile>,
    pub label: u8,
}

/// Request body for a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub animal: AnimalRecord,
    #[serde(default)]
    pub behavior: Option<BehaviorProfile>,
}

/// Confidence tier attached to a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::Low => "low",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adoption-likelihood answer for one animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub probability: f64,
    pub class: u8,
    pub confidence: ConfidenceTier,
    /// `name@version` of the model, or [`FALLBACK_MODEL`]
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl PredictionResult {
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            probability: 0.5,
            class: 0,
            confidence: ConfidenceTier::Low,
            model: FALLBACK_MODEL.to_string(),
            fallback_reason: Some(reason.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.model == FALLBACK_MODEL
    }
}
