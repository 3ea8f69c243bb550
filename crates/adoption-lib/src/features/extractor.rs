//! Feature extraction for adoption-likelihood inference
//!
//! Turns an animal record and its optional behavior profile into a
//! fixed-length vector laid out by [`FeatureSchema`]. Training and serving
//! both go through this extractor, so the schema is the only place feature
//! order is defined.

use super::encoding::{
    coerce_flag, encode_energy, encode_size, encode_species, encode_training, normalize_age,
};
use super::schema::{FeatureSchema, FeatureVector};
use crate::error::{PipelineError, Result};
use crate::models::{AnimalRecord, BehaviorProfile, LabeledExample};
use serde_json::Value;
use tracing::debug;

/// Weight used when a record has none
pub const DEFAULT_WEIGHT: f64 = 25.0;

/// Adoption fee used when a record has none
pub const DEFAULT_ADOPTION_FEE: f64 = 100.0;

/// Highest valid health severity code
pub const MAX_HEALTH_SEVERITY: f64 = 3.0;

/// Number of behavior features, see [`FeatureExtractor::behavior_features`]
pub const NUM_BEHAVIOR_FEATURES: usize = 6;

/// Extracts schema-ordered features from shelter records
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    schema: FeatureSchema,
    default_weight: f64,
    default_fee: f64,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            schema: FeatureSchema::current(),
            default_weight: DEFAULT_WEIGHT,
            default_fee: DEFAULT_ADOPTION_FEE,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Extract the feature vector for one record
    ///
    /// Missing values fall back to defaults and quoted numbers are accepted.
    /// Only values that cannot be meaningful (non-numeric text, negative or
    /// non-finite numbers, out-of-range severity) fail, as a
    /// [`PipelineError::FeatureExtraction`].
    pub fn extract(
        &self,
        animal: &AnimalRecord,
        behavior: Option<&BehaviorProfile>,
    ) -> Result<FeatureVector> {
        let weight = self.numeric(animal, "weight", &animal.weight, self.default_weight)?;
        let fee = self.numeric(animal, "adoption_fee", &animal.adoption_fee, self.default_fee)?;
        let days = self.numeric(animal, "days_in_care", &animal.days_in_care, 0.0)?;
        let severity = self.health_severity(animal)?;

        let mut values = Vec::with_capacity(self.schema.len());
        values.push(f64::from(encode_species(&animal.species)));
        values.push(f64::from(encode_size(&animal.size)));
        values.push(f64::from(normalize_age(&animal.age).code()));
        values.push(weight);
        values.push(f64::from(coerce_flag(&animal.vaccinated)));
        values.push(fee);
        values.push(days);
        values.push(f64::from(coerce_flag(&animal.prior_owner)));
        values.push(severity);
        values.extend(Self::behavior_features(behavior));

        debug_assert_eq!(values.len(), self.schema.len());

        Ok(FeatureVector {
            schema_version: self.schema.version,
            values,
        })
    }

    /// Behavior part of the vector: energy, training and the four flags
    ///
    /// A missing profile encodes every field as 0, the same as an unknown
    /// category.
    pub fn behavior_features(behavior: Option<&BehaviorProfile>) -> [f64; NUM_BEHAVIOR_FEATURES] {
        match behavior {
            Some(b) => [
                f64::from(encode_energy(&b.energy_level)),
                f64::from(encode_training(&b.training_level)),
                f64::from(u8::from(b.good_with_children)),
                f64::from(u8::from(b.good_with_dogs)),
                f64::from(u8::from(b.good_with_cats)),
                f64::from(u8::from(b.special_needs)),
            ],
            None => [0.0; NUM_BEHAVIOR_FEATURES],
        }
    }

    /// Extract a labeled batch, skipping records that fail extraction
    ///
    /// Returns the usable `(vector, label)` pairs and the number skipped.
    pub fn extract_labeled(&self, examples: &[LabeledExample]) -> (Vec<(FeatureVector, u8)>, usize) {
        let mut rows = Vec::with_capacity(examples.len());
        let mut skipped = 0;
        for example in examples {
            match self.extract(&example.animal, example.behavior.as_ref()) {
                Ok(vector) => rows.push((vector, example.label)),
                Err(e) => {
                    debug!(record_id = %example.animal.id, error = %e, "Skipping record");
                    skipped += 1;
                }
            }
        }
        (rows, skipped)
    }

    fn numeric(&self, animal: &AnimalRecord, field: &str, value: &Value, default: f64) -> Result<f64> {
        let parsed = match value {
            Value::Null => return Ok(default),
            Value::Number(n) => n.as_f64(),
            Value::String(s) if s.trim().is_empty() => return Ok(default),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
            Some(v) => Err(PipelineError::extraction(
                &animal.id,
                format!("{} has invalid value {}", field, v),
            )),
            None => Err(PipelineError::extraction(
                &animal.id,
                format!("{} is not a number: {}", field, value),
            )),
        }
    }

    fn health_severity(&self, animal: &AnimalRecord) -> Result<f64> {
        let severity = self.numeric(animal, "health_severity", &animal.health_severity, 0.0)?;
        if severity > MAX_HEALTH_SEVERITY || severity.fract() != 0.0 {
            return Err(PipelineError::extraction(
                &animal.id,
                format!("health_severity {} is not a code in 0..={}", severity, MAX_HEALTH_SEVERITY),
            ));
        }
        Ok(severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn create_test_animal() -> AnimalRecord {
        AnimalRecord {
            id: "dog-1".to_string(),
            name: "Biscuit".to_string(),
            species: "Dog".to_string(),
            size: "Large".to_string(),
            age: "3 years".to_string(),
            weight: json!(32.5),
            vaccinated: json!("Yes"),
            adoption_fee: json!(150.0),
            days_in_care: json!(40),
            prior_owner: json!(true),
            health_severity: json!(1),
        }
    }

    fn create_test_profile() -> BehaviorProfile {
        BehaviorProfile {
            energy_level: "high".to_string(),
            training_level: "basic".to_string(),
            good_with_children: true,
            good_with_dogs: false,
            good_with_cats: true,
            special_needs: false,
        }
    }

    #[test]
    fn test_extract_full_record() {
        let extractor = FeatureExtractor::new();
        let v = extractor
            .extract(&create_test_animal(), Some(&create_test_profile()))
            .unwrap();
        assert_eq!(
            v.values,
            vec![2.0, 2.0, 2.0, 32.5, 1.0, 150.0, 40.0, 1.0, 1.0, 2.0, 1.0, 1.0, 0.0, 1.0, 0.0]
        );
        assert!(v.conforms_to(extractor.schema()).is_ok());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::new();
        let animal = create_test_animal();
        let profile = create_test_profile();
        let first = extractor.extract(&animal, Some(&profile)).unwrap();
        let second = extractor.extract(&animal, Some(&profile)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_values_use_defaults() {
        let extractor = FeatureExtractor::new();
        let animal = AnimalRecord {
            id: "bare".to_string(),
            name: String::new(),
            species: String::new(),
            size: String::new(),
            age: String::new(),
            weight: Value::Null,
            vaccinated: Value::Null,
            adoption_fee: json!(""),
            days_in_care: Value::Null,
            prior_owner: Value::Null,
            health_severity: Value::Null,
        };
        let v = extractor.extract(&animal, None).unwrap();
        assert_eq!(v.len(), extractor.schema().len());
        assert_eq!(v.values[3], DEFAULT_WEIGHT);
        assert_eq!(v.values[5], DEFAULT_ADOPTION_FEE);
        // unparseable age defaults to Adult
        assert_eq!(v.values[2], 2.0);
        assert!(v.values[9..].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_invalid_values_are_anomalies() {
        let extractor = FeatureExtractor::new();
        let mut animal = create_test_animal();
        animal.weight = json!(-3.0);
        assert!(matches!(
            extractor.extract(&animal, None),
            Err(PipelineError::FeatureExtraction { .. })
        ));

        let mut animal = create_test_animal();
        animal.adoption_fee = json!("NaN");
        assert!(extractor.extract(&animal, None).is_err());

        let mut animal = create_test_animal();
        animal.health_severity = json!(7);
        assert!(extractor.extract(&animal, None).is_err());

        let mut animal = create_test_animal();
        animal.health_severity = json!(1.5);
        assert!(extractor.extract(&animal, None).is_err());
    }

    #[test]
    fn test_quoted_numbers_are_accepted() {
        let extractor = FeatureExtractor::new();
        let mut animal = create_test_animal();
        animal.weight = json!(" 12.5 ");
        animal.days_in_care = json!("40");
        animal.health_severity = json!("1");
        let quoted = extractor.extract(&animal, None).unwrap();

        let mut plain = create_test_animal();
        plain.weight = json!(12.5);
        assert_eq!(quoted, extractor.extract(&plain, None).unwrap());
    }

    #[test]
    fn test_non_numeric_value_is_an_anomaly() {
        let extractor = FeatureExtractor::new();
        for bad in [json!("heavy"), json!(true), json!([12]), json!({"kg": 12})] {
            let mut animal = create_test_animal();
            animal.weight = bad;
            match extractor.extract(&animal, None) {
                Err(PipelineError::FeatureExtraction { reason, .. }) => assert!(reason.contains("weight")),
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[test]
    fn test_labeled_batch_skips_anomalies() {
        let extractor = FeatureExtractor::new();
        let mut bad = create_test_animal();
        bad.weight = json!("inf");
        let examples = vec![
            LabeledExample { animal: create_test_animal(), behavior: None, label: 1 },
            LabeledExample { animal: bad, behavior: None, label: 0 },
        ];
        let (rows, skipped) = extractor.extract_labeled(&examples);
        assert_eq!(rows.len(), 1);
        assert_eq!(skipped, 1);
        assert_eq!(rows[0].1, 1);
    }
}
