//! Versioned feature layout shared by training and serving

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Current layout version, bump whenever field order or encoding changes
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Categorical,
    Ordinal,
    Numeric,
    Flag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureField {
    pub name: String,
    pub kind: FeatureKind,
}

/// Ordered list of base features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub fields: Vec<FeatureField>,
}

const V1_FIELDS: &[(&str, FeatureKind)] = &[
    ("species", FeatureKind::Categorical),
    ("size", FeatureKind::Ordinal),
    ("age_category", FeatureKind::Ordinal),
    ("weight", FeatureKind::Numeric),
    ("vaccinated", FeatureKind::Flag),
    ("adoption_fee", FeatureKind::Numeric),
    ("days_in_care", FeatureKind::Numeric),
    ("prior_owner", FeatureKind::Flag),
    ("health_severity", FeatureKind::Ordinal),
    ("energy_level", FeatureKind::Ordinal),
    ("training_level", FeatureKind::Ordinal),
    ("good_with_children", FeatureKind::Flag),
    ("good_with_dogs", FeatureKind::Flag),
    ("good_with_cats", FeatureKind::Flag),
    ("special_needs", FeatureKind::Flag),
];

impl FeatureSchema {
    pub fn current() -> Self {
        Self {
            version: SCHEMA_VERSION,
            fields: V1_FIELDS
                .iter()
                .map(|(name, kind)| FeatureField {
                    name: (*name).to_string(),
                    kind: *kind,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Fails unless `other` has exactly the same version and field order
    pub fn ensure_compatible(&self, other: &FeatureSchema) -> Result<()> {
        if self == other {
            return Ok(());
        }
        Err(PipelineError::SchemaMismatch {
            expected_version: self.version,
            expected_len: self.len(),
            found_version: other.version,
            found_len: other.len(),
        })
    }
}

/// Values of one record in schema order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub schema_version: u32,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Checks that the vector was produced for `schema`
    pub fn conforms_to(&self, schema: &FeatureSchema) -> Result<()> {
        if self.schema_version == schema.version && self.values.len() == schema.len() {
            return Ok(());
        }
        Err(PipelineError::SchemaMismatch {
            expected_version: schema.version,
            expected_len: schema.len(),
            found_version: self.schema_version,
            found_len: self.values.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_schema_order() {
        let schema = FeatureSchema::current();
        assert_eq!(schema.len(), 15);
        assert_eq!(schema.index_of("species"), Some(0));
        assert_eq!(schema.index_of("age_category"), Some(2));
        assert_eq!(schema.index_of("special_needs"), Some(14));
    }

    #[test]
    fn test_reordered_schema_is_incompatible() {
        let schema = FeatureSchema::current();
        let mut reordered = schema.clone();
        reordered.fields.swap(0, 1);
        assert!(schema.ensure_compatible(&schema.clone()).is_ok());
        assert!(matches!(
            schema.ensure_compatible(&reordered),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_vector_conformance() {
        let schema = FeatureSchema::current();
        let good = FeatureVector { schema_version: SCHEMA_VERSION, values: vec![0.0; 15] };
        let short = FeatureVector { schema_version: SCHEMA_VERSION, values: vec![0.0; 14] };
        assert!(good.conforms_to(&schema).is_ok());
        assert!(short.conforms_to(&schema).is_err());
    }
}
