//! Error types for the adoption pipeline

use thiserror::Error;

/// Errors raised by the feature, training, clustering and storage layers
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Not enough input to produce a meaningful model
    #[error("insufficient data: need at least {required} {what}, found {found}")]
    InsufficientData {
        what: String,
        required: usize,
        found: usize,
    },

    /// A single record could not be turned into a feature vector
    #[error("feature extraction failed for record {record_id}: {reason}")]
    FeatureExtraction { record_id: String, reason: String },

    /// Feature layout recorded with a model does not match the extractor
    #[error("feature schema mismatch: expected v{expected_version} ({expected_len} fields), got v{found_version} ({found_len} fields)")]
    SchemaMismatch {
        expected_version: u32,
        expected_len: usize,
        found_version: u32,
        found_len: usize,
    },

    /// Persisted artifact is unreadable or inconsistent
    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn insufficient(what: impl Into<String>, required: usize, found: usize) -> Self {
        Self::InsufficientData {
            what: what.into(),
            required,
            found,
        }
    }

    pub fn extraction(record_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FeatureExtraction {
            record_id: record_id.into(),
            reason: reason.into(),
        }
    }

    /// True when the caller should retry later with more data
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
