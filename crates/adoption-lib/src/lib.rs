//! Adoption-likelihood pipeline for animal shelters
//!
//! This crate provides the core functionality for:
//! - Feature extraction from shelter records
//! - Training and selecting the adoption model
//! - Clustering behavior profiles into adopter recommendations
//! - Durable model storage and always-answering prediction
//! - Health diagnostics and observability

pub mod clustering;
pub mod config;
pub mod error;
pub mod features;
pub mod health;
pub mod models;
pub mod observability;
pub mod prediction;
pub mod preprocessing;
pub mod records;
pub mod store;
pub mod training;

#[cfg(test)]
mod testing;

pub use clustering::{ClusterAnalyzer, ClusterAssignment, ClusterModel, ClusterReport, ClusteringConfig};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use features::{FeatureExtractor, FeatureSchema, FeatureVector};
pub use health::{
    ComponentHealth, ComponentStatus, DiagnosticsReport, DiagnosticsReporter, HealthRegistry,
    HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PipelineMetrics, StructuredLogger};
pub use prediction::{ModelInfo, PredictionConfig, PredictionService};
pub use records::{InMemoryRecordStore, JsonRecordStore, RecordStore};
pub use store::ModelStore;
pub use training::{train_and_persist, TrainedModel, Trainer, TrainingConfig, TrainingOutcome, TrainingReport};
