//! Pipeline configuration
//!
//! Loaded from an optional file (TOML, YAML or JSON by extension) layered
//! under `SHELTER__*` environment variables, e.g.
//! `SHELTER__TRAINING__SEED=7` or `SHELTER__SERVER__PORT=9000`.

use crate::clustering::ClusteringConfig;
use crate::prediction::PredictionConfig;
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "SHELTER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Seconds between background diagnostics in the server
    pub interval_secs: u64,
    /// End-to-end latency above which a passing check is degraded
    pub max_latency_ms: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            max_latency_ms: 250.0,
        }
    }
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Reported in logs to tell replicas apart
    pub instance: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            instance: std::env::var("HOSTNAME").unwrap_or_else(|_| "adoption-server".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the model artifacts
    pub model_dir: PathBuf,
    /// JSON or JSON-lines export of shelter records
    pub records_path: PathBuf,
    pub training: TrainingConfig,
    pub clustering: ClusteringConfig,
    pub prediction: PredictionConfig,
    pub health: HealthConfig,
    pub server: ServerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("/var/lib/shelter/models"),
            records_path: PathBuf::from("/var/lib/shelter/records.json"),
            training: TrainingConfig::default(),
            clustering: ClusteringConfig::default(),
            prediction: PredictionConfig::default(),
            health: HealthConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from `path` (if given) and the environment
    ///
    /// A missing file is an error when a path is given explicitly. Values
    /// not set anywhere keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.training.min_examples, 5);
        assert_eq!(config.training.validation_fraction, 0.2);
        assert_eq!(config.clustering.min_profiles, 10);
        assert_eq!(config.prediction.decision_threshold, 0.5);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shelter.toml");
        std::fs::write(
            &path,
            r#"
model_dir = "/tmp/models"

[training]
seed = 7
engineer_features = false

[server]
port = 9100
"#,
        )
        .unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.model_dir, PathBuf::from("/tmp/models"));
        assert_eq!(config.training.seed, 7);
        assert!(!config.training.engineer_features);
        assert_eq!(config.training.cv_folds, 5);
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.health.interval_secs, 60);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(PipelineConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
