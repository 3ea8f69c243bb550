//! Durable storage of trained artifacts
//!
//! This module provides:
//! - A checksummed JSON envelope around each artifact
//! - Atomic replacement (unique temp file, fsync, rename, directory fsync)
//! - Lenient loading: a missing or damaged artifact reads as absent

use crate::clustering::ClusterModel;
use crate::error::{PipelineError, Result};
use crate::training::TrainedModel;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Bumped when the envelope layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

const MODEL_FILE: &str = "adoption_model.json";
const CLUSTERS_FILE: &str = "behavior_clusters.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    AdoptionModel,
    ClusterModel,
}

impl ArtifactKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::AdoptionModel => MODEL_FILE,
            ArtifactKind::ClusterModel => CLUSTERS_FILE,
        }
    }
}

/// On-disk wrapper around a serialized artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEnvelope {
    pub format_version: u32,
    pub kind: ArtifactKind,
    /// Hex SHA-256 of the compact JSON encoding of `payload`
    pub checksum: String,
    pub written_at: i64,
    pub payload: Value,
}

impl ArtifactEnvelope {
    fn wrap<T: Serialize>(kind: ArtifactKind, artifact: &T) -> Result<Self> {
        let payload = serde_json::to_value(artifact)?;
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            kind,
            checksum: compute_checksum(&serde_json::to_vec(&payload)?),
            written_at: chrono::Utc::now().timestamp(),
            payload,
        })
    }

    fn unwrap_as<T: DeserializeOwned>(self, kind: ArtifactKind) -> Result<T> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(PipelineError::Artifact(format!(
                "unsupported format version {}",
                self.format_version
            )));
        }
        if self.kind != kind {
            return Err(PipelineError::Artifact(format!(
                "expected {:?} artifact, found {:?}",
                kind, self.kind
            )));
        }
        let actual = compute_checksum(&serde_json::to_vec(&self.payload)?);
        if actual != self.checksum {
            return Err(PipelineError::Artifact(format!(
                "checksum mismatch: recorded {}, computed {}",
                self.checksum, actual
            )));
        }
        Ok(serde_json::from_value(self.payload)?)
    }
}

/// Directory-backed store for the adoption and cluster models
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    pub fn has_model(&self) -> bool {
        self.path_for(ArtifactKind::AdoptionModel).is_file()
    }

    pub fn save_model(&self, model: &TrainedModel) -> Result<PathBuf> {
        let path = self.write(ArtifactKind::AdoptionModel, model)?;
        info!(model = %model.identifier(), path = %path.display(), "Saved adoption model");
        Ok(path)
    }

    /// Load the adoption model, `None` if absent or unusable
    pub fn load_model(&self) -> Option<TrainedModel> {
        let model: TrainedModel = self.load(ArtifactKind::AdoptionModel)?;
        if let Err(e) = model.validate() {
            warn!(error = %e, "Stored adoption model is inconsistent, ignoring it");
            return None;
        }
        Some(model)
    }

    pub fn save_clusters(&self, clusters: &ClusterModel) -> Result<PathBuf> {
        let path = self.write(ArtifactKind::ClusterModel, clusters)?;
        info!(k = clusters.k, path = %path.display(), "Saved cluster model");
        Ok(path)
    }

    pub fn load_clusters(&self) -> Option<ClusterModel> {
        self.load(ArtifactKind::ClusterModel)
    }

    /// Read and verify an artifact, distinguishing absence from damage
    pub fn read<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Result<Option<T>> {
        let path = self.path_for(kind);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let envelope: ArtifactEnvelope = serde_json::from_slice(&bytes)?;
        envelope.unwrap_as(kind).map(Some)
    }

    fn load<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Option<T> {
        match self.read(kind) {
            Ok(Some(artifact)) => Some(artifact),
            Ok(None) => {
                debug!(path = %self.path_for(kind).display(), "No stored artifact");
                None
            }
            Err(e) => {
                warn!(
                    path = %self.path_for(kind).display(),
                    error = %e,
                    "Failed to load artifact"
                );
                None
            }
        }
    }

    fn write<T: Serialize>(&self, kind: ArtifactKind, artifact: &T) -> Result<PathBuf> {
        let envelope = ArtifactEnvelope::wrap(kind, artifact)?;
        let bytes = serde_json::to_vec_pretty(&envelope)?;
        let path = self.path_for(kind);
        write_atomic(&path, &bytes)?;
        Ok(path)
    }
}

/// Replace `path` with `bytes` so readers never observe a partial file
///
/// Each writer gets its own temp file in the target directory, and the
/// directory is synced after the rename so the new entry survives a crash.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    sync_dir(dir)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

// directories cannot be opened for syncing on other platforms
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::labeled;
    use crate::training::{Trainer, TrainingConfig};
    use tempfile::TempDir;

    fn trained() -> TrainedModel {
        Trainer::new(TrainingConfig::default())
            .train(&labeled(10, 10))
            .unwrap()
            .model
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"adoption model");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"adoption model"));
        assert_ne!(checksum, compute_checksum(b"adoption models"));
    }

    #[test]
    fn test_save_then_load_is_identical() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        let model = trained();

        let path = store.save_model(&model).unwrap();
        assert!(path.ends_with(MODEL_FILE));
        assert_eq!(store.load_model(), Some(model));

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "temp files must not be left behind");
    }

    #[test]
    fn test_concurrent_saves_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        let model = trained();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| store.save_model(&model))).collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        });

        assert_eq!(store.load_model(), Some(model));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_artifact_is_none() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("nested")).unwrap();
        assert!(!store.has_model());
        assert!(store.load_model().is_none());
        assert!(store.load_clusters().is_none());
        assert!(store.read::<TrainedModel>(ArtifactKind::AdoptionModel).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_artifact_is_none() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        fs::write(store.path_for(ArtifactKind::AdoptionModel), b"{not json").unwrap();
        assert!(store.load_model().is_none());
        assert!(store.read::<TrainedModel>(ArtifactKind::AdoptionModel).is_err());
    }

    #[test]
    fn test_tampered_payload_fails_checksum() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        let path = store.save_model(&trained()).unwrap();

        let mut envelope: ArtifactEnvelope = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        envelope.payload["validation_accuracy"] = serde_json::json!(0.01);
        fs::write(&path, serde_json::to_vec(&envelope).unwrap()).unwrap();

        let err = store.read::<TrainedModel>(ArtifactKind::AdoptionModel).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
        assert!(store.load_model().is_none());
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        let model = trained();
        let envelope = ArtifactEnvelope::wrap(ArtifactKind::ClusterModel, &model).unwrap();
        fs::write(
            store.path_for(ArtifactKind::AdoptionModel),
            serde_json::to_vec(&envelope).unwrap(),
        )
        .unwrap();
        assert!(store.load_model().is_none());
    }

    #[test]
    fn test_save_replaces_previous_artifact() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        let mut first = trained();
        first.version = "v1".to_string();
        let mut second = first.clone();
        second.version = "v2".to_string();

        store.save_model(&first).unwrap();
        store.save_model(&second).unwrap();
        assert_eq!(store.load_model().map(|m| m.version), Some("v2".to_string()));
    }
}
