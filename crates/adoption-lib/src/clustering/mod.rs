//! Behavior-profile clustering
//!
//! Profiles are encoded with the same rules as the feature extractor,
//! scaled on the whole batch and grouped with k-means. The cluster count is
//! chosen by mean silhouette, and each cluster gets a label and a list of
//! adopter-facing recommendations.

mod kmeans;
mod recommendations;
mod silhouette;

#[cfg(test)]
mod tests;

pub use kmeans::KMeansParams;
pub use recommendations::{ClusterProfile, COMPATIBILITY_THRESHOLD, SPECIAL_NEEDS_THRESHOLD};
pub use silhouette::silhouette_score;

use crate::error::{PipelineError, Result};
use crate::features::FeatureExtractor;
use crate::models::BehaviorProfile;
use crate::preprocessing::StandardScaler;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Fewest profiles a clustering run accepts
pub const MIN_PROFILES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub min_profiles: usize,
    /// Largest k tried, further capped at half the number of profiles
    pub max_k: usize,
    pub seed: u64,
    pub kmeans: KMeansParams,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_profiles: MIN_PROFILES,
            max_k: 10,
            seed: 42,
            kmeans: KMeansParams::default(),
        }
    }
}

/// Description of one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub cluster_id: usize,
    pub label: String,
    pub size: usize,
    pub profile: ClusterProfile,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KScore {
    pub k: usize,
    pub silhouette: f64,
}

/// Persistable result of a clustering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterModel {
    pub k: usize,
    pub scaler: StandardScaler,
    /// Centroids in scaled space, indexed by cluster id
    pub centroids: Vec<Vec<f64>>,
    pub clusters: Vec<ClusterAssignment>,
    pub silhouette: f64,
    pub created_at: i64,
}

impl ClusterModel {
    /// Cluster whose centroid is closest to the profile
    pub fn assign(&self, profile: &BehaviorProfile) -> Result<&ClusterAssignment> {
        let raw = FeatureExtractor::behavior_features(Some(profile));
        let scaled = self.scaler.transform_row(&raw)?;
        let mut best: Option<(usize, f64)> = None;
        for (id, centroid) in self.centroids.iter().enumerate() {
            if centroid.len() != scaled.len() {
                return Err(PipelineError::Artifact(format!(
                    "centroid {} has {} dimensions, expected {}",
                    id,
                    centroid.len(),
                    scaled.len()
                )));
            }
            let d: f64 = centroid.iter().zip(&scaled).map(|(c, v)| (c - v) * (c - v)).sum();
            if best.map_or(true, |(_, b)| d < b) {
                best = Some((id, d));
            }
        }
        best.and_then(|(id, _)| self.clusters.get(id))
            .ok_or_else(|| PipelineError::Artifact("cluster model has no clusters".into()))
    }
}

#[derive(Debug, Clone)]
pub struct ClusterReport {
    /// Cluster id of each input profile, in input order
    pub assignments: Vec<usize>,
    pub clusters: BTreeMap<usize, ClusterAssignment>,
    /// Mean silhouette of every k tried
    pub scores: Vec<KScore>,
    pub model: ClusterModel,
}

impl ClusterReport {
    pub fn chosen_k(&self) -> usize {
        self.model.k
    }

    pub fn silhouette(&self) -> f64 {
        self.model.silhouette
    }
}

pub struct ClusterAnalyzer {
    config: ClusteringConfig,
}

impl ClusterAnalyzer {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Cluster a batch of profiles, recomputed from scratch on every call
    pub fn cluster(&self, profiles: &[BehaviorProfile]) -> Result<ClusterReport> {
        let min = self.config.min_profiles.max(4);
        if profiles.len() < min {
            return Err(PipelineError::insufficient("behavior profiles", min, profiles.len()));
        }

        let flat: Vec<f64> = profiles
            .iter()
            .flat_map(|p| FeatureExtractor::behavior_features(Some(p)))
            .collect();
        let raw = Array2::from_shape_vec((profiles.len(), flat.len() / profiles.len()), flat)
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;
        let scaler = StandardScaler::fit(&raw)?;
        let x = scaler.transform(&raw);

        let max_k = self.config.max_k.min(profiles.len() / 2);
        let mut scores = Vec::new();
        let mut best: Option<(f64, kmeans::KMeansFit)> = None;
        for k in 2..=max_k {
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(k as u64));
            let fit = kmeans::fit(&x, k, &self.config.kmeans, &mut rng);
            let score = silhouette_score(&x, &fit.labels, k);
            debug!(k, silhouette = score, inertia = fit.inertia, "Scored cluster count");
            scores.push(KScore { k, silhouette: score });
            // strict comparison keeps the lowest k on ties
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, fit));
            }
        }
        let (silhouette, fit) = best.ok_or_else(|| PipelineError::insufficient("behavior profiles", 4, profiles.len()))?;

        let (assignments, order) = relabel_by_first_appearance(&fit.labels);
        let centroids = fit.centroids.select(Axis(0), &order);
        let k = order.len();

        let mut clusters = BTreeMap::new();
        for cluster_id in 0..k {
            let members: Vec<&BehaviorProfile> = profiles
                .iter()
                .zip(&assignments)
                .filter(|(_, c)| **c == cluster_id)
                .map(|(p, _)| p)
                .collect();
            let profile = ClusterProfile::from_members(&members);
            clusters.insert(
                cluster_id,
                ClusterAssignment {
                    cluster_id,
                    label: profile.label(),
                    size: members.len(),
                    recommendations: profile.recommendations(),
                    profile,
                },
            );
        }

        info!(
            profiles = profiles.len(),
            k,
            silhouette,
            "Clustering completed"
        );

        let model = ClusterModel {
            k,
            scaler,
            centroids: centroids.rows().into_iter().map(|r| r.to_vec()).collect(),
            clusters: clusters.values().cloned().collect(),
            silhouette,
            created_at: chrono::Utc::now().timestamp(),
        };

        Ok(ClusterReport {
            assignments,
            clusters,
            scores,
            model,
        })
    }
}

/// Renumber clusters in order of first appearance
///
/// Returns the new label of each point and, for each new id, the old id.
fn relabel_by_first_appearance(labels: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = Vec::new();
    let relabeled = labels
        .iter()
        .map(|old| match order.iter().position(|o| o == old) {
            Some(new) => new,
            None => {
                order.push(*old);
                order.len() - 1
            }
        })
        .collect();
    (relabeled, order)
}
