//! Candidate classifiers for adoption likelihood

mod forest;
mod logistic;

pub use forest::{DecisionTree, ForestParams, RandomForest, TreeNode};
pub use logistic::{LogisticParams, LogisticRegression};

use crate::error::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Which candidate to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    RandomForest,
    LogisticRegression,
}

impl CandidateKind {
    pub const ALL: [CandidateKind; 2] = [CandidateKind::RandomForest, CandidateKind::LogisticRegression];

    pub fn name(&self) -> &'static str {
        match self {
            CandidateKind::RandomForest => "random_forest",
            CandidateKind::LogisticRegression => "logistic_regression",
        }
    }

    pub fn fit(
        &self,
        x: &Array2<f64>,
        y: &[u8],
        forest: &ForestParams,
        logistic: &LogisticParams,
        seed: u64,
    ) -> Result<Classifier> {
        match self {
            CandidateKind::RandomForest => RandomForest::fit(x, y, forest, seed).map(Classifier::RandomForest),
            CandidateKind::LogisticRegression => {
                LogisticRegression::fit(x, y, logistic).map(Classifier::LogisticRegression)
            }
        }
    }
}

/// A fitted classifier producing P(adopted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
}

impl Classifier {
    pub fn kind(&self) -> CandidateKind {
        match self {
            Classifier::RandomForest(_) => CandidateKind::RandomForest,
            Classifier::LogisticRegression(_) => CandidateKind::LogisticRegression,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn n_features(&self) -> usize {
        match self {
            Classifier::RandomForest(m) => m.n_features,
            Classifier::LogisticRegression(m) => m.n_features(),
        }
    }

    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        match self {
            Classifier::RandomForest(m) => m.predict_proba_row(row),
            Classifier::LogisticRegression(m) => m.predict_proba_row(row),
        }
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| self.predict_proba_row(&row.to_vec()))
            .collect()
    }

    pub fn is_consistent(&self) -> bool {
        match self {
            Classifier::RandomForest(m) => m.is_consistent(),
            Classifier::LogisticRegression(_) => true,
        }
    }
}

/// Balanced class weights `n / (2 * n_class)`, indexed by label
///
/// A class that does not occur gets weight 0.
pub fn balanced_weights(y: &[u8]) -> [f64; 2] {
    let n = y.len() as f64;
    let n1 = y.iter().filter(|l| **l == 1).count() as f64;
    let n0 = n - n1;
    let weight = |count: f64| if count > 0.0 { n / (2.0 * count) } else { 0.0 };
    [weight(n0), weight(n1)]
}

/// Numerically stable logistic function
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
