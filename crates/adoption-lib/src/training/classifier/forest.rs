//! Bounded random forest of weighted-Gini decision trees
//!
//! Trees are grown on bootstrap samples with a per-tree seeded RNG, so a
//! forest is fully reproducible from its seed. Depth, leaf size and the
//! number of features tried per split are all capped to keep the model
//! small on shelter-sized datasets.

use super::balanced_weights;
use crate::error::{PipelineError, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Minimum impurity decrease for a split to be kept
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split, `None` means ceil(sqrt(n_features))
    pub max_features: Option<usize>,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: 4,
            min_samples_leaf: 2,
            max_features: None,
            bootstrap: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        probability: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Flat tree, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { probability }) => return *probability,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
                None => return 0.5,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(TreeNode::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }

    fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                TreeNode::Split { feature, .. } => Some(*feature),
                TreeNode::Leaf { .. } => None,
            })
            .max()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
    pub n_features: usize,
}

impl RandomForest {
    pub fn fit(x: &Array2<f64>, y: &[u8], params: &ForestParams, seed: u64) -> Result<Self> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(PipelineError::InvalidInput(format!(
                "random forest needs matching rows, got {} rows and {} labels",
                x.nrows(),
                y.len()
            )));
        }
        let n_features = x.ncols();
        let max_features = params
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize)
            .clamp(1, n_features.max(1));

        let builder = TreeBuilder {
            x,
            y,
            class_weights: balanced_weights(y),
            max_depth: params.max_depth,
            min_samples_leaf: params.min_samples_leaf.max(1),
            max_features,
        };

        let trees = (0..params.n_trees.max(1))
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let rows: Vec<usize> = if params.bootstrap {
                    (0..y.len()).map(|_| rng.gen_range(0..y.len())).collect()
                } else {
                    (0..y.len()).collect()
                };
                builder.build(&rows, &mut rng)
            })
            .collect();

        Ok(Self { trees, n_features })
    }

    /// Mean leaf probability across trees
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        self.trees.iter().map(|t| t.predict_proba_row(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Checks that every split reads a feature the forest was fitted on
    pub fn is_consistent(&self) -> bool {
        self.trees
            .iter()
            .filter_map(|t| t.max_feature())
            .all(|f| f < self.n_features)
    }
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    y: &'a [u8],
    class_weights: [f64; 2],
    max_depth: usize,
    min_samples_leaf: usize,
    max_features: usize,
}

impl TreeBuilder<'_> {
    fn build(&self, rows: &[usize], rng: &mut StdRng) -> DecisionTree {
        let mut nodes = Vec::new();
        self.grow(rows, 0, rng, &mut nodes);
        DecisionTree { nodes }
    }

    fn weighted_counts(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(w0, w1), &i| {
            if self.y[i] == 1 {
                (w0, w1 + self.class_weights[1])
            } else {
                (w0 + self.class_weights[0], w1)
            }
        })
    }

    fn grow(&self, rows: &[usize], depth: usize, rng: &mut StdRng, nodes: &mut Vec<TreeNode>) -> usize {
        let (w0, w1) = self.weighted_counts(rows);
        let probability = if w0 + w1 > 0.0 { w1 / (w0 + w1) } else { 0.5 };
        let idx = nodes.len();
        nodes.push(TreeNode::Leaf { probability });

        let pure = w0 == 0.0 || w1 == 0.0;
        if pure || depth >= self.max_depth || rows.len() < 2 * self.min_samples_leaf {
            return idx;
        }

        let Some((feature, threshold)) = self.best_split(rows, w0, w1, rng) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&i| self.x[[i, feature]] <= threshold);
        let left = self.grow(&left_rows, depth + 1, rng, nodes);
        let right = self.grow(&right_rows, depth + 1, rng, nodes);
        nodes[idx] = TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&self, rows: &[usize], w0: f64, w1: f64, rng: &mut StdRng) -> Option<(usize, f64)> {
        let total = w0 + w1;
        let parent = gini(w0, w1);
        let mut best: Option<(usize, f64, f64)> = None;

        let features = sample(rng, self.x.ncols(), self.max_features.min(self.x.ncols()));
        for feature in features.iter() {
            let mut values: Vec<(f64, u8)> = rows.iter().map(|&i| (self.x[[i, feature]], self.y[i])).collect();
            values.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (mut l0, mut l1) = (0.0, 0.0);
            for pos in 0..values.len() - 1 {
                if values[pos].1 == 1 {
                    l1 += self.class_weights[1];
                } else {
                    l0 += self.class_weights[0];
                }
                let left_count = pos + 1;
                let right_count = values.len() - left_count;
                if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                    continue;
                }
                if values[pos].0 == values[pos + 1].0 {
                    continue;
                }

                let (r0, r1) = (w0 - l0, w1 - l1);
                let wl = l0 + l1;
                let wr = r0 + r1;
                let impurity = (wl * gini(l0, l1) + wr * gini(r0, r1)) / total;
                if best.map_or(true, |(_, _, b)| impurity < b - MIN_GAIN) {
                    let threshold = (values[pos].0 + values[pos + 1].0) / 2.0;
                    best = Some((feature, threshold, impurity));
                }
            }
        }

        best.filter(|(_, _, impurity)| *impurity < parent - MIN_GAIN)
            .map(|(feature, threshold, _)| (feature, threshold))
    }
}

fn gini(w0: f64, w1: f64) -> f64 {
    let total = w0 + w1;
    if total <= 0.0 {
        return 0.0;
    }
    let p0 = w0 / total;
    let p1 = w1 / total;
    1.0 - p0 * p0 - p1 * p1
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Vec<u8>) {
        let x = array![
            [0.1, 5.0],
            [0.2, 3.0],
            [0.3, 4.0],
            [0.4, 1.0],
            [0.9, 2.0],
            [1.0, 5.0],
            [1.1, 1.0],
            [1.2, 3.0]
        ];
        (x, vec![0, 0, 0, 0, 1, 1, 1, 1])
    }

    #[test]
    fn test_forest_separates_classes() {
        let (x, y) = separable();
        let params = ForestParams { max_features: Some(2), ..Default::default() };
        let forest = RandomForest::fit(&x, &y, &params, 42).unwrap();
        assert_eq!(forest.trees.len(), params.n_trees);
        assert!(forest.predict_proba_row(&[1.15, 2.0]) > 0.7);
        assert!(forest.predict_proba_row(&[0.15, 2.0]) < 0.3);
        assert!(forest.is_consistent());
    }

    #[test]
    fn test_depth_is_bounded() {
        let (x, y) = separable();
        let params = ForestParams {
            max_depth: 1,
            min_samples_leaf: 1,
            ..Default::default()
        };
        let forest = RandomForest::fit(&x, &y, &params, 7).unwrap();
        assert!(forest.trees.iter().all(|t| t.depth() <= 1));
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = separable();
        let params = ForestParams::default();
        let a = RandomForest::fit(&x, &y, &params, 11).unwrap();
        let b = RandomForest::fit(&x, &y, &params, 11).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(1.0, 0.0), 0.0);
        assert!((gini(1.0, 1.0) - 0.5).abs() < 1e-12);
        assert_eq!(gini(0.0, 0.0), 0.0);
    }
}
