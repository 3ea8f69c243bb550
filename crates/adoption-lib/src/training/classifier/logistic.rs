//! L2-regularized logistic regression with balanced class weights

use super::{balanced_weights, sigmoid};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticParams {
    /// Strength of the L2 penalty on the weights (bias is not penalized)
    pub l2_penalty: f64,
    pub learning_rate: f64,
    pub max_iterations: usize,
    /// Stop once the gradient norm drops below this
    pub tolerance: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            l2_penalty: 0.05,
            learning_rate: 0.1,
            max_iterations: 1000,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticRegression {
    /// Fit by full-batch gradient descent on the weighted mean log-loss
    ///
    /// Deterministic: no sampling, weights start at zero.
    pub fn fit(x: &Array2<f64>, y: &[u8], params: &LogisticParams) -> Result<Self> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(PipelineError::InvalidInput(format!(
                "logistic regression needs matching rows, got {} rows and {} labels",
                x.nrows(),
                y.len()
            )));
        }

        let class_weights = balanced_weights(y);
        let sample_weights: Array1<f64> = y.iter().map(|l| class_weights[usize::from(*l)]).collect();
        let targets: Array1<f64> = y.iter().map(|l| f64::from(*l)).collect();
        let norm = sample_weights.sum();

        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;

        for _ in 0..params.max_iterations {
            let logits = x.dot(&weights) + bias;
            let probs = logits.mapv(sigmoid);
            let residual = (&probs - &targets) * &sample_weights / norm;

            let grad_w = x.t().dot(&residual) + &weights * params.l2_penalty;
            let grad_b = residual.sum();

            weights = weights - &grad_w * params.learning_rate;
            bias -= params.learning_rate * grad_b;

            let grad_norm = (grad_w.mapv(|g| g * g).sum() + grad_b * grad_b).sqrt();
            if grad_norm < params.tolerance {
                break;
            }
        }

        Ok(Self {
            weights: weights.to_vec(),
            bias,
        })
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        let logit: f64 = self
            .weights
            .iter()
            .zip(row)
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.bias;
        sigmoid(logit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_learns_separable_direction() {
        let x = array![[-2.0], [-1.5], [-1.0], [1.0], [1.5], [2.0]];
        let y = vec![0, 0, 0, 1, 1, 1];
        let model = LogisticRegression::fit(&x, &y, &LogisticParams::default()).unwrap();
        assert!(model.weights[0] > 0.0);
        assert!(model.predict_proba_row(&[2.0]) > 0.8);
        assert!(model.predict_proba_row(&[-2.0]) < 0.2);
    }

    #[test]
    fn test_l2_penalty_shrinks_weights() {
        let x = array![[-2.0], [-1.0], [1.0], [2.0]];
        let y = vec![0, 0, 1, 1];
        let loose = LogisticRegression::fit(&x, &y, &LogisticParams { l2_penalty: 0.001, ..Default::default() }).unwrap();
        let tight = LogisticRegression::fit(&x, &y, &LogisticParams { l2_penalty: 1.0, ..Default::default() }).unwrap();
        assert!(tight.weights[0].abs() < loose.weights[0].abs());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let x = array![[0.5, 1.0], [1.0, -1.0], [-0.5, 0.3], [-1.0, -0.2]];
        let y = vec![1, 1, 0, 0];
        let a = LogisticRegression::fit(&x, &y, &LogisticParams::default()).unwrap();
        let b = LogisticRegression::fit(&x, &y, &LogisticParams::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_mismatched_input() {
        let x = array![[1.0], [2.0]];
        assert!(LogisticRegression::fit(&x, &[1], &LogisticParams::default()).is_err());
    }
}
