//! Feature scaling shared by training, clustering and serving

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Standard deviation below which a column is treated as constant
const MIN_SCALE: f64 = 1e-12;

/// Zero-mean, unit-variance scaler (population standard deviation)
///
/// Constant columns keep a scale of 1 so they transform to 0 instead of NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        let means = x
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::InvalidInput("cannot fit scaler on zero rows".into()))?;
        let stds = x.std_axis(Axis(0), 0.0);
        Ok(Self {
            means: means.to_vec(),
            scales: stds
                .iter()
                .map(|s| if *s > MIN_SCALE { *s } else { 1.0 })
                .collect(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let means = Array1::from(self.means.clone());
        let scales = Array1::from(self.scales.clone());
        (x - &means) / &scales
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(PipelineError::InvalidInput(format!(
                "scaler expects {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_zero_mean_unit_variance() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let scaler = StandardScaler::fit(&x).unwrap();
        assert_eq!(scaler.means, vec![3.0, 10.0]);
        // constant column keeps scale 1
        assert_eq!(scaler.scales[1], 1.0);

        let z = scaler.transform(&x);
        let col = z.column(0);
        assert!(col.sum().abs() < 1e-12);
        assert!((col.mapv(|v| v * v).sum() / 3.0 - 1.0).abs() < 1e-12);
        assert!(z.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_row_transform_matches_matrix_transform() {
        let x = array![[1.0, 2.0], [4.0, 8.0], [2.5, 0.5]];
        let scaler = StandardScaler::fit(&x).unwrap();
        let z = scaler.transform(&x);
        let row = scaler.transform_row(&[4.0, 8.0]).unwrap();
        assert_eq!(row, z.row(1).to_vec());
        assert!(scaler.transform_row(&[1.0]).is_err());
    }

    #[test]
    fn test_fit_rejects_empty() {
        let x = Array2::<f64>::zeros((0, 3));
        assert!(StandardScaler::fit(&x).is_err());
    }
}
