//! Polynomial feature engineering and univariate selection
//!
//! Squared and pairwise interaction terms are generated from the base
//! features, then capped to the top-k by ANOVA F-score so the feature count
//! stays small relative to the number of training samples.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Within-class sum of squares below which a column separates perfectly
const MIN_WITHIN_SS: f64 = 1e-12;

/// One column of the model input, computed from the base feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "term", rename_all = "snake_case")]
pub enum FeatureTerm {
    Base { index: usize },
    Square { index: usize },
    Interaction { left: usize, right: usize },
}

impl FeatureTerm {
    pub fn evaluate(&self, row: &[f64]) -> f64 {
        match *self {
            FeatureTerm::Base { index } => row[index],
            FeatureTerm::Square { index } => row[index] * row[index],
            FeatureTerm::Interaction { left, right } => row[left] * row[right],
        }
    }

    pub fn name(&self, base_names: &[String]) -> String {
        let base = |i: usize| base_names.get(i).cloned().unwrap_or_else(|| format!("f{}", i));
        match *self {
            FeatureTerm::Base { index } => base(index),
            FeatureTerm::Square { index } => format!("{}^2", base(index)),
            FeatureTerm::Interaction { left, right } => format!("{}*{}", base(left), base(right)),
        }
    }

    /// Largest base index this term reads
    pub fn max_index(&self) -> usize {
        match *self {
            FeatureTerm::Base { index } | FeatureTerm::Square { index } => index,
            FeatureTerm::Interaction { left, right } => left.max(right),
        }
    }
}

/// All candidate terms: base features, then squares, then interactions
pub fn candidate_terms(n_base: usize, engineer: bool) -> Vec<FeatureTerm> {
    let mut terms: Vec<FeatureTerm> = (0..n_base).map(|index| FeatureTerm::Base { index }).collect();
    if engineer {
        terms.extend((0..n_base).map(|index| FeatureTerm::Square { index }));
        for left in 0..n_base {
            for right in (left + 1)..n_base {
                terms.push(FeatureTerm::Interaction { left, right });
            }
        }
    }
    terms
}

pub fn expand_row(row: &[f64], terms: &[FeatureTerm]) -> Vec<f64> {
    terms.iter().map(|t| t.evaluate(row)).collect()
}

pub fn expand(x: &Array2<f64>, terms: &[FeatureTerm]) -> Array2<f64> {
    let mut out = Array2::zeros((x.nrows(), terms.len()));
    for (i, row) in x.rows().into_iter().enumerate() {
        let row = row.to_vec();
        for (j, term) in terms.iter().enumerate() {
            out[[i, j]] = term.evaluate(&row);
        }
    }
    out
}

/// ANOVA F-statistic of each column against a binary label
///
/// Constant columns score 0. Columns with no within-class variance but
/// different class means score `f64::MAX`.
pub fn f_scores(x: &Array2<f64>, y: &[u8]) -> Vec<f64> {
    let n = y.len();
    let n1 = y.iter().filter(|l| **l == 1).count();
    let n0 = n - n1;
    if n0 == 0 || n1 == 0 || n < 3 {
        return vec![0.0; x.ncols()];
    }

    x.columns()
        .into_iter()
        .map(|col| {
            let (mut s0, mut s1) = (0.0, 0.0);
            for (v, label) in col.iter().zip(y) {
                if *label == 1 {
                    s1 += v;
                } else {
                    s0 += v;
                }
            }
            let m0 = s0 / n0 as f64;
            let m1 = s1 / n1 as f64;
            let m = (s0 + s1) / n as f64;

            let ss_between = n0 as f64 * (m0 - m).powi(2) + n1 as f64 * (m1 - m).powi(2);
            let ss_within: f64 = col
                .iter()
                .zip(y)
                .map(|(v, label)| {
                    let mc = if *label == 1 { m1 } else { m0 };
                    (v - mc).powi(2)
                })
                .sum();

            if ss_within <= MIN_WITHIN_SS {
                if ss_between > MIN_WITHIN_SS {
                    f64::MAX
                } else {
                    0.0
                }
            } else {
                ss_between / (ss_within / (n - 2) as f64)
            }
        })
        .collect()
}

/// Keep the `k` most significant terms, returned in candidate order
///
/// `x_base` must be the train partition only; ties keep the earlier term.
pub fn select_terms(
    x_base: &Array2<f64>,
    y: &[u8],
    candidates: &[FeatureTerm],
    k: usize,
) -> Vec<FeatureTerm> {
    if k >= candidates.len() {
        return candidates.to_vec();
    }
    let expanded = expand(x_base, candidates);
    let scores = f_scores(&expanded, y);

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));
    let mut keep: Vec<usize> = order.into_iter().take(k.max(1)).collect();
    keep.sort_unstable();
    keep.into_iter().map(|i| candidates[i]).collect()
}
