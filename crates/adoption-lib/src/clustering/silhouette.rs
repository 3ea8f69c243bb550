//! Mean silhouette coefficient

use super::kmeans::squared_distance;
use ndarray::Array2;

/// Mean silhouette over all points, Euclidean distance
///
/// Points in singleton clusters score 0, as do points whose cohesion and
/// separation are both 0 (duplicates split across clusters).
pub fn silhouette_score(x: &Array2<f64>, labels: &[usize], k: usize) -> f64 {
    let n = x.nrows();
    if n == 0 || k < 2 {
        return 0.0;
    }

    let mut sizes = vec![0usize; k];
    for l in labels {
        sizes[*l] += 1;
    }

    let mut total = 0.0;
    for i in 0..n {
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }
        let mut sums = vec![0.0; k];
        for j in 0..n {
            if i != j {
                sums[labels[j]] += squared_distance(x.row(i), x.row(j)).sqrt();
            }
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|c| *c != own && sizes[*c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        if !b.is_finite() {
            continue;
        }
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_separation_scores_one() {
        let x = array![[0.0], [0.0], [4.0], [4.0]];
        assert!((silhouette_score(&x, &[0, 0, 1, 1], 2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bad_assignment_scores_negative() {
        let x = array![[0.0], [4.0], [0.0], [4.0]];
        assert!(silhouette_score(&x, &[0, 0, 1, 1], 2) < 0.0);
    }

    #[test]
    fn test_singletons_score_zero() {
        let x = array![[0.0], [1.0], [2.0]];
        assert_eq!(silhouette_score(&x, &[0, 1, 2], 3), 0.0);
    }
}
