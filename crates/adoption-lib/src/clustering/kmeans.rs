//! Seeded k-means with k-means++ initialization

use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansParams {
    /// Independent restarts, the lowest-inertia run wins
    pub n_init: usize,
    pub max_iter: usize,
    /// Total squared centroid movement that counts as converged
    pub tolerance: f64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub centroids: Array2<f64>,
    pub labels: Vec<usize>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
}

pub fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the closest centroid, ties to the lowest index
pub fn nearest(point: ArrayView1<f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.rows().into_iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

/// Best of `params.n_init` runs of Lloyd's algorithm
///
/// `x` must have at least `k` rows and `k` must be positive.
pub fn fit(x: &Array2<f64>, k: usize, params: &KMeansParams, rng: &mut StdRng) -> KMeansFit {
    let mut best: Option<KMeansFit> = None;
    for _ in 0..params.n_init.max(1) {
        let run = lloyd(x, init_plus_plus(x, k, rng), params);
        if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
            best = Some(run);
        }
    }
    best.unwrap_or_else(|| lloyd(x, init_plus_plus(x, k, rng), params))
}

/// k-means++ seeding: each next center drawn with probability proportional
/// to squared distance from the nearest chosen center
fn init_plus_plus(x: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = x.nrows();
    let mut chosen = vec![rng.gen_range(0..n)];
    let mut dist: Vec<f64> = x
        .rows()
        .into_iter()
        .map(|row| squared_distance(row, x.row(chosen[0])))
        .collect();

    while chosen.len() < k {
        let total: f64 = dist.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = n - 1;
            for (i, d) in dist.iter().enumerate() {
                if *d <= 0.0 {
                    continue;
                }
                target -= d;
                if target <= 0.0 {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            // every point coincides with a center
            rng.gen_range(0..n)
        };
        chosen.push(next);
        for (i, row) in x.rows().into_iter().enumerate() {
            dist[i] = dist[i].min(squared_distance(row, x.row(next)));
        }
    }

    x.select(Axis(0), &chosen)
}

fn lloyd(x: &Array2<f64>, mut centroids: Array2<f64>, params: &KMeansParams) -> KMeansFit {
    let k = centroids.nrows();
    let mut labels = vec![0; x.nrows()];

    for _ in 0..params.max_iter.max(1) {
        for (i, row) in x.rows().into_iter().enumerate() {
            labels[i] = nearest(row, &centroids).0;
        }
        fill_empty_clusters(x, &centroids, &mut labels, k);

        let mut updated = Array2::<f64>::zeros(centroids.raw_dim());
        let mut counts = vec![0usize; k];
        for (i, row) in x.rows().into_iter().enumerate() {
            let mut target = updated.row_mut(labels[i]);
            target += &row;
            counts[labels[i]] += 1;
        }
        for (c, count) in counts.iter().enumerate() {
            if *count > 0 {
                updated.row_mut(c).mapv_inplace(|v| v / *count as f64);
            } else {
                updated.row_mut(c).assign(&centroids.row(c));
            }
        }

        let shift: f64 = centroids
            .rows()
            .into_iter()
            .zip(updated.rows())
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = updated;
        if shift <= params.tolerance {
            break;
        }
    }

    for (i, row) in x.rows().into_iter().enumerate() {
        labels[i] = nearest(row, &centroids).0;
    }
    fill_empty_clusters(x, &centroids, &mut labels, k);
    let inertia = x
        .rows()
        .into_iter()
        .zip(&labels)
        .map(|(row, c)| squared_distance(row, centroids.row(*c)))
        .sum();

    KMeansFit {
        centroids,
        labels,
        inertia,
    }
}

/// Give each empty cluster the point farthest from its current centroid,
/// taken only from clusters with more than one member
fn fill_empty_clusters(x: &Array2<f64>, centroids: &Array2<f64>, labels: &mut [usize], k: usize) {
    let mut counts = vec![0usize; k];
    for l in labels.iter() {
        counts[*l] += 1;
    }
    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let donor = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| counts[**l] > 1)
            .map(|(i, l)| (i, squared_distance(x.row(i), centroids.row(*l))))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((i, _)) = donor {
            counts[labels[i]] -= 1;
            labels[i] = empty;
            counts[empty] += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_two_obvious_groups() {
        let x = array![[0.0, 0.0], [0.1, 0.0], [0.0, 0.1], [5.0, 5.0], [5.1, 5.0], [5.0, 5.1]];
        let mut rng = StdRng::seed_from_u64(3);
        let fit = fit(&x, 2, &KMeansParams::default(), &mut rng);
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[0], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[5]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert!(fit.inertia < 0.1);
    }

    #[test]
    fn test_no_cluster_left_empty_with_duplicates() {
        let x = array![[1.0], [1.0], [1.0], [1.0], [9.0]];
        let mut rng = StdRng::seed_from_u64(1);
        let fit = fit(&x, 3, &KMeansParams::default(), &mut rng);
        for c in 0..3 {
            assert!(fit.labels.iter().any(|l| *l == c), "cluster {c} is empty");
        }
    }

    #[test]
    fn test_nearest_prefers_lowest_index_on_tie() {
        let centroids = array![[1.0], [-1.0]];
        let point = array![0.0];
        assert_eq!(nearest(point.view(), &centroids).0, 0);
    }
}
