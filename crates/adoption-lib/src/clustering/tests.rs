use super::*;
use crate::testing::profile;

fn two_groups() -> Vec<BehaviorProfile> {
    (0..20)
        .map(|i| {
            if i % 2 == 0 {
                profile("very-high", "basic", true, true, false, false)
            } else {
                profile("low", "advanced", false, false, true, true)
            }
        })
        .collect()
}

#[test]
fn test_two_separable_groups_pick_k_two() {
    let profiles = two_groups();
    let report = ClusterAnalyzer::new(ClusteringConfig::default())
        .cluster(&profiles)
        .unwrap();

    assert_eq!(report.chosen_k(), 2);
    assert!((report.silhouette() - 1.0).abs() < 1e-9);
    // ids follow first appearance: the first profile is high energy
    for (i, cluster) in report.assignments.iter().enumerate() {
        assert_eq!(*cluster, i % 2);
    }
    assert_eq!(report.clusters[&0].size, 10);
    assert_eq!(report.clusters[&0].label, "Very high energy, basic training");
    assert_eq!(report.clusters[&1].label, "Low energy, advanced training");
}

#[test]
fn test_scores_cover_every_k() {
    let report = ClusterAnalyzer::new(ClusteringConfig::default())
        .cluster(&two_groups())
        .unwrap();
    let ks: Vec<usize> = report.scores.iter().map(|s| s.k).collect();
    assert_eq!(ks, (2..=10).collect::<Vec<_>>());
}

#[test]
fn test_recommendations_follow_flags() {
    let report = ClusterAnalyzer::new(ClusteringConfig::default())
        .cluster(&two_groups())
        .unwrap();
    let family = &report.clusters[&0].recommendations;
    assert!(family.iter().any(|r| r.contains("family pet")));
    assert!(!family.iter().any(|r| r.contains("experienced adopters")));

    let special = &report.clusters[&1].recommendations;
    assert!(special.iter().any(|r| r.contains("cats")));
    assert!(special.iter().any(|r| r.contains("experienced adopters")));
}

#[test]
fn test_fewer_than_ten_profiles_is_insufficient() {
    let profiles: Vec<BehaviorProfile> = two_groups().into_iter().take(9).collect();
    let err = ClusterAnalyzer::new(ClusteringConfig::default())
        .cluster(&profiles)
        .unwrap_err();
    assert!(err.is_insufficient_data());
}

#[test]
fn test_model_assigns_new_profiles() {
    let report = ClusterAnalyzer::new(ClusteringConfig::default())
        .cluster(&two_groups())
        .unwrap();
    let newcomer = profile("high", "basic", true, true, false, false);
    let assigned = report.model.assign(&newcomer).unwrap();
    assert_eq!(assigned.cluster_id, 0);
    assert_eq!(report.model.clusters.len(), 2);
}

#[test]
fn test_clustering_is_reproducible() {
    let analyzer = ClusterAnalyzer::new(ClusteringConfig::default());
    let a = analyzer.cluster(&two_groups()).unwrap();
    let b = analyzer.cluster(&two_groups()).unwrap();
    assert_eq!(a.assignments, b.assignments);
    assert_eq!(a.model.centroids, b.model.centroids);
    assert_eq!(a.scores, b.scores);
}

#[test]
fn test_relabel_by_first_appearance() {
    let (labels, order) = relabel_by_first_appearance(&[2, 2, 0, 1, 0]);
    assert_eq!(labels, vec![0, 0, 1, 2, 1]);
    assert_eq!(order, vec![2, 0, 1]);
}
