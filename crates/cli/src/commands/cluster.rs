//! `shelterctl cluster`

use adoption_lib::clustering::KScore;
use adoption_lib::{ClusterAnalyzer, ClusterAssignment, ModelStore, PipelineConfig, PipelineMetrics};
use anyhow::{Context, Result};
use serde::Serialize;
use tabled::Tabled;

use super::{load_records, logger};
use crate::output::{print_info, print_json, print_success, print_table, OutputFormat};

#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "Cluster")]
    id: usize,
    #[tabled(rename = "Animals")]
    size: usize,
    #[tabled(rename = "Profile")]
    label: String,
    #[tabled(rename = "Recommendations")]
    recommendations: String,
}

#[derive(Serialize)]
struct AnimalCluster {
    id: String,
    cluster: usize,
}

#[derive(Serialize)]
struct ClusterSummary<'a> {
    k: usize,
    silhouette: f64,
    scores: &'a [KScore],
    clusters: Vec<&'a ClusterAssignment>,
    animals: Vec<AnimalCluster>,
}

/// Group the behavior profiles of the record export
pub fn run(config: &PipelineConfig, save: bool, verbose: bool, format: OutputFormat) -> Result<()> {
    let (ids, profiles): (Vec<_>, Vec<_>) = load_records(config)?
        .into_iter()
        .filter_map(|r| r.behavior.map(|b| (r.animal.id, b)))
        .unzip();

    let report = ClusterAnalyzer::new(config.clustering.clone())
        .cluster(&profiles)
        .context("Clustering failed")?;
    logger().log_clustering(profiles.len(), report.chosen_k(), report.silhouette());
    PipelineMetrics::new().set_cluster_count(report.chosen_k());

    let saved = if save {
        let store = ModelStore::new(&config.model_dir)
            .with_context(|| format!("Failed to open model directory {}", config.model_dir.display()))?;
        Some(store.save_clusters(&report.model)?)
    } else {
        None
    };

    match format {
        OutputFormat::Json => print_json(&ClusterSummary {
            k: report.chosen_k(),
            silhouette: report.silhouette(),
            scores: &report.scores,
            clusters: report.clusters.values().collect(),
            animals: ids
                .into_iter()
                .zip(&report.assignments)
                .map(|(id, &cluster)| AnimalCluster { id, cluster })
                .collect(),
        })?,
        OutputFormat::Table => {
            let rows = report
                .clusters
                .values()
                .map(|c| ClusterRow {
                    id: c.cluster_id,
                    size: c.size,
                    label: c.label.clone(),
                    recommendations: c.recommendations.join("\n"),
                })
                .collect();
            print_table(rows);
            print_info(&format!(
                "{} profiles in {} clusters, silhouette {:.3}",
                profiles.len(),
                report.chosen_k(),
                report.silhouette()
            ));
            if verbose {
                for score in &report.scores {
                    print_info(&format!("k={} silhouette {:.3}", score.k, score.silhouette));
                }
            }
            if let Some(path) = saved {
                print_success(&format!("Saved cluster model to {}", path.display()));
            }
        }
    }
    Ok(())
}
