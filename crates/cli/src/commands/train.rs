//! `shelterctl train`

use adoption_lib::store::ArtifactKind;
use adoption_lib::training::TrainingReport;
use adoption_lib::{train_and_persist, ModelStore, PipelineConfig, PipelineMetrics, Trainer};
use anyhow::{Context, Result};
use std::path::Path;
use tabled::Tabled;

use super::{load_records, logger};
use crate::client::ApiClient;
use crate::output::{format_percent, print_info, print_json, print_success, print_table, print_warning, OutputFormat};

#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "Model")]
    name: String,
    #[tabled(rename = "CV AUC")]
    cv_auc: String,
    #[tabled(rename = "Train Acc")]
    train_accuracy: String,
    #[tabled(rename = "Validation Acc")]
    validation_accuracy: String,
    #[tabled(rename = "Chosen")]
    chosen: String,
}

/// Train on the record export and replace the stored model
///
/// With a server configured, the server is asked to reload afterwards.
pub async fn run(config: &PipelineConfig, server: Option<&ApiClient>, format: OutputFormat) -> Result<()> {
    let records = load_records(config)?;
    let store = ModelStore::new(&config.model_dir)
        .with_context(|| format!("Failed to open model directory {}", config.model_dir.display()))?;
    let trainer = Trainer::new(config.training.clone());
    let metrics = PipelineMetrics::new();
    let logger = logger();

    let outcome = match train_and_persist(&trainer, &store, &records) {
        Ok(outcome) => outcome,
        Err(e) => {
            metrics.inc_training_runs(false);
            logger.log_training_failed(&e.to_string());
            return Err(e).context("Training failed, the stored model was left unchanged");
        }
    };
    metrics.inc_training_runs(true);
    let artifact = store.path_for(ArtifactKind::AdoptionModel);
    logger.log_training(&outcome.report, &artifact.display().to_string());

    match format {
        OutputFormat::Json => print_json(&outcome.report)?,
        OutputFormat::Table => print_report(&outcome.report, &artifact),
    }

    if let Some(client) = server {
        let info = client.reload_model().await.context("Model saved but server reload failed")?;
        if let OutputFormat::Table = format {
            print_success(&format!("Server now serving {}", info.model));
        }
    }
    Ok(())
}

fn print_report(report: &TrainingReport, artifact: &Path) {
    let rows = report
        .candidates
        .iter()
        .map(|c| CandidateRow {
            name: c.name.clone(),
            cv_auc: c.cv_auc_mean.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "n/a".to_string()),
            train_accuracy: format_percent(c.train_accuracy),
            validation_accuracy: format_percent(c.validation_accuracy),
            chosen: if c.name == report.chosen_model { "*".to_string() } else { String::new() },
        })
        .collect();
    print_table(rows);

    print_info(&format!(
        "{} examples ({} skipped, {} unlabeled), split {}/{}/{}",
        report.total_examples,
        report.skipped_records,
        report.unlabeled_records,
        report.train.size,
        report.validation.size,
        report.test.size,
    ));
    print_info(&format!(
        "{} of {} candidate features selected",
        report.selected_features.len(),
        report.candidate_terms,
    ));
    print_info(&format!(
        "Validation accuracy {}, test accuracy {}",
        format_percent(report.validation_accuracy),
        format_percent(report.test_accuracy),
    ));
    if report.overfitting_warning {
        print_warning(&format!(
            "Train/validation gap of {} suggests overfitting",
            format_percent(report.overfitting_gap)
        ));
    }
    print_success(&format!(
        "Saved {}@{} to {}",
        report.chosen_model,
        report.model_version,
        artifact.display()
    ));
}
