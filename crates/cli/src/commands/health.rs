//! `shelterctl health`

use adoption_lib::{DiagnosticsReport, DiagnosticsReporter, JsonRecordStore, ModelStore, PipelineConfig};
use anyhow::{Context, Result};
use std::sync::Arc;
use tabled::Tabled;

use super::logger;
use crate::client::ApiClient;
use crate::output::{color_status, print_error, print_json, print_success, print_table, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Run the end-to-end diagnostic, returning whether it passed
pub async fn run(config: &PipelineConfig, server: Option<&ApiClient>, format: OutputFormat) -> Result<bool> {
    let report = match server {
        Some(client) => client.diagnostics().await?,
        None => {
            let store = ModelStore::new(&config.model_dir)
                .with_context(|| format!("Failed to open model directory {}", config.model_dir.display()))?;
            let records = Arc::new(JsonRecordStore::new(&config.records_path));
            let report =
                DiagnosticsReporter::new(store, records, config.prediction.clone(), config.health.clone()).run_check();
            logger().log_health_check(
                report.status.as_str(),
                report.passed,
                report.latency_ms,
                report.detail.as_deref().unwrap_or(""),
            );
            report
        }
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }
    Ok(report.passed)
}

fn print_report(report: &DiagnosticsReport) {
    let rows = report
        .components
        .iter()
        .map(|(name, health)| ComponentRow {
            name: name.clone(),
            status: color_status(health.status),
            message: health.message.clone().unwrap_or_default(),
        })
        .collect();
    print_table(rows);

    let summary = format!(
        "{} answered in {:.2}ms ({})",
        report.model,
        report.latency_ms,
        report.status.as_str()
    );
    if report.passed {
        print_success(&summary);
    } else {
        print_error(&summary);
    }
}
