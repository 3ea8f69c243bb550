//! `shelterctl predict`

use adoption_lib::{ModelStore, PipelineConfig, PredictionRequest, PredictionResult, PredictionService};
use anyhow::{bail, Context, Result};
use std::path::Path;
use tabled::Tabled;

use super::{load_records, logger};
use crate::client::ApiClient;
use crate::output::{color_confidence, color_probability, print_info, print_json, print_table, print_warning, OutputFormat};

#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Animal")]
    id: String,
    #[tabled(rename = "Adoption Likelihood")]
    probability: String,
    #[tabled(rename = "Outlook")]
    outlook: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Model")]
    model: String,
}

/// Read a request from a JSON file
///
/// A full shelter record also parses, its outcome fields are ignored.
pub fn read_request(path: &Path) -> Result<PredictionRequest> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a prediction request", path.display()))
}

/// Build a request from the record with the given animal id
pub fn request_for_id(config: &PipelineConfig, id: &str) -> Result<PredictionRequest> {
    let record = load_records(config)?
        .into_iter()
        .find(|r| r.animal.id == id)
        .with_context(|| format!("No record with animal id {}", id))?;
    Ok(PredictionRequest {
        animal: record.animal,
        behavior: record.behavior,
    })
}

pub async fn run(
    config: &PipelineConfig,
    server: Option<&ApiClient>,
    file: Option<&Path>,
    id: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let request = match (file, id) {
        (Some(path), _) => read_request(path)?,
        (None, Some(id)) => request_for_id(config, id)?,
        (None, None) => bail!("Either --file or --id is required"),
    };

    let result = match server {
        Some(client) => client.predict(&request).await?,
        None => predict_locally(config, &request)?,
    };
    logger().log_prediction(&request.animal.id, &result);

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_table(vec![PredictionRow {
                id: request.animal.id.clone(),
                probability: color_probability(result.probability),
                outlook: if result.class == 1 { "likely" } else { "unlikely" }.to_string(),
                confidence: color_confidence(result.confidence),
                model: result.model.clone(),
            }]);
            if let Some(reason) = &result.fallback_reason {
                print_warning(&format!("Fallback answer: {}", reason));
            }
            if server.is_none() {
                print_behavior_group(config, &request);
            }
        }
    }
    Ok(())
}

fn predict_locally(config: &PipelineConfig, request: &PredictionRequest) -> Result<PredictionResult> {
    let store = ModelStore::new(&config.model_dir)
        .with_context(|| format!("Failed to open model directory {}", config.model_dir.display()))?;
    let service = PredictionService::new(&store, config.prediction.clone());
    Ok(service.predict_request(request))
}

/// Show the saved behavior cluster this animal falls into, if any
fn print_behavior_group(config: &PipelineConfig, request: &PredictionRequest) {
    let Some(behavior) = &request.behavior else {
        return;
    };
    let Some(clusters) = ModelStore::new(&config.model_dir).ok().and_then(|s| s.load_clusters()) else {
        return;
    };
    match clusters.assign(behavior) {
        Ok(group) => {
            print_info(&format!("Behavior group {}: {}", group.cluster_id, group.label));
            for recommendation in &group.recommendations {
                println!("  - {}", recommendation);
            }
        }
        Err(e) => print_warning(&format!("Could not place behavior profile: {}", e)),
    }
}
