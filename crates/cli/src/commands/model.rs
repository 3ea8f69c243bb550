//! `shelterctl model`

use adoption_lib::{ModelInfo, ModelStore, PipelineConfig, PredictionService};
use anyhow::{Context, Result};

use crate::client::ApiClient;
use crate::output::{format_percent, print_info, print_json, print_warning, OutputFormat};

/// Describe the model a local prediction would use
pub fn describe_local(config: &PipelineConfig) -> Result<ModelInfo> {
    let store = ModelStore::new(&config.model_dir)
        .with_context(|| format!("Failed to open model directory {}", config.model_dir.display()))?;
    Ok(PredictionService::new(&store, config.prediction.clone()).describe())
}

pub async fn run(config: &PipelineConfig, server: Option<&ApiClient>, format: OutputFormat) -> Result<()> {
    let info = match server {
        Some(client) => client.model_info().await?,
        None => describe_local(config)?,
    };

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table if info.fallback => {
            print_warning(&format!(
                "No usable model, predictions fall back: {}",
                info.reason.as_deref().unwrap_or("unknown reason")
            ));
        }
        OutputFormat::Table => {
            print_info(&format!("Model: {}", info.model));
            if let Some(trained_at) = &info.trained_at {
                print_info(&format!("Trained: {}", trained_at));
            }
            if let (Some(validation), Some(test)) = (info.validation_accuracy, info.test_accuracy) {
                print_info(&format!(
                    "Accuracy: validation {}, test {}",
                    format_percent(validation),
                    format_percent(test)
                ));
            }
            if let Some(features) = &info.features {
                print_info(&format!("Features ({}): {}", features.len(), features.join(", ")));
            }
        }
    }
    Ok(())
}
