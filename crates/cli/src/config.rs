//! Configuration management for the CLI

use adoption_lib::PipelineConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Per-user config file, read when no path is given explicitly
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join("shelterctl").join("config.toml"))
}

/// Explicit path wins; otherwise the per-user file if it exists
pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|path| path.exists()),
    }
}

/// Load the pipeline configuration, layering `SHELTER__*` variables on top
pub fn load(explicit: Option<&Path>, records_override: Option<&Path>) -> Result<PipelineConfig> {
    let path = resolve_path(explicit);
    let mut config = PipelineConfig::load(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config from environment".to_string(),
    })?;

    if let Some(records) = records_override {
        config.records_path = records.to_path_buf();
    }
    Ok(config)
}
