//! Subcommand implementations
//!
//! Commands run against local artifacts by default. `predict`, `health`
//! and `model` talk to a running server instead when one is configured.

pub mod cluster;
pub mod health;
pub mod model;
pub mod predict;
pub mod train;

use adoption_lib::{JsonRecordStore, PipelineConfig, RecordStore, ShelterRecord, StructuredLogger};
use anyhow::{Context, Result};

/// Instance name attached to structured log events from the CLI
pub const INSTANCE: &str = "shelterctl";

pub fn logger() -> StructuredLogger {
    StructuredLogger::new(INSTANCE)
}

/// Read every record from the configured export
pub fn load_records(config: &PipelineConfig) -> Result<Vec<ShelterRecord>> {
    JsonRecordStore::new(&config.records_path)
        .records()
        .with_context(|| format!("Failed to read records from {}", config.records_path.display()))
}
