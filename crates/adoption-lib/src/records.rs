//! Access to the external shelter record store
//!
//! The pipeline only reads records. A JSON file (array or one record per
//! line) stands in for the shelter database, and an in-memory store serves
//! tests and embedding.

use crate::error::{PipelineError, Result};
use crate::models::{BehaviorProfile, ShelterRecord};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Read-only source of shelter records
pub trait RecordStore: Send + Sync {
    fn records(&self) -> Result<Vec<ShelterRecord>>;

    /// One record suitable for an end-to-end diagnostic
    fn sample(&self) -> Result<Option<ShelterRecord>> {
        Ok(self.records()?.into_iter().next())
    }

    /// Behavior profiles of every record that has one
    fn behavior_profiles(&self) -> Result<Vec<BehaviorProfile>> {
        Ok(self
            .records()?
            .into_iter()
            .filter_map(|r| r.behavior)
            .collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    records: Vec<ShelterRecord>,
}

impl InMemoryRecordStore {
    pub fn new(records: Vec<ShelterRecord>) -> Self {
        Self { records }
    }
}

impl RecordStore for InMemoryRecordStore {
    fn records(&self) -> Result<Vec<ShelterRecord>> {
        Ok(self.records.clone())
    }
}

/// Records stored as a JSON array or as JSON lines
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    path: PathBuf,
}

impl JsonRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonRecordStore {
    fn records(&self) -> Result<Vec<ShelterRecord>> {
        let text = fs::read_to_string(&self.path)?;
        let records = parse_records(&text)?;
        debug!(path = %self.path.display(), count = records.len(), "Read shelter records");
        Ok(records)
    }
}

/// Parse a JSON array, or fall back to one JSON object per non-empty line
///
/// Entries that fail to parse are skipped with a warning so one bad export
/// row does not hide the rest of the file. Only a file with nothing readable
/// is an error.
pub fn parse_records(text: &str) -> Result<Vec<ShelterRecord>> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    let mut skipped = 0;
    if trimmed.starts_with('[') {
        let entries: Vec<Value> = serde_json::from_str(trimmed)?;
        for (n, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<ShelterRecord>(entry) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(index = n, error = %e, "Skipping unreadable record entry");
                    skipped += 1;
                }
            }
        }
    } else {
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ShelterRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(line = n + 1, error = %e, "Skipping unreadable record line");
                    skipped += 1;
                }
            }
        }
    }

    if skipped > 0 {
        if records.is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "no readable records, {} malformed entries",
                skipped
            )));
        }
        warn!(skipped, kept = records.len(), "Skipped malformed records");
    }
    Ok(records)
}
