//! Human-readable training report

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSummary {
    pub size: usize,
    pub positives: usize,
}

impl PartitionSummary {
    pub fn from_labels(labels: &[u8]) -> Self {
        Self {
            size: labels.len(),
            positives: labels.iter().filter(|l| **l == 1).count(),
        }
    }

    pub fn positive_fraction(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            self.positives as f64 / self.size as f64
        }
    }
}

/// Evaluation of one candidate classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub name: String,
    /// ROC AUC per cross-validation fold on the train partition
    pub cv_auc: Vec<f64>,
    pub cv_auc_mean: Option<f64>,
    pub train_accuracy: f64,
    pub validation_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model_version: String,
    pub total_examples: usize,
    /// Records dropped because feature extraction failed
    pub skipped_records: usize,
    /// Records with neither an outcome nor a likelihood flag
    pub unlabeled_records: usize,
    pub train: PartitionSummary,
    pub validation: PartitionSummary,
    pub test: PartitionSummary,
    pub base_features: usize,
    pub candidate_terms: usize,
    pub selected_features: Vec<String>,
    pub candidates: Vec<CandidateReport>,
    pub chosen_model: String,
    pub train_accuracy: f64,
    pub validation_accuracy: f64,
    pub test_accuracy: f64,
    /// Train accuracy minus validation accuracy of the chosen model
    pub overfitting_gap: f64,
    pub overfitting_warning: bool,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Adoption model training report ({})", self.model_version)?;
        writeln!(
            f,
            "  examples: {} used, {} skipped, {} unlabeled",
            self.total_examples, self.skipped_records, self.unlabeled_records
        )?;
        for (name, part) in [("train", &self.train), ("validation", &self.validation), ("test", &self.test)] {
            writeln!(
                f,
                "  {:<10} {:>5} rows, {:.1}% positive",
                name,
                part.size,
                part.positive_fraction() * 100.0
            )?;
        }
        writeln!(
            f,
            "  features: {} base, {} candidates, {} selected",
            self.base_features,
            self.candidate_terms,
            self.selected_features.len()
        )?;
        for c in &self.candidates {
            let cv = c
                .cv_auc_mean
                .map(|m| format!("{:.3}", m))
                .unwrap_or_else(|| "n/a".to_string());
            writeln!(
                f,
                "  {:<20} cv_auc={} train_acc={:.3} val_acc={:.3}",
                c.name, cv, c.train_accuracy, c.validation_accuracy
            )?;
        }
        writeln!(f, "  chosen: {}", self.chosen_model)?;
        writeln!(
            f,
            "  validation accuracy {:.3}, test accuracy {:.3}, overfitting gap {:.3}{}",
            self.validation_accuracy,
            self.test_accuracy,
            self.overfitting_gap,
            if self.overfitting_warning { " (WARNING)" } else { "" }
        )
    }
}
