//! Offline training of the adoption-likelihood model
//!
//! Pipeline: extract features, stratified 60/20/20 split, optional
//! polynomial expansion with top-k selection on the train partition, scaler
//! fitted on the train partition, then two regularized candidates compared
//! by cross-validated AUC and validation accuracy. The test partition is
//! scored once, after the winner is fixed.

pub mod classifier;
mod engineering;
mod metrics;
mod model;
mod report;
mod split;

#[cfg(test)]
mod tests;

pub use classifier::{CandidateKind, Classifier, ForestParams, LogisticParams};
pub use engineering::{candidate_terms, expand, expand_row, f_scores, select_terms, FeatureTerm};
pub use metrics::{accuracy, roc_auc};
pub use model::TrainedModel;
pub use report::{CandidateReport, PartitionSummary, TrainingReport};
pub use split::{stratified_folds, stratified_split, SplitIndices};

use crate::error::{PipelineError, Result};
use crate::features::FeatureExtractor;
use crate::models::{LabeledExample, ShelterRecord};
use crate::preprocessing::StandardScaler;
use crate::store::ModelStore;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Fewest labeled examples a model is trained on
pub const MIN_TRAINING_EXAMPLES: usize = 5;

/// Train/validation accuracy gap above which the report flags overfitting
pub const OVERFIT_GAP_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub min_examples: usize,
    pub validation_fraction: f64,
    pub test_fraction: f64,
    /// Upper bound on cross-validation folds
    pub cv_folds: usize,
    /// Add squared and interaction terms before selection
    pub engineer_features: bool,
    /// Hard cap on model inputs after selection
    pub max_selected_features: usize,
    /// Train rows required per selected feature
    pub samples_per_feature: usize,
    pub overfit_gap_threshold: f64,
    pub decision_threshold: f64,
    pub seed: u64,
    pub forest: ForestParams,
    pub logistic: LogisticParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_examples: MIN_TRAINING_EXAMPLES,
            validation_fraction: 0.2,
            test_fraction: 0.2,
            cv_folds: 5,
            engineer_features: true,
            max_selected_features: 24,
            samples_per_feature: 2,
            overfit_gap_threshold: OVERFIT_GAP_THRESHOLD,
            decision_threshold: 0.5,
            seed: 42,
            forest: ForestParams::default(),
            logistic: LogisticParams::default(),
        }
    }
}

/// Result of a successful training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub report: TrainingReport,
    /// Row indices (into the usable examples) of each partition
    pub split: SplitIndices,
}

struct Partition {
    x: Array2<f64>,
    y: Vec<u8>,
}

impl Partition {
    fn take(x: &Array2<f64>, y: &[u8], rows: &[usize]) -> Self {
        Self {
            x: x.select(Axis(0), rows),
            y: rows.iter().map(|i| y[*i]).collect(),
        }
    }
}

/// Trains and selects the adoption model
pub struct Trainer {
    config: TrainingConfig,
    extractor: FeatureExtractor,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            extractor: FeatureExtractor::new(),
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train from raw store records, skipping those without a label
    pub fn train_from_records(&self, records: &[ShelterRecord]) -> Result<TrainingOutcome> {
        let examples: Vec<LabeledExample> = records.iter().filter_map(|r| r.to_labeled()).collect();
        let unlabeled = records.len() - examples.len();
        if unlabeled > 0 {
            debug!(unlabeled, "Ignoring records without an outcome");
        }
        let mut outcome = self.train(&examples)?;
        outcome.report.unlabeled_records = unlabeled;
        Ok(outcome)
    }

    pub fn train(&self, examples: &[LabeledExample]) -> Result<TrainingOutcome> {
        let min = self.config.min_examples.max(1);
        if examples.len() < min {
            return Err(PipelineError::insufficient("labeled examples", min, examples.len()));
        }
        if let Some(bad) = examples.iter().find(|e| e.label > 1) {
            return Err(PipelineError::InvalidInput(format!(
                "record {} has label {}, expected 0 or 1",
                bad.animal.id, bad.label
            )));
        }

        let (rows, skipped) = self.extractor.extract_labeled(examples);
        if skipped > 0 {
            warn!(skipped, "Skipped records with malformed fields");
        }
        if rows.len() < min {
            return Err(PipelineError::insufficient("usable labeled examples", min, rows.len()));
        }

        let n_base = self.extractor.schema().len();
        let y: Vec<u8> = rows.iter().map(|(_, label)| *label).collect();
        let positives = y.iter().filter(|l| **l == 1).count();
        if positives == 0 || positives == y.len() {
            return Err(PipelineError::insufficient("outcome classes", 2, 1));
        }
        let flat: Vec<f64> = rows.iter().flat_map(|(v, _)| v.values.iter().copied()).collect();
        let x = Array2::from_shape_vec((rows.len(), n_base), flat)
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;

        let split = stratified_split(
            &y,
            self.config.validation_fraction,
            self.config.test_fraction,
            self.config.seed,
        );
        let train = Partition::take(&x, &y, &split.train);
        let validation = Partition::take(&x, &y, &split.validation);
        let test = Partition::take(&x, &y, &split.test);

        info!(
            total = rows.len(),
            train = train.y.len(),
            validation = validation.y.len(),
            test = test.y.len(),
            "Split labeled examples"
        );

        // Term selection and scaling only ever see the train partition
        let candidates = candidate_terms(n_base, self.config.engineer_features);
        let terms = if self.config.engineer_features {
            let k = self.selected_feature_budget(train.y.len());
            select_terms(&train.x, &train.y, &candidates, k)
        } else {
            candidates.clone()
        };

        let train_raw = expand(&train.x, &terms);
        let scaler = StandardScaler::fit(&train_raw)?;
        let x_train = scaler.transform(&train_raw);
        let x_val = scaler.transform(&expand(&validation.x, &terms));

        let mut reports = Vec::with_capacity(CandidateKind::ALL.len());
        let mut fitted = Vec::with_capacity(CandidateKind::ALL.len());
        for kind in CandidateKind::ALL {
            let cv_auc = self.cross_validate(kind, &x_train, &train.y)?;
            let model = self.fit_candidate(kind, &x_train, &train.y)?;
            let threshold = self.config.decision_threshold;
            let report = CandidateReport {
                name: kind.name().to_string(),
                cv_auc_mean: metrics::mean(&cv_auc),
                cv_auc,
                train_accuracy: accuracy(&train.y, &model.predict_proba(&x_train), threshold),
                validation_accuracy: accuracy(&validation.y, &model.predict_proba(&x_val), threshold),
            };
            debug!(
                candidate = %report.name,
                cv_auc = ?report.cv_auc_mean,
                train_accuracy = report.train_accuracy,
                validation_accuracy = report.validation_accuracy,
                "Evaluated candidate"
            );
            reports.push(report);
            fitted.push(model);
        }

        let best = select_best(&reports);
        let chosen = fitted.swap_remove(best);
        let chosen_report = reports[best].clone();

        let overfitting_gap = chosen_report.train_accuracy - chosen_report.validation_accuracy;
        let overfitting_warning = overfitting_gap > self.config.overfit_gap_threshold;
        if overfitting_warning {
            warn!(
                model = %chosen_report.name,
                gap = overfitting_gap,
                threshold = self.config.overfit_gap_threshold,
                "Train/validation accuracy gap suggests overfitting"
            );
        }

        // Selection is frozen, the test partition is scored exactly once
        let x_test = scaler.transform(&expand(&test.x, &terms));
        let test_accuracy = accuracy(&test.y, &chosen.predict_proba(&x_test), self.config.decision_threshold);

        let now = chrono::Utc::now();
        let model = TrainedModel {
            name: chosen.name().to_string(),
            version: format!("v{}", now.format("%Y%m%d%H%M%S")),
            schema: self.extractor.schema().clone(),
            terms,
            scaler,
            classifier: chosen,
            validation_accuracy: chosen_report.validation_accuracy,
            test_accuracy,
            trained_at: now.timestamp(),
        };

        let report = TrainingReport {
            model_version: model.version.clone(),
            total_examples: rows.len(),
            skipped_records: skipped,
            unlabeled_records: 0,
            train: PartitionSummary::from_labels(&train.y),
            validation: PartitionSummary::from_labels(&validation.y),
            test: PartitionSummary::from_labels(&test.y),
            base_features: n_base,
            candidate_terms: candidates.len(),
            selected_features: model.feature_names(),
            candidates: reports,
            chosen_model: model.name.clone(),
            train_accuracy: chosen_report.train_accuracy,
            validation_accuracy: chosen_report.validation_accuracy,
            test_accuracy,
            overfitting_gap,
            overfitting_warning,
        };

        info!(
            model = %model.identifier(),
            features = model.feature_count(),
            validation_accuracy = report.validation_accuracy,
            test_accuracy = report.test_accuracy,
            "Training completed"
        );

        Ok(TrainingOutcome { model, report, split })
    }

    /// Number of terms kept after selection for `n_train` rows
    pub fn selected_feature_budget(&self, n_train: usize) -> usize {
        let per_feature = self.config.samples_per_feature.max(1);
        (n_train / per_feature).max(1).min(self.config.max_selected_features.max(1))
    }

    fn fit_candidate(&self, kind: CandidateKind, x: &Array2<f64>, y: &[u8]) -> Result<Classifier> {
        kind.fit(x, y, &self.config.forest, &self.config.logistic, self.config.seed)
    }

    /// Stratified k-fold ROC AUC on the (already scaled) train partition
    ///
    /// Folds whose held-out part has a single class are skipped. Returns an
    /// empty list when the minority class is too small for two folds.
    fn cross_validate(&self, kind: CandidateKind, x: &Array2<f64>, y: &[u8]) -> Result<Vec<f64>> {
        let positives = y.iter().filter(|l| **l == 1).count();
        let minority = positives.min(y.len() - positives);
        let k = self.config.cv_folds.min(minority);
        if k < 2 {
            return Ok(Vec::new());
        }

        let folds = stratified_folds(y, k);
        let mut scores = Vec::with_capacity(k);
        for fold in 0..k {
            let (held_out, kept): (Vec<usize>, Vec<usize>) = (0..y.len()).partition(|i| folds[*i] == fold);
            let fit_part = Partition::take(x, y, &kept);
            let eval_part = Partition::take(x, y, &held_out);
            let model = self.fit_candidate(kind, &fit_part.x, &fit_part.y)?;
            if let Some(auc) = roc_auc(&eval_part.y, &model.predict_proba(&eval_part.x)) {
                scores.push(auc);
            }
        }
        Ok(scores)
    }
}

/// Highest validation accuracy, then highest mean CV AUC, then earliest
fn select_best(reports: &[CandidateReport]) -> usize {
    let mut best = 0;
    for (i, r) in reports.iter().enumerate().skip(1) {
        let current = &reports[best];
        let cv = r.cv_auc_mean.unwrap_or(f64::NEG_INFINITY);
        let best_cv = current.cv_auc_mean.unwrap_or(f64::NEG_INFINITY);
        if r.validation_accuracy > current.validation_accuracy
            || (r.validation_accuracy == current.validation_accuracy && cv > best_cv)
        {
            best = i;
        }
    }
    best
}

/// Train from store records and persist the result
///
/// Nothing is written unless training succeeds, so a failed run leaves the
/// previous artifact in place.
pub fn train_and_persist(
    trainer: &Trainer,
    store: &ModelStore,
    records: &[ShelterRecord],
) -> Result<TrainingOutcome> {
    let outcome = trainer.train_from_records(records)?;
    store.save_model(&outcome.model)?;
    Ok(outcome)
}
