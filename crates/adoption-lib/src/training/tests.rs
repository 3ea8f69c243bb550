use super::*;
use crate::features::FeatureExtractor;
use crate::testing::{labeled, shelter_records};
use ndarray::Array2;
use tempfile::TempDir;

fn base_matrix(examples: &[LabeledExample], rows: &[usize]) -> Array2<f64> {
    let extractor = FeatureExtractor::new();
    let n = extractor.schema().len();
    let flat: Vec<f64> = rows
        .iter()
        .flat_map(|i| {
            let e = &examples[*i];
            extractor.extract(&e.animal, e.behavior.as_ref()).unwrap().values
        })
        .collect();
    Array2::from_shape_vec((rows.len(), n), flat).unwrap()
}

#[test]
fn test_end_to_end_on_twenty_animals() {
    let trainer = Trainer::new(TrainingConfig::default());
    let outcome = trainer.train(&labeled(10, 10)).unwrap();
    let report = &outcome.report;

    assert_eq!(report.total_examples, 20);
    assert_eq!(report.skipped_records, 0);
    assert_eq!(report.train.size + report.validation.size + report.test.size, 20);
    assert!(report.validation.size >= 2 && report.test.size >= 2);
    assert_eq!(report.candidates.len(), 2);
    assert!(CandidateKind::ALL.iter().any(|k| k.name() == report.chosen_model));
    assert!(report.validation_accuracy >= 0.75);
    assert!(report.test_accuracy >= 0.75);
    assert!(!report.selected_features.is_empty());
    assert!(report.selected_features.len() <= trainer.selected_feature_budget(report.train.size));

    let model = &outcome.model;
    assert!(model.version.starts_with('v'));
    assert_eq!(model.feature_count(), report.selected_features.len());
    model.validate().unwrap();
}

#[test]
fn test_training_is_reproducible() {
    let trainer = Trainer::new(TrainingConfig::default());
    let examples = labeled(10, 10);
    let a = trainer.train(&examples).unwrap();
    let b = trainer.train(&examples).unwrap();
    assert_eq!(a.split, b.split);
    assert_eq!(a.model.classifier, b.model.classifier);
    assert_eq!(a.model.scaler, b.model.scaler);
    assert_eq!(a.report.candidates, b.report.candidates);
}

#[test]
fn test_scaler_uses_train_partition_only() {
    let examples = labeled(12, 8);
    let outcome = Trainer::new(TrainingConfig::default()).train(&examples).unwrap();
    let model = &outcome.model;

    let train_expanded = expand(&base_matrix(&examples, &outcome.split.train), &model.terms);
    let refit_train = StandardScaler::fit(&train_expanded).unwrap();
    for (a, b) in model.scaler.means.iter().zip(&refit_train.means) {
        assert!((a - b).abs() < 1e-9);
    }

    let test_expanded = expand(&base_matrix(&examples, &outcome.split.test), &model.terms);
    let refit_test = StandardScaler::fit(&test_expanded).unwrap();
    let max_diff = model
        .scaler
        .means
        .iter()
        .zip(&refit_test.means)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    assert!(max_diff > 1e-6);
}

#[test]
fn test_too_few_examples_is_insufficient_data() {
    let err = Trainer::new(TrainingConfig::default())
        .train(&labeled(2, 1))
        .unwrap_err();
    assert!(err.is_insufficient_data());
}

#[test]
fn test_single_class_is_insufficient_data() {
    let err = Trainer::new(TrainingConfig::default())
        .train(&labeled(8, 0))
        .unwrap_err();
    match err {
        PipelineError::InsufficientData { what, .. } => assert_eq!(what, "outcome classes"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_invalid_label_is_rejected() {
    let mut examples = labeled(5, 5);
    examples[0].label = 2;
    let err = Trainer::new(TrainingConfig::default()).train(&examples).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
}

#[test]
fn test_anomalous_records_are_skipped_and_counted() {
    let mut examples = labeled(10, 10);
    examples[0].animal.weight = serde_json::json!(-4.0);
    examples[15].animal.health_severity = serde_json::json!(9);
    let outcome = Trainer::new(TrainingConfig::default()).train(&examples).unwrap();
    assert_eq!(outcome.report.skipped_records, 2);
    assert_eq!(outcome.report.total_examples, 18);
}

#[test]
fn test_mistyped_values_skip_only_their_record() {
    let mut records = shelter_records(10, 10);
    records[2].animal.weight = serde_json::json!("heavy");
    records[14].animal.days_in_care = serde_json::json!("240");
    let outcome = Trainer::new(TrainingConfig::default())
        .train_from_records(&records)
        .unwrap();
    assert_eq!(outcome.report.skipped_records, 1);
    assert_eq!(outcome.report.total_examples, 19);
}

#[test]
fn test_overfitting_gap_is_flagged_without_failing() {
    let config = TrainingConfig {
        overfit_gap_threshold: -1.0,
        ..Default::default()
    };
    let outcome = Trainer::new(config).train(&labeled(10, 10)).unwrap();
    let report = &outcome.report;

    assert!(report.overfitting_warning);
    assert_eq!(report.overfitting_gap, report.train_accuracy - report.validation_accuracy);
    assert_eq!(outcome.model.validation_accuracy, report.validation_accuracy);
    crate::observability::StructuredLogger::new("test").log_training(report, "memory");

    let relaxed = Trainer::new(TrainingConfig::default()).train(&labeled(10, 10)).unwrap();
    assert_eq!(relaxed.report.overfitting_gap, report.overfitting_gap);
    assert_eq!(
        relaxed.report.overfitting_warning,
        relaxed.report.overfitting_gap > OVERFIT_GAP_THRESHOLD
    );
}

#[test]
fn test_unlabeled_records_are_counted() {
    let mut records = shelter_records(10, 10);
    records[3].outcome = None;
    records[12].outcome = None;
    records[12].likely_adoptable = Some(false);
    let outcome = Trainer::new(TrainingConfig::default())
        .train_from_records(&records)
        .unwrap();
    assert_eq!(outcome.report.unlabeled_records, 1);
    assert_eq!(outcome.report.total_examples, 19);
}

#[test]
fn test_base_features_when_engineering_disabled() {
    let config = TrainingConfig {
        engineer_features: false,
        ..Default::default()
    };
    let outcome = Trainer::new(config).train(&labeled(10, 10)).unwrap();
    assert_eq!(outcome.model.feature_count(), outcome.report.base_features);
    assert_eq!(outcome.model.feature_names(), outcome.model.schema.names());
}

#[test]
fn test_feature_budget() {
    let trainer = Trainer::new(TrainingConfig::default());
    assert_eq!(trainer.selected_feature_budget(1), 1);
    assert_eq!(trainer.selected_feature_budget(12), 6);
    assert_eq!(trainer.selected_feature_budget(1000), 24);
}

#[test]
fn test_select_best_prefers_validation_then_cv() {
    let report = |name: &str, val: f64, cv: Option<f64>| CandidateReport {
        name: name.to_string(),
        cv_auc: Vec::new(),
        cv_auc_mean: cv,
        train_accuracy: 1.0,
        validation_accuracy: val,
    };
    assert_eq!(select_best(&[report("a", 0.8, Some(0.9)), report("b", 0.9, None)]), 1);
    assert_eq!(select_best(&[report("a", 0.8, Some(0.7)), report("b", 0.8, Some(0.9))]), 1);
    assert_eq!(select_best(&[report("a", 0.8, Some(0.9)), report("b", 0.8, Some(0.9))]), 0);
}

#[test]
fn test_failed_training_keeps_existing_artifact() {
    let dir = TempDir::new().unwrap();
    let store = ModelStore::new(dir.path()).unwrap();
    let trainer = Trainer::new(TrainingConfig::default());

    let first = train_and_persist(&trainer, &store, &shelter_records(10, 10)).unwrap();
    let path = store.path_for(crate::store::ArtifactKind::AdoptionModel);
    let before = std::fs::read(&path).unwrap();

    let err = train_and_persist(&trainer, &store, &shelter_records(2, 1)).unwrap_err();
    assert!(err.is_insufficient_data());
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(store.load_model(), Some(first.model));
}
