//! Training pipeline: batch refit of the churn classifier or the CLTV
//! regressor from a snapshot of customer records.
//!
//! Steps, in order:
//!   1. Extract the feature matrix.
//!   2. Generate targets through the configured LabelStrategy.
//!   3. Seeded shuffle, then split train/test.
//!   4. Fit a fresh scaler on the training partition.
//!   5. Fit the forest on the scaled training partition.
//!   6. Evaluate on the held-out partition (accuracy or MSE).
//!
//! Persisting and installing the result is the service's job, so a
//! failed fit never disturbs the artifacts already in use.

use crate::{
    config::AnalyticsConfig,
    customer::CustomerRecord,
    error::{AnalyticsError, AnalyticsResult},
    features::{FeatureExtractor, FEATURE_COUNT},
    forest::{ForestTask, RandomForest},
    labels::LabelStrategy,
    model_store::{ArtifactMetadata, EvaluationMetric, ModelArtifact},
    rng::{RngBank, StreamRng, StreamSlot},
    scaler::StandardScaler,
    types::ModelKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smallest batch that leaves one row on each side of the split.
pub const MIN_TRAINING_CUSTOMERS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    #[serde(flatten)]
    pub metric:           EvaluationMetric,
    pub features_used:    Vec<String>,
    pub training_samples: usize,
    pub test_samples:     usize,
    pub model_id:         Uuid,
    pub label_strategy:   String,
}

/// A freshly fit model and its scaler, not yet persisted.
#[derive(Debug, Clone)]
pub struct TrainedBundle {
    pub artifact: ModelArtifact,
    pub scaler:   StandardScaler,
}

impl TrainedBundle {
    pub fn report(&self) -> TrainingReport {
        let meta = &self.artifact.metadata;
        TrainingReport {
            metric:           meta.metric,
            features_used:    meta.feature_names.clone(),
            training_samples: meta.training_samples,
            test_samples:     meta.test_samples,
            model_id:         meta.artifact_id,
            label_strategy:   meta.label_strategy.clone(),
        }
    }
}

pub struct TrainingPipeline<'a> {
    config:    &'a AnalyticsConfig,
    labels:    &'a dyn LabelStrategy,
    extractor: FeatureExtractor,
}

impl<'a> TrainingPipeline<'a> {
    pub fn new(
        config: &'a AnalyticsConfig,
        labels: &'a dyn LabelStrategy,
        extractor: FeatureExtractor,
    ) -> Self {
        Self { config, labels, extractor }
    }

    pub fn fit(&self, kind: ModelKind, customers: &[CustomerRecord]) -> AnalyticsResult<TrainedBundle> {
        if customers.len() < MIN_TRAINING_CUSTOMERS {
            return Err(AnalyticsError::InsufficientData {
                available: customers.len(),
                required:  MIN_TRAINING_CUSTOMERS,
            });
        }

        let matrix = self.extractor.extract_batch(customers);
        let bank = RngBank::new(self.config.seed);

        let (task, targets) = match kind {
            ModelKind::Churn => {
                let mut rng = bank.for_stream(StreamSlot::ChurnLabels);
                let labels = self.labels.churn_labels(customers, &matrix, &mut rng)?;
                let targets = labels.iter().map(|&y| if y { 1.0 } else { 0.0 }).collect::<Vec<_>>();
                (ForestTask::Classification, targets)
            }
            ModelKind::Cltv => {
                let mut rng = bank.for_stream(StreamSlot::CltvLabels);
                (ForestTask::Regression, self.labels.cltv_labels(customers, &matrix, &mut rng)?)
            }
        };
        if targets.len() != matrix.len() {
            return Err(AnalyticsError::Fit(format!(
                "label strategy '{}' produced {} labels for {} customers",
                self.labels.name(),
                targets.len(),
                matrix.len()
            )));
        }

        let (train_idx, test_idx) = train_test_split(
            matrix.len(),
            self.config.test_fraction,
            &mut bank.for_stream(StreamSlot::Split),
        )?;
        let pick_rows = |idx: &[usize]| idx.iter().map(|&i| matrix.rows[i]).collect::<Vec<[f64; FEATURE_COUNT]>>();
        let pick_targets = |idx: &[usize]| idx.iter().map(|&i| targets[i]).collect::<Vec<f64>>();

        let train_rows = pick_rows(&train_idx);
        let test_rows = pick_rows(&test_idx);
        let train_y = pick_targets(&train_idx);
        let test_y = pick_targets(&test_idx);

        let scaler = StandardScaler::fit(&train_rows)?;
        let train_scaled = scaler.transform(&train_rows)?;
        let test_scaled = scaler.transform(&test_rows)?;

        let forest = RandomForest::fit(&train_scaled, &train_y, task, &self.config.forest, &bank)?;

        let metric = match task {
            ForestTask::Classification => {
                let predicted: Vec<bool> = test_scaled.iter().map(|r| forest.predict_positive(r)).collect();
                let truth: Vec<bool> = test_y.iter().map(|&y| y > 0.5).collect();
                EvaluationMetric::Accuracy(accuracy(&predicted, &truth))
            }
            ForestTask::Regression => {
                let predicted: Vec<f64> = test_scaled.iter().map(|r| forest.predict(r)).collect();
                EvaluationMetric::Mse(mean_squared_error(&predicted, &test_y))
            }
        };

        let artifact_id = Uuid::new_v4();
        let scaler = StandardScaler { model_id: Some(artifact_id), ..scaler };

        log::info!(
            "{} model trained: train={} test={} metric={:?} labels={}",
            kind.name(),
            train_idx.len(),
            test_idx.len(),
            metric,
            self.labels.name(),
        );

        Ok(TrainedBundle {
            artifact: ModelArtifact {
                metadata: ArtifactMetadata {
                    artifact_id,
                    kind,
                    trained_at:       self.extractor.as_of(),
                    feature_names:    matrix.feature_names(),
                    label_strategy:   self.labels.name().to_string(),
                    training_samples: train_idx.len(),
                    test_samples:     test_idx.len(),
                    metric,
                },
                forest,
            },
            scaler,
        })
    }
}

/// Seeded shuffle, then the first `n - ceil(n * test_fraction)` indices
/// train and the rest test. Both partitions must be non-empty.
pub fn train_test_split(
    n: usize,
    test_fraction: f64,
    rng: &mut StreamRng,
) -> AnalyticsResult<(Vec<usize>, Vec<usize>)> {
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(AnalyticsError::InsufficientData {
            available: n,
            required:  MIN_TRAINING_CUSTOMERS,
        });
    }

    let mut order: Vec<usize> = (0..n).collect();
    rng.shuffle(&mut order);
    let test = order.split_off(n_train);
    Ok((order, test))
}

pub fn accuracy(predicted: &[bool], truth: &[bool]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
    hits as f64 / truth.len() as f64
}

pub fn mean_squared_error(predicted: &[f64], truth: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    predicted
        .iter()
        .zip(truth)
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / truth.len() as f64
}
