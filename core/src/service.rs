//! The analytics service, the one object callers hold.
//!
//! Constructed once at process start with `AnalyticsService::open` and
//! shared by reference (or `Arc`). No module-level state.
//!
//! CONCURRENCY:
//!   - Predictions take a read lock only long enough to clone the Arc
//!     handles of the model and scaler, then score without any lock.
//!   - Training of one kind is serialized by that kind's mutex. The fit
//!     runs unlocked; the write lock is held only to persist the new
//!     files and swap the handles, so readers see either the old pair
//!     or the new pair, never a mix.

use crate::{
    config::AnalyticsConfig,
    customer::CustomerRecord,
    error::{AnalyticsError, AnalyticsResult},
    features::{FeatureExtractor, FeatureMatrix, FeatureVector},
    labels::{self, LabelStrategy},
    model_store::{ModelArtifact, ModelStore},
    outcome::Outcome,
    policy::{self, Recommendation, SegmentReport},
    prediction::{self, ChurnPrediction, CltvPrediction},
    scaler::StandardScaler,
    training::{TrainingPipeline, TrainingReport},
    types::{CustomerId, ModelKind},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInsights {
    pub customer_id:  Option<CustomerId>,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub churn_analysis: Option<ChurnPrediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cltv_analysis:  Option<CltvPrediction>,
    pub health_score:    u8,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub churn_model:      bool,
    pub cltv_model:       bool,
    pub churn_scaler:     bool,
    pub cltv_scaler:      bool,
    pub churn_model_id:   Option<Uuid>,
    pub cltv_model_id:    Option<Uuid>,
    pub models_directory: String,
    pub timestamp:        DateTime<Utc>,
}

pub struct AnalyticsService {
    config:         AnalyticsConfig,
    labels:         Box<dyn LabelStrategy>,
    models:         RwLock<ModelStore>,
    churn_training: Mutex<()>,
    cltv_training:  Mutex<()>,
    as_of:          Option<DateTime<Utc>>,
}

impl AnalyticsService {
    /// Restore whatever artifacts exist under `config.models_dir`.
    pub fn open(config: AnalyticsConfig) -> AnalyticsResult<Self> {
        let store = ModelStore::load(&config.models_dir)?;
        Ok(Self::with_store(config, store))
    }

    /// Build around an already-loaded store.
    pub fn with_store(config: AnalyticsConfig, store: ModelStore) -> Self {
        let labels = labels::from_config(&config.labels);
        log::info!(
            "analytics service ready: models_dir={} labels={}",
            store.dir().display(),
            labels.name(),
        );
        Self {
            config,
            labels,
            models: RwLock::new(store),
            churn_training: Mutex::new(()),
            cltv_training: Mutex::new(()),
            as_of: None,
        }
    }

    /// Swap in a different label source (e.g. historical outcomes).
    pub fn with_label_strategy(mut self, labels: Box<dyn LabelStrategy>) -> Self {
        self.labels = labels;
        self
    }

    /// Pin "now" for account-age derivation. Unpinned services use the
    /// wall clock at each call.
    pub fn with_reference_time(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn extractor(&self) -> FeatureExtractor {
        match self.as_of {
            Some(ts) => FeatureExtractor::new(ts),
            None     => FeatureExtractor::now(),
        }
    }

    pub fn extract_features(&self, customer: &CustomerRecord) -> FeatureVector {
        self.extractor().extract(customer)
    }

    pub fn prepare_features(&self, customers: &[CustomerRecord]) -> FeatureMatrix {
        self.extractor().extract_batch(customers)
    }

    // ── Training ────────────────────────────────────────────────

    pub fn train_churn_model(&self, customers: &[CustomerRecord]) -> Outcome<TrainingReport> {
        self.train(ModelKind::Churn, customers)
    }

    pub fn train_cltv_model(&self, customers: &[CustomerRecord]) -> Outcome<TrainingReport> {
        self.train(ModelKind::Cltv, customers)
    }

    pub fn train(&self, kind: ModelKind, customers: &[CustomerRecord]) -> Outcome<TrainingReport> {
        Outcome::from_result(
            &format!("training {} model", kind.name()),
            self.try_train(kind, customers),
        )
    }

    fn try_train(&self, kind: ModelKind, customers: &[CustomerRecord]) -> AnalyticsResult<TrainingReport> {
        let lock = match kind {
            ModelKind::Churn => &self.churn_training,
            ModelKind::Cltv  => &self.cltv_training,
        };
        let _serialized = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let bundle = TrainingPipeline::new(&self.config, self.labels.as_ref(), self.extractor())
            .fit(kind, customers)?;
        let report = bundle.report();

        let mut store = self.write_models();
        store.persist(kind, &bundle.artifact, &bundle.scaler)?;
        store.install(kind, bundle.artifact, bundle.scaler);
        Ok(report)
    }

    // ── Prediction ──────────────────────────────────────────────

    fn trained(&self, kind: ModelKind) -> AnalyticsResult<(Arc<ModelArtifact>, Arc<StandardScaler>)> {
        self.read_models()
            .trained(kind)
            .ok_or(AnalyticsError::NotTrained { kind })
    }

    pub fn predict_churn(&self, customer: &CustomerRecord) -> Outcome<ChurnPrediction> {
        let result = self.trained(ModelKind::Churn).and_then(|(model, scaler)| {
            prediction::predict_churn(&model, &scaler, &self.extract_features(customer))
        });
        Outcome::from_result("churn prediction", result)
    }

    pub fn predict_cltv(&self, customer: &CustomerRecord) -> Outcome<CltvPrediction> {
        let result = self.trained(ModelKind::Cltv).and_then(|(model, scaler)| {
            prediction::predict_cltv(&model, &scaler, &self.extract_features(customer))
        });
        Outcome::from_result("CLTV prediction", result)
    }

    // ── Scoring & recommendations ───────────────────────────────

    pub fn calculate_health_score(&self, customer: &CustomerRecord) -> u8 {
        policy::health_score(&self.extract_features(customer))
    }

    pub fn generate_recommendations(
        &self,
        customer: &CustomerRecord,
        churn: &Outcome<ChurnPrediction>,
        cltv: &Outcome<CltvPrediction>,
    ) -> Vec<Recommendation> {
        policy::generate_recommendations(&self.extract_features(customer), churn.success(), cltv.success())
    }

    pub fn get_customer_insights(&self, customer_id: Option<CustomerId>, customer: &CustomerRecord) -> CustomerInsights {
        let churn = self.predict_churn(customer);
        let cltv = self.predict_cltv(customer);
        let features = self.extract_features(customer);

        CustomerInsights {
            customer_id: customer_id.or(customer.id),
            generated_at: Utc::now(),
            health_score: policy::health_score(&features),
            recommendations: policy::generate_recommendations(&features, churn.success(), cltv.success()),
            churn_analysis: churn.into_success(),
            cltv_analysis: cltv.into_success(),
        }
    }

    pub fn analyze_customer_segments(&self, customers: &[CustomerRecord]) -> SegmentReport {
        policy::segment_customers(customers, &self.extractor())
    }

    // ── Store management ────────────────────────────────────────

    pub fn model_status(&self) -> ModelStatus {
        let store = self.read_models();
        let churn = store.slot(ModelKind::Churn);
        let cltv = store.slot(ModelKind::Cltv);
        ModelStatus {
            churn_model:      churn.model.is_some(),
            cltv_model:       cltv.model.is_some(),
            churn_scaler:     churn.scaler.is_some(),
            cltv_scaler:      cltv.scaler.is_some(),
            churn_model_id:   churn.model.as_ref().map(|m| m.metadata.artifact_id),
            cltv_model_id:    cltv.model.as_ref().map(|m| m.metadata.artifact_id),
            models_directory: store.dir().display().to_string(),
            timestamp:        Utc::now(),
        }
    }

    pub fn save_models(&self) -> AnalyticsResult<()> {
        self.read_models().save()
    }

    /// Re-read the models directory and swap the loaded handles.
    pub fn reload_models(&self) -> AnalyticsResult<()> {
        let fresh = ModelStore::load(&self.config.models_dir)?;
        *self.write_models() = fresh;
        Ok(())
    }

    // Poisoning is ignored: slots are only ever replaced wholesale.
    fn read_models(&self) -> RwLockReadGuard<'_, ModelStore> {
        self.models.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_models(&self) -> RwLockWriteGuard<'_, ModelStore> {
        self.models.write().unwrap_or_else(PoisonError::into_inner)
    }
}
