//! Training targets.
//!
//! The billing data carries no ground truth for churn or lifetime value,
//! so targets come from a pluggable `LabelStrategy`:
//!   - `SyntheticHeuristic`: rule-based score plus seeded Gaussian noise.
//!   - `HistoricalOutcome`: observed `churned` / `lifetime_value` fields.
//! The training pipeline only sees the trait.

use crate::{
    config::{LabelConfig, LabelStrategyKind},
    customer::CustomerRecord,
    error::{AnalyticsError, AnalyticsResult},
    features::{FeatureMatrix, FeatureVector},
    rng::StreamRng,
};

pub const CHURN_LABEL_THRESHOLD: f64 = 0.5;

pub trait LabelStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// One label per row of `features`; `true` means "will churn".
    fn churn_labels(
        &self,
        customers: &[CustomerRecord],
        features: &FeatureMatrix,
        rng: &mut StreamRng,
    ) -> AnalyticsResult<Vec<bool>>;

    /// One non-negative lifetime value per row of `features`.
    fn cltv_labels(
        &self,
        customers: &[CustomerRecord],
        features: &FeatureMatrix,
        rng: &mut StreamRng,
    ) -> AnalyticsResult<Vec<f64>>;
}

pub fn from_config(config: &LabelConfig) -> Box<dyn LabelStrategy> {
    match config.strategy {
        LabelStrategyKind::SyntheticHeuristic => Box::new(SyntheticHeuristic {
            churn_noise_std: config.churn_noise_std,
            cltv_noise_std:  config.cltv_noise_std,
        }),
        LabelStrategyKind::HistoricalOutcome => Box::new(HistoricalOutcome),
    }
}

// ── Synthetic heuristic ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SyntheticHeuristic {
    pub churn_noise_std: f64,
    pub cltv_noise_std:  f64,
}

/// Noise-free churn score: payment lapse, failed payments, support load
/// and low revenue each contribute a fixed weight.
pub fn churn_heuristic_score(f: &FeatureVector) -> f64 {
    let mut score = 0.0;
    if f.days_since_last_payment > 60 {
        score += 0.3;
    }
    if f.failed_payments > 2 {
        score += 0.4;
    }
    if f.support_tickets > 5 {
        score += 0.2;
    }
    if f.total_revenue < 100.0 {
        score += 0.1;
    }
    score
}

/// Noise-free lifetime value: twice the revenue to date, adjusted for
/// tenure, payment reliability and account type.
pub fn cltv_heuristic_base(f: &FeatureVector) -> f64 {
    let mut value = f.total_revenue * 2.0;
    if f.account_age_days > 365 {
        value *= 1.5;
    }
    if f.failed_payments > 2 {
        value *= 0.7;
    }
    if f.is_enterprise {
        value *= 2.0;
    }
    value
}

impl LabelStrategy for SyntheticHeuristic {
    fn name(&self) -> &'static str { "synthetic_heuristic" }

    fn churn_labels(
        &self,
        _customers: &[CustomerRecord],
        features: &FeatureMatrix,
        rng: &mut StreamRng,
    ) -> AnalyticsResult<Vec<bool>> {
        Ok(features
            .vectors
            .iter()
            .map(|f| {
                let score = churn_heuristic_score(f) + rng.normal(0.0, self.churn_noise_std);
                score > CHURN_LABEL_THRESHOLD
            })
            .collect())
    }

    fn cltv_labels(
        &self,
        _customers: &[CustomerRecord],
        features: &FeatureMatrix,
        rng: &mut StreamRng,
    ) -> AnalyticsResult<Vec<f64>> {
        Ok(features
            .vectors
            .iter()
            .map(|f| {
                let cltv = cltv_heuristic_base(f) * (1.0 + rng.normal(0.0, self.cltv_noise_std));
                cltv.max(0.0)
            })
            .collect())
    }
}

// ── Historical outcome ───────────────────────────────────────────────────────

/// Reads observed outcomes off the records. Every training record must
/// carry the relevant field.
#[derive(Debug, Clone, Default)]
pub struct HistoricalOutcome;

impl LabelStrategy for HistoricalOutcome {
    fn name(&self) -> &'static str { "historical_outcome" }

    fn churn_labels(
        &self,
        customers: &[CustomerRecord],
        _features: &FeatureMatrix,
        _rng: &mut StreamRng,
    ) -> AnalyticsResult<Vec<bool>> {
        customers
            .iter()
            .map(|c| {
                c.churned.ok_or_else(|| AnalyticsError::MissingLabel {
                    customer: c.display_id(),
                    field:    "churned",
                })
            })
            .collect()
    }

    fn cltv_labels(
        &self,
        customers: &[CustomerRecord],
        _features: &FeatureMatrix,
        _rng: &mut StreamRng,
    ) -> AnalyticsResult<Vec<f64>> {
        customers
            .iter()
            .map(|c| match c.lifetime_value {
                Some(v) if v.is_finite() => Ok(v.max(0.0)),
                _ => Err(AnalyticsError::MissingLabel {
                    customer: c.display_id(),
                    field:    "lifetime_value",
                }),
            })
            .collect()
    }
}
