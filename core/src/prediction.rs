//! Prediction: apply a trained model and its scaler to one customer.
//!
//! Tier mappings are fixed constants; their boundaries are part of the
//! contract with the billing UI:
//!   risk:  p >= 0.7 High, p >= 0.4 Medium, else Low
//!   value: cltv > 10000 Premium, > 5000 High Value, > 1000 Medium Value,
//!          else Low Value

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    features::FeatureVector,
    forest::ForestTask,
    model_store::ModelArtifact,
    scaler::StandardScaler,
};
use serde::{Deserialize, Serialize};

pub const HIGH_RISK_PROBABILITY:   f64 = 0.7;
pub const MEDIUM_RISK_PROBABILITY: f64 = 0.4;

pub const PREMIUM_CLTV:      f64 = 10_000.0;
pub const HIGH_VALUE_CLTV:   f64 = 5_000.0;
pub const MEDIUM_VALUE_CLTV: f64 = 1_000.0;

/// Half-width of the reported CLTV band, as a fraction of the estimate.
pub const CLTV_BAND_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_probability(p: f64) -> Self {
        if p >= HIGH_RISK_PROBABILITY {
            Self::High
        } else if p >= MEDIUM_RISK_PROBABILITY {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low    => "Low",
            Self::Medium => "Medium",
            Self::High   => "High",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [Self::Low, Self::Medium, Self::High].into_iter().find(|r| r.as_str() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueSegment {
    Premium,
    #[serde(rename = "High Value")]
    HighValue,
    #[serde(rename = "Medium Value")]
    MediumValue,
    #[serde(rename = "Low Value")]
    LowValue,
}

impl ValueSegment {
    pub fn from_cltv(cltv: f64) -> Self {
        if cltv > PREMIUM_CLTV {
            Self::Premium
        } else if cltv > HIGH_VALUE_CLTV {
            Self::HighValue
        } else if cltv > MEDIUM_VALUE_CLTV {
            Self::MediumValue
        } else {
            Self::LowValue
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Premium     => "Premium",
            Self::HighValue   => "High Value",
            Self::MediumValue => "Medium Value",
            Self::LowValue    => "Low Value",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [Self::Premium, Self::HighValue, Self::MediumValue, Self::LowValue]
            .into_iter()
            .find(|s| s.as_str() == raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnPrediction {
    pub churn_probability: f64,
    pub will_churn:        bool,
    pub risk_level:        RiskLevel,
    /// max(p, 1 - p), always in [0.5, 1].
    pub confidence:        f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CltvPrediction {
    pub predicted_cltv:      f64,
    pub confidence_interval: ConfidenceInterval,
    pub value_segment:       ValueSegment,
}

fn scaled_row(
    artifact: &ModelArtifact,
    scaler: &StandardScaler,
    features: &FeatureVector,
    expected: ForestTask,
) -> AnalyticsResult<[f64; crate::features::FEATURE_COUNT]> {
    if artifact.forest.task != expected {
        return Err(AnalyticsError::Fit(format!(
            "artifact {} is a {:?} model, expected {:?}",
            artifact.metadata.artifact_id, artifact.forest.task, expected
        )));
    }
    scaler.transform_row(&features.to_row())
}

pub fn predict_churn(
    artifact: &ModelArtifact,
    scaler: &StandardScaler,
    features: &FeatureVector,
) -> AnalyticsResult<ChurnPrediction> {
    let row = scaled_row(artifact, scaler, features, ForestTask::Classification)?;
    let churn_probability = artifact.forest.predict(&row).clamp(0.0, 1.0);

    Ok(ChurnPrediction {
        churn_probability,
        will_churn: artifact.forest.predict_positive(&row),
        risk_level: RiskLevel::from_probability(churn_probability),
        confidence: churn_probability.max(1.0 - churn_probability),
    })
}

pub fn predict_cltv(
    artifact: &ModelArtifact,
    scaler: &StandardScaler,
    features: &FeatureVector,
) -> AnalyticsResult<CltvPrediction> {
    let row = scaled_row(artifact, scaler, features, ForestTask::Regression)?;
    let predicted_cltv = artifact.forest.predict(&row).max(0.0);

    Ok(CltvPrediction {
        predicted_cltv,
        confidence_interval: ConfidenceInterval {
            lower: predicted_cltv * (1.0 - CLTV_BAND_FRACTION),
            upper: predicted_cltv * (1.0 + CLTV_BAND_FRACTION),
        },
        value_segment: ValueSegment::from_cltv(predicted_cltv),
    })
}
