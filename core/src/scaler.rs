//! Standardization: (x - mean) / std per feature column.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    features::{FEATURE_COUNT, FEATURE_NAMES},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub feature_names: Vec<String>,
    pub mean:          Vec<f64>,
    /// Population standard deviation; a constant column gets scale 1.0.
    pub scale:         Vec<f64>,
    pub n_samples:     usize,
    /// Artifact id of the model this scaler was fit alongside.
    #[serde(default)]
    pub model_id:      Option<Uuid>,
}

impl StandardScaler {
    pub fn fit(rows: &[[f64; FEATURE_COUNT]]) -> AnalyticsResult<Self> {
        if rows.is_empty() {
            return Err(AnalyticsError::Fit("cannot fit scaler on zero rows".into()));
        }
        for row in rows {
            check_finite(row)?;
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; FEATURE_COUNT];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut scale = vec![0.0; FEATURE_COUNT];
        for row in rows {
            for ((s, x), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (x - m).powi(2);
            }
        }
        for s in scale.iter_mut() {
            let std = (*s / n).sqrt();
            *s = if std > f64::EPSILON { std } else { 1.0 };
        }

        Ok(Self {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            mean,
            scale,
            n_samples: rows.len(),
            model_id: None,
        })
    }

    /// Shape check for a scaler read back from disk.
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(AnalyticsError::Fit(format!(
                "scaler has {} means and {} scales, engine produces {FEATURE_COUNT} features",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if let Some(bad) = self.mean.iter().chain(&self.scale).find(|v| !v.is_finite()) {
            return Err(AnalyticsError::Fit(format!("scaler holds non-finite value {bad}")));
        }
        if self.scale.iter().any(|&s| s <= 0.0) {
            return Err(AnalyticsError::Fit("scaler holds a non-positive scale".into()));
        }
        Ok(())
    }

    pub fn transform_row(&self, row: &[f64; FEATURE_COUNT]) -> AnalyticsResult<[f64; FEATURE_COUNT]> {
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(AnalyticsError::Fit(format!(
                "scaler was fit on {} features, engine produces {FEATURE_COUNT}",
                self.mean.len()
            )));
        }
        check_finite(row)?;
        let mut out = [0.0; FEATURE_COUNT];
        for (i, x) in row.iter().enumerate() {
            out[i] = (x - self.mean[i]) / self.scale[i];
        }
        Ok(out)
    }

    pub fn transform(&self, rows: &[[f64; FEATURE_COUNT]]) -> AnalyticsResult<Vec<[f64; FEATURE_COUNT]>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

pub(crate) fn check_finite(row: &[f64; FEATURE_COUNT]) -> AnalyticsResult<()> {
    for (name, value) in FEATURE_NAMES.iter().zip(row) {
        if !value.is_finite() {
            return Err(AnalyticsError::InvalidFeature { name: *name, value: *value });
        }
    }
    Ok(())
}
