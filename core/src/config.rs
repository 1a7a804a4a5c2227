use crate::forest::ForestParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `models_dir`.
pub const MODELS_DIR_ENV: &str = "MODELS_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelStrategyKind {
    SyntheticHeuristic,
    HistoricalOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub strategy: LabelStrategyKind,
    /// Std of the Gaussian added to the synthetic churn score.
    pub churn_noise_std: f64,
    /// Std of the multiplicative Gaussian on synthetic CLTV.
    pub cltv_noise_std: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            strategy:        LabelStrategyKind::SyntheticHeuristic,
            churn_noise_std: 0.1,
            cltv_noise_std:  0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Directory holding the model and scaler artifacts.
    pub models_dir: PathBuf,
    /// Master seed for label noise, the split shuffle and tree bootstraps.
    pub seed: u64,
    /// Fraction of the batch held out for evaluation.
    pub test_fraction: f64,
    pub forest: ForestParams,
    pub labels: LabelConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            models_dir:    PathBuf::from("models"),
            seed:          42,
            test_fraction: 0.2,
            forest:        ForestParams::default(),
            labels:        LabelConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Load from a JSON file. Keys absent from the file keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MODELS_DIR` if set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(MODELS_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.models_dir = PathBuf::from(dir);
            }
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            anyhow::bail!("test_fraction must be in (0, 1), got {}", self.test_fraction);
        }
        if self.forest.n_estimators == 0 {
            anyhow::bail!("forest.n_estimators must be at least 1");
        }
        if self.forest.max_depth == 0 {
            anyhow::bail!("forest.max_depth must be at least 1");
        }
        if self.labels.churn_noise_std < 0.0 || self.labels.cltv_noise_std < 0.0 {
            anyhow::bail!("label noise std must be non-negative");
        }
        Ok(())
    }

    /// Config with small, fast forests for use in tests.
    pub fn default_test(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            forest: ForestParams {
                n_estimators: 20,
                max_depth:    6,
                ..ForestParams::default()
            },
            ..Self::default()
        }
    }
}
