//! Shared primitive types used across the analytics engine.

use serde::{Deserialize, Serialize};

/// Billing-side customer identifier.
pub type CustomerId = i64;

/// The two supervised model families the engine trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Churn,
    Cltv,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Churn, ModelKind::Cltv];

    /// Stable name, used as the artifact file prefix.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Churn => "churn",
            Self::Cltv  => "cltv",
        }
    }

    /// Human-facing label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Churn => "Churn",
            Self::Cltv  => "CLTV",
        }
    }

    pub fn model_file(&self) -> String {
        format!("{}_model.json", self.name())
    }

    pub fn scaler_file(&self) -> String {
        format!("{}_scaler.json", self.name())
    }
}
