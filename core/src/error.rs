use crate::types::ModelKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{} model not trained. Please train the model first.", kind.label())]
    NotTrained { kind: ModelKind },

    #[error("Not enough customers to train: got {available}, need at least {required}")]
    InsufficientData { available: usize, required: usize },

    #[error("Model fit failed: {0}")]
    Fit(String),

    #[error("Customer {customer} has no observed {field} for label generation")]
    MissingLabel { customer: String, field: &'static str },

    #[error("Feature '{name}' is not a finite number ({value})")]
    InvalidFeature { name: &'static str, value: f64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
