//! Customer analytics engine for the billing application.
//!
//! Turns customer records into churn risk, lifetime-value estimates, a
//! health score, recommendations and value segments. Model artifacts
//! live on disk under a models directory and are restored on start.

pub mod config;
pub mod customer;
pub mod error;
pub mod features;
pub mod forecast;
pub mod forest;
pub mod fraud;
pub mod labels;
pub mod model_store;
pub mod outcome;
pub mod policy;
pub mod prediction;
pub mod pricing;
pub mod rng;
pub mod scaler;
pub mod service;
pub mod store;
pub mod training;
pub mod types;

pub use config::AnalyticsConfig;
pub use customer::{CustomerRecord, CustomerSource, SampleCustomers};
pub use error::{AnalyticsError, AnalyticsResult};
pub use features::{FeatureExtractor, FeatureVector, FEATURE_NAMES};
pub use outcome::Outcome;
pub use service::AnalyticsService;
pub use types::{CustomerId, ModelKind};
