//! Boundary result shape handed to callers.
//!
//! Serializes as `{"status": "success", ...fields}` or
//! `{"status": "error", "message": "..."}`. Internal code works with
//! `AnalyticsResult`; service operations convert at their boundary.

use crate::error::AnalyticsResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome<T> {
    Success(T),
    Error { message: String },
}

impl<T> Outcome<T> {
    /// Convert an internal result, logging the failure under `operation`.
    pub fn from_result(operation: &str, result: AnalyticsResult<T>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(e) => {
                log::error!("{operation} failed: {e}");
                Outcome::Error { message: e.to_string() }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Error { .. }   => None,
        }
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Error { .. }   => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Success(_)         => None,
            Outcome::Error { message }  => Some(message),
        }
    }
}
