//! Feature extraction: one customer record in, one fixed-width vector out.
//!
//! RULE: the same named features, in the same order, for every record.
//! A fitted scaler or model indexes columns by position, so FEATURE_NAMES
//! is append-only and `FeatureVector::to_row` must follow it exactly.
//!
//! No feature may depend on another customer in the batch; normalization
//! is the scaler's job.

use crate::customer::CustomerRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 12;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "account_age_days",
    "total_transactions",
    "total_revenue",
    "avg_transaction_amount",
    "days_since_last_payment",
    "failed_payments",
    "support_tickets",
    "subscription_count",
    "is_enterprise",
    "has_crypto_wallet",
    "communication_frequency",
    "payment_method_diversity",
];

pub const ENTERPRISE_ACCOUNT_TYPE: &str = "Enterprise";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub account_age_days:         i64,
    pub total_transactions:       u32,
    pub total_revenue:            f64,
    pub avg_transaction_amount:   f64,
    pub days_since_last_payment:  u32,
    pub failed_payments:          u32,
    pub support_tickets:          u32,
    pub subscription_count:       u32,
    pub is_enterprise:            bool,
    pub has_crypto_wallet:        bool,
    pub communication_frequency:  u32,
    pub payment_method_diversity: u32,
}

impl FeatureVector {
    /// Numeric row in FEATURE_NAMES order.
    pub fn to_row(&self) -> [f64; FEATURE_COUNT] {
        [
            self.account_age_days as f64,
            self.total_transactions as f64,
            self.total_revenue,
            self.avg_transaction_amount,
            self.days_since_last_payment as f64,
            self.failed_payments as f64,
            self.support_tickets as f64,
            self.subscription_count as f64,
            if self.is_enterprise { 1.0 } else { 0.0 },
            if self.has_crypto_wallet { 1.0 } else { 0.0 },
            self.communication_frequency as f64,
            self.payment_method_diversity as f64,
        ]
    }

    /// (name, value) pairs in FEATURE_NAMES order.
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES.iter().copied().zip(self.to_row()).collect()
    }
}

/// Rows = customers (input order), columns = FEATURE_NAMES.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    pub vectors: Vec<FeatureVector>,
    pub rows:    Vec<[f64; FEATURE_COUNT]>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn feature_names(&self) -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }
}

/// Derives features relative to a fixed reference instant, so that
/// `account_age_days` is stable across a batch.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    as_of: DateTime<Utc>,
}

impl FeatureExtractor {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self { as_of }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn extract(&self, customer: &CustomerRecord) -> FeatureVector {
        // Whole days; creation dates in the future count as age 0.
        let account_age_days = customer
            .created_at
            .map(|created| (self.as_of - created).num_days().max(0))
            .unwrap_or(0);

        FeatureVector {
            account_age_days,
            total_transactions:       customer.total_transactions.unwrap_or(0),
            total_revenue:            customer.total_revenue.unwrap_or(0.0),
            avg_transaction_amount:   customer.avg_transaction_amount.unwrap_or(0.0),
            days_since_last_payment:  customer.days_since_last_payment.unwrap_or(0),
            failed_payments:          customer.failed_payments.unwrap_or(0),
            support_tickets:          customer.support_tickets.unwrap_or(0),
            subscription_count:       customer.subscription_count.unwrap_or(0),
            is_enterprise:            customer.account_type.as_deref() == Some(ENTERPRISE_ACCOUNT_TYPE),
            has_crypto_wallet:        !customer.crypto_wallets.is_empty(),
            communication_frequency:  customer.communication_frequency.unwrap_or(0),
            payment_method_diversity: customer.payment_method_diversity.unwrap_or(1),
        }
    }

    /// Apply `extract` to each record independently, preserving order.
    pub fn extract_batch(&self, customers: &[CustomerRecord]) -> FeatureMatrix {
        let vectors: Vec<FeatureVector> = customers.iter().map(|c| self.extract(c)).collect();
        let rows = vectors.iter().map(FeatureVector::to_row).collect();
        FeatureMatrix { vectors, rows }
    }
}
