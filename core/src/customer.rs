//! Customer records as supplied by the billing application.
//!
//! Every field is optional. Absent values are substituted with the
//! documented defaults in `features::FeatureExtractor`, never rejected.

use crate::{error::AnalyticsResult, types::CustomerId};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerRecord {
    // Identity
    pub id:    Option<CustomerId>,
    pub name:  Option<String>,
    pub email: Option<String>,

    // Account metadata
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at:   Option<DateTime<Utc>>,
    pub account_type: Option<String>,
    pub country:      Option<String>,
    pub status:       Option<String>,

    // Cumulative billing metrics
    pub total_transactions:     Option<u32>,
    pub total_revenue:          Option<f64>,
    pub avg_transaction_amount: Option<f64>,

    // Payment health
    pub days_since_last_payment: Option<u32>,
    pub failed_payments:         Option<u32>,

    // Support load
    pub support_tickets: Option<u32>,

    // Subscription / communication
    pub subscription_count:       Option<u32>,
    pub communication_frequency:  Option<u32>,
    pub payment_method_diversity: Option<u32>,
    pub crypto_wallets:           Vec<String>,

    // Observed outcomes, only present once history exists.
    pub churned:        Option<bool>,
    pub lifetime_value: Option<f64>,
}

impl CustomerRecord {
    /// Display key for logs and error messages.
    pub fn display_id(&self) -> String {
        match self.id {
            Some(id) => id.to_string(),
            None     => "<unidentified>".to_string(),
        }
    }
}

/// Parse the timestamp shapes the billing app emits: RFC 3339 with an
/// offset or `Z`, a naive ISO datetime (assumed UTC), or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// A malformed timestamp is treated as absent rather than failing the record.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

// ── Providers ────────────────────────────────────────────────────────────────

/// Anything that can hand the engine customer records.
pub trait CustomerSource {
    fn customers(&self) -> AnalyticsResult<Vec<CustomerRecord>>;

    fn customer(&self, id: CustomerId) -> AnalyticsResult<Option<CustomerRecord>> {
        Ok(self.customers()?.into_iter().find(|c| c.id == Some(id)))
    }
}

/// In-memory demo population, shaped like the billing app's fixture.
pub struct SampleCustomers {
    records: Vec<CustomerRecord>,
}

pub const SAMPLE_POPULATION: i64 = 100;

impl SampleCustomers {
    /// Build the fixture with creation dates relative to `now`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let records = (1..=SAMPLE_POPULATION)
            .map(|i| CustomerRecord {
                id:    Some(i),
                name:  Some(format!("Customer {i}")),
                email: Some(format!("customer{i}@example.com")),
                status: Some("Active".into()),
                created_at: Some(now - Duration::days(i * 5)),
                total_revenue: Some((100 + i * 50) as f64),
                total_transactions: Some((i % 20 + 1) as u32),
                avg_transaction_amount: Some((50 + i % 100) as f64),
                days_since_last_payment: Some((i % 60) as u32),
                failed_payments: Some((i % 5) as u32),
                support_tickets: Some((i % 10) as u32),
                subscription_count: Some(if i % 3 != 0 { 1 } else { 2 }),
                lifetime_value: Some((1000 + i * 100) as f64),
                ..Default::default()
            })
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }
}

impl CustomerSource for SampleCustomers {
    fn customers(&self) -> AnalyticsResult<Vec<CustomerRecord>> {
        Ok(self.records.clone())
    }
}
