//! Rule-based scoring on top of the models: health score,
//! next-best-action recommendations and revenue segmentation.

use crate::{
    customer::CustomerRecord,
    error::AnalyticsResult,
    features::{FeatureExtractor, FeatureVector},
    prediction::{ChurnPrediction, CltvPrediction, RiskLevel},
    scaler::check_finite,
    types::CustomerId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Health score ─────────────────────────────────────────────────────────────

pub const HEALTH_SCORE_START:    i32 = 100;
pub const HEALTH_SCORE_FALLBACK: u8  = 50;

/// 0–100 score; each rule deducts independently.
pub fn try_health_score(f: &FeatureVector) -> AnalyticsResult<u8> {
    check_finite(&f.to_row())?;

    let mut score = HEALTH_SCORE_START;

    // Payment behaviour
    if f.failed_payments > 2 {
        score -= 20;
    } else if f.failed_payments > 0 {
        score -= 10;
    }
    if f.days_since_last_payment > 60 {
        score -= 15;
    } else if f.days_since_last_payment > 30 {
        score -= 8;
    }

    // Engagement
    if f.support_tickets > 5 {
        score -= 15;
    } else if f.support_tickets > 2 {
        score -= 5;
    }
    if f.account_age_days < 30 {
        score -= 10;
    }

    // Revenue contribution
    if f.total_revenue < 100.0 {
        score -= 20;
    } else if f.total_revenue < 500.0 {
        score -= 10;
    }

    Ok(score.clamp(0, 100) as u8)
}

/// Never fails: the UI always gets a number.
pub fn health_score(f: &FeatureVector) -> u8 {
    try_health_score(f).unwrap_or_else(|e| {
        log::error!("health score fell back to {HEALTH_SCORE_FALLBACK}: {e}");
        HEALTH_SCORE_FALLBACK
    })
}

// ── Recommendations ──────────────────────────────────────────────────────────

pub const UPSELL_CLTV:           f64 = 5_000.0;
pub const PAYMENT_REVIEW_FAILURES: u32 = 1;
pub const SUPPORT_OUTREACH_TICKETS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Retention,
    Engagement,
    Upsell,
    Payment,
    Support,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind:     RecommendationType,
    pub priority: Priority,
    pub action:   String,
    pub reason:   String,
}

impl Recommendation {
    fn new(kind: RecommendationType, priority: Priority, action: &str, reason: &str) -> Self {
        Self {
            kind,
            priority,
            action: action.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Rules fire independently; output keeps evaluation order.
/// A missing prediction simply skips the rules that depend on it.
pub fn generate_recommendations(
    f: &FeatureVector,
    churn: Option<&ChurnPrediction>,
    cltv: Option<&CltvPrediction>,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    match churn.map(|c| c.risk_level) {
        Some(RiskLevel::High) => out.push(Recommendation::new(
            RecommendationType::Retention,
            Priority::High,
            "Send personalized retention offer",
            "High churn risk detected",
        )),
        Some(RiskLevel::Medium) => out.push(Recommendation::new(
            RecommendationType::Engagement,
            Priority::Medium,
            "Increase engagement with product updates",
            "Medium churn risk - preventive action needed",
        )),
        Some(RiskLevel::Low) | None => {}
    }

    if cltv.is_some_and(|c| c.predicted_cltv > UPSELL_CLTV) {
        out.push(Recommendation::new(
            RecommendationType::Upsell,
            Priority::High,
            "Offer premium features or higher tier",
            "High lifetime value potential",
        ));
    }

    if f.failed_payments > PAYMENT_REVIEW_FAILURES {
        out.push(Recommendation::new(
            RecommendationType::Payment,
            Priority::Medium,
            "Review payment methods and send payment reminder",
            "Multiple failed payments detected",
        ));
    }

    if f.support_tickets > SUPPORT_OUTREACH_TICKETS {
        out.push(Recommendation::new(
            RecommendationType::Support,
            Priority::Medium,
            "Proactive customer success outreach",
            "High support ticket volume",
        ));
    }

    out
}

// ── Segmentation ─────────────────────────────────────────────────────────────

pub const HIGH_VALUE_REVENUE:   f64 = 5_000.0;
pub const MEDIUM_VALUE_REVENUE: f64 = 1_000.0;
pub const NEW_CUSTOMER_DAYS:    i64 = 30;

/// Exactly one per customer, evaluated in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CustomerSegment {
    #[serde(rename = "High Value")]
    HighValue,
    #[serde(rename = "Medium Value")]
    MediumValue,
    #[serde(rename = "New Customer")]
    NewCustomer,
    #[serde(rename = "Low Value")]
    LowValue,
}

impl CustomerSegment {
    pub fn assign(f: &FeatureVector) -> Self {
        if f.total_revenue > HIGH_VALUE_REVENUE {
            Self::HighValue
        } else if f.total_revenue > MEDIUM_VALUE_REVENUE {
            Self::MediumValue
        } else if f.account_age_days < NEW_CUSTOMER_DAYS {
            Self::NewCustomer
        } else {
            Self::LowValue
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighValue   => "High Value",
            Self::MediumValue => "Medium Value",
            Self::NewCustomer => "New Customer",
            Self::LowValue    => "Low Value",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub count:         usize,
    pub total_revenue: f64,
    pub avg_revenue:   f64,
    pub customers:     Vec<Option<CustomerId>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    /// Only segments with at least one member appear.
    pub segments:        BTreeMap<CustomerSegment, SegmentSummary>,
    pub total_customers: usize,
}

impl SegmentReport {
    pub fn segment_of(&self, id: CustomerId) -> Option<CustomerSegment> {
        self.segments
            .iter()
            .find(|(_, s)| s.customers.contains(&Some(id)))
            .map(|(seg, _)| *seg)
    }
}

pub fn segment_customers(customers: &[CustomerRecord], extractor: &FeatureExtractor) -> SegmentReport {
    let mut segments: BTreeMap<CustomerSegment, SegmentSummary> = BTreeMap::new();

    for customer in customers {
        let f = extractor.extract(customer);
        let entry = segments.entry(CustomerSegment::assign(&f)).or_default();
        entry.count += 1;
        entry.total_revenue += f.total_revenue;
        entry.customers.push(customer.id);
    }

    for summary in segments.values_mut() {
        if summary.count > 0 {
            summary.avg_revenue = summary.total_revenue / summary.count as f64;
        }
    }

    SegmentReport {
        segments,
        total_customers: customers.len(),
    }
}
