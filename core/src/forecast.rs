//! Twelve-month revenue projection from current revenue, growth and churn.

use serde::{Deserialize, Serialize};

pub const FORECAST_MONTHS: u32 = 12;
pub const DEFAULT_GROWTH_RATE: f64 = 0.05;
pub const DEFAULT_CHURN_RATE:  f64 = 0.05;
const BASE_CONFIDENCE:         f64 = 0.85;
const CONFIDENCE_DECAY:        f64 = 0.02;
const CHURN_RISK_RATE:         f64 = 0.1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessSnapshot {
    pub current_monthly_revenue: Option<f64>,
    pub current_churn_rate:      Option<f64>,
    pub growth_rate:             Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProjection {
    pub month:             u32,
    pub predicted_revenue: f64,
    pub confidence:        f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trajectory {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub projected_yearly_revenue: f64,
    pub growth_trajectory:        Trajectory,
    pub key_risks:                Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueForecast {
    pub revenue_predictions: Vec<MonthlyProjection>,
    pub summary:             ForecastSummary,
}

pub fn forecast_revenue(snapshot: &BusinessSnapshot) -> RevenueForecast {
    let growth = snapshot.growth_rate.unwrap_or(DEFAULT_GROWTH_RATE);
    let churn = snapshot.current_churn_rate.unwrap_or(DEFAULT_CHURN_RATE);
    let mut revenue = snapshot.current_monthly_revenue.unwrap_or(0.0);

    let revenue_predictions: Vec<MonthlyProjection> = (1..=FORECAST_MONTHS)
        .map(|month| {
            revenue *= 1.0 + growth - churn;
            MonthlyProjection {
                month,
                predicted_revenue: (revenue * 100.0).round() / 100.0,
                confidence: BASE_CONFIDENCE - month as f64 * CONFIDENCE_DECAY,
            }
        })
        .collect();

    let mut key_risks = Vec::new();
    if churn > CHURN_RISK_RATE {
        key_risks.push("Customer churn".to_string());
    }
    key_risks.push("Market competition".to_string());

    RevenueForecast {
        summary: ForecastSummary {
            projected_yearly_revenue: revenue_predictions.iter().map(|p| p.predicted_revenue).sum(),
            growth_trajectory: if growth > churn { Trajectory::Positive } else { Trajectory::Negative },
            key_risks,
        },
        revenue_predictions,
    }
}
