//! Rule-based fraud score for a single payment.
//!
//! Indicators are additive:
//!   amount > 10k (+0.3) or > 5k (+0.1)
//!   off-hours, before 06:00 or after 23:00 (+0.2)
//!   more than 10 payments in 24h (+0.4) or more than 5 (+0.2)
//!   crypto payment method (+0.1)

use serde::{Deserialize, Serialize};

const LARGE_AMOUNT:        f64 = 10_000.0;
const ELEVATED_AMOUNT:     f64 = 5_000.0;
const HIGH_VELOCITY:       u32 = 10;
const ELEVATED_VELOCITY:   u32 = 5;
const FRAUD_THRESHOLD:     f64 = 0.5;
const HIGH_RISK_SCORE:     f64 = 0.7;
const MEDIUM_RISK_SCORE:   f64 = 0.3;
const CRYPTO_METHODS: [&str; 2] = ["bitcoin", "ethereum"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionSignals {
    pub amount:           Option<f64>,
    /// Hour of day, 0–23. Defaults to midday.
    pub hour:             Option<u32>,
    pub transactions_24h: Option<u32>,
    pub payment_method:   Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FraudRiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudFactors {
    pub amount_risk:    bool,
    pub time_risk:      bool,
    pub frequency_risk: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAssessment {
    pub fraud_score: f64,
    pub is_fraud:    bool,
    pub risk_level:  FraudRiskLevel,
    pub factors:     FraudFactors,
}

pub fn assess_transaction(tx: &TransactionSignals) -> FraudAssessment {
    let amount = tx.amount.unwrap_or(0.0);
    let hour = tx.hour.unwrap_or(12);
    let velocity = tx.transactions_24h.unwrap_or(0);
    let method = tx.payment_method.as_deref().unwrap_or("card");

    let mut score = 0.0;

    if amount > LARGE_AMOUNT {
        score += 0.3;
    } else if amount > ELEVATED_AMOUNT {
        score += 0.1;
    }

    let off_hours = hour < 6 || hour > 23;
    if off_hours {
        score += 0.2;
    }

    if velocity > HIGH_VELOCITY {
        score += 0.4;
    } else if velocity > ELEVATED_VELOCITY {
        score += 0.2;
    }

    if CRYPTO_METHODS.contains(&method) {
        score += 0.1;
    }

    let risk_level = if score > HIGH_RISK_SCORE {
        FraudRiskLevel::High
    } else if score > MEDIUM_RISK_SCORE {
        FraudRiskLevel::Medium
    } else {
        FraudRiskLevel::Low
    };

    FraudAssessment {
        fraud_score: score,
        is_fraud: score > FRAUD_THRESHOLD,
        risk_level,
        factors: FraudFactors {
            amount_risk:    amount > ELEVATED_AMOUNT,
            time_risk:      off_hours,
            frequency_risk: velocity > ELEVATED_VELOCITY,
        },
    }
}
