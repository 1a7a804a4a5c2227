use billchain_analytics::{
    forecast::{forecast_revenue, BusinessSnapshot, Trajectory},
    fraud::{assess_transaction, FraudRiskLevel, TransactionSignals},
    prediction::ValueSegment,
    pricing::{optimize_price, PricingRequest},
};

// ── Pricing ──────────────────────────────────────────────────────────────────

/// Defaults: base 100, Medium Value, intensity 0.5 → unchanged.
#[test]
fn default_price_is_unchanged() {
    let quote = optimize_price(&PricingRequest::default());
    assert_eq!(quote.original_price, 100.0);
    assert_eq!(quote.optimized_price, 100.0);
    assert_eq!(quote.adjustment, 0.0);
    assert!(quote.reasoning.contains("Medium Value"));
}

#[test]
fn segment_multipliers_and_competition_discount() {
    let quote = |segment, intensity| {
        optimize_price(&PricingRequest {
            base_price: Some(200.0),
            customer_segment: Some(segment),
            competitive_intensity: Some(intensity),
        })
    };

    assert_eq!(quote(ValueSegment::Premium, 0.5).optimized_price, 260.0);
    assert_eq!(quote(ValueSegment::Premium, 0.5).adjustment, 30.0);
    assert_eq!(quote(ValueSegment::HighValue, 0.5).optimized_price, 230.0);
    assert_eq!(quote(ValueSegment::LowValue, 0.5).optimized_price, 180.0);
    assert_eq!(quote(ValueSegment::LowValue, 0.5).adjustment, -10.0);

    // 1.3 * 0.95 = 1.235
    let contested = quote(ValueSegment::Premium, 0.8);
    assert_eq!(contested.optimized_price, 247.0);
    assert_eq!(contested.adjustment, 23.5);

    // Exactly 0.7 is not "high" competition.
    assert_eq!(quote(ValueSegment::MediumValue, 0.7).optimized_price, 200.0);
}

// ── Revenue forecast ─────────────────────────────────────────────────────────

#[test]
fn forecast_compounds_monthly_for_a_year() {
    let forecast = forecast_revenue(&BusinessSnapshot {
        current_monthly_revenue: Some(10_000.0),
        current_churn_rate: Some(0.02),
        growth_rate: Some(0.07),
    });

    assert_eq!(forecast.revenue_predictions.len(), 12);
    assert_eq!(forecast.revenue_predictions[0].month, 1);
    assert_eq!(forecast.revenue_predictions[0].predicted_revenue, 10_500.0);
    assert_eq!(forecast.revenue_predictions[1].predicted_revenue, 11_025.0);
    assert!((forecast.revenue_predictions[0].confidence - 0.83).abs() < 1e-12);
    assert!((forecast.revenue_predictions[11].confidence - 0.61).abs() < 1e-12);

    let sum: f64 = forecast.revenue_predictions.iter().map(|p| p.predicted_revenue).sum();
    assert!((forecast.summary.projected_yearly_revenue - sum).abs() < 1e-6);
    assert_eq!(forecast.summary.growth_trajectory, Trajectory::Positive);
    assert_eq!(forecast.summary.key_risks, vec!["Market competition".to_string()]);
}

/// Defaults cancel out (growth == churn) so the trajectory is negative.
#[test]
fn forecast_defaults_and_churn_risk() {
    let flat = forecast_revenue(&BusinessSnapshot::default());
    assert_eq!(flat.summary.growth_trajectory, Trajectory::Negative);
    assert!(flat.revenue_predictions.iter().all(|p| p.predicted_revenue == 0.0));

    let churning = forecast_revenue(&BusinessSnapshot {
        current_monthly_revenue: Some(1_000.0),
        current_churn_rate: Some(0.15),
        growth_rate: Some(0.05),
    });
    assert_eq!(churning.summary.growth_trajectory, Trajectory::Negative);
    assert_eq!(churning.summary.key_risks[0], "Customer churn");
    assert!(churning.revenue_predictions[11].predicted_revenue < 1_000.0);
}

// ── Fraud score ──────────────────────────────────────────────────────────────

#[test]
fn ordinary_card_payment_is_low_risk() {
    let a = assess_transaction(&TransactionSignals::default());
    assert_eq!(a.fraud_score, 0.0);
    assert!(!a.is_fraud);
    assert_eq!(a.risk_level, FraudRiskLevel::Low);
    assert!(!a.factors.amount_risk && !a.factors.time_risk && !a.factors.frequency_risk);
}

#[test]
fn indicators_accumulate() {
    let a = assess_transaction(&TransactionSignals {
        amount: Some(12_000.0),
        hour: Some(3),
        transactions_24h: Some(11),
        payment_method: Some("bitcoin".into()),
    });
    assert!((a.fraud_score - 1.0).abs() < 1e-9);
    assert!(a.is_fraud);
    assert_eq!(a.risk_level, FraudRiskLevel::High);
    assert!(a.factors.amount_risk && a.factors.time_risk && a.factors.frequency_risk);

    let moderate = assess_transaction(&TransactionSignals {
        amount: Some(6_000.0),
        transactions_24h: Some(6),
        payment_method: Some("ethereum".into()),
        ..Default::default()
    });
    // 0.1 + 0.2 + 0.1
    assert!((moderate.fraud_score - 0.4).abs() < 1e-9);
    assert!(!moderate.is_fraud);
    assert_eq!(moderate.risk_level, FraudRiskLevel::Medium);
    assert!(!moderate.factors.time_risk);
}
