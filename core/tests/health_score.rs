use billchain_analytics::{
    customer::CustomerRecord,
    features::{FeatureExtractor, FeatureVector},
    policy::{health_score, try_health_score, HEALTH_SCORE_FALLBACK},
};
use chrono::{DateTime, Duration, TimeZone, Utc};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
}

/// A customer that triggers no deductions at all.
fn healthy() -> FeatureVector {
    FeatureExtractor::new(as_of()).extract(&CustomerRecord {
        created_at: Some(as_of() - Duration::days(200)),
        total_revenue: Some(2_000.0),
        ..Default::default()
    })
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn no_deductions_scores_100() {
    assert_eq!(health_score(&healthy()), 100);
}

/// An empty record is young (age 0) and has no revenue: −10 and −20.
#[test]
fn empty_record_scores_70() {
    let f = FeatureExtractor::new(as_of()).extract(&CustomerRecord::default());
    assert_eq!(health_score(&f), 70);
}

/// failed=3, lapse=70, tickets=6, revenue=50, age=10 deducts 80 in total.
#[test]
fn worst_case_scenario_scores_at_most_20() {
    let f = FeatureVector {
        failed_payments: 3,
        days_since_last_payment: 70,
        support_tickets: 6,
        total_revenue: 50.0,
        account_age_days: 10,
        ..healthy()
    };
    let score = health_score(&f);
    assert!(score <= 20, "score {score} must be ≤ 20");
    assert_eq!(score, 20);
}

/// Each deduction tier applies independently of the others.
#[test]
fn deductions_are_additive_per_rule() {
    let base = healthy();
    let cases = [
        (FeatureVector { failed_payments: 1, ..base }, 90),
        (FeatureVector { failed_payments: 3, ..base }, 80),
        (FeatureVector { days_since_last_payment: 31, ..base }, 92),
        (FeatureVector { days_since_last_payment: 61, ..base }, 85),
        (FeatureVector { support_tickets: 3, ..base }, 95),
        (FeatureVector { support_tickets: 6, ..base }, 85),
        (FeatureVector { account_age_days: 29, ..base }, 90),
        (FeatureVector { total_revenue: 499.0, ..base }, 90),
        (FeatureVector { total_revenue: 99.0, ..base }, 80),
        (FeatureVector { failed_payments: 1, support_tickets: 3, ..base }, 85),
    ];
    for (f, expected) in cases {
        assert_eq!(health_score(&f), expected, "features: {f:?}");
    }
}

/// Thresholds are strict: exactly 30 days / 2 tickets / 500 revenue deduct nothing.
#[test]
fn thresholds_are_strict() {
    let f = FeatureVector {
        days_since_last_payment: 30,
        support_tickets: 2,
        total_revenue: 500.0,
        account_age_days: 30,
        ..healthy()
    };
    assert_eq!(health_score(&f), 100);
}

/// A non-finite feature is an internal failure and yields the neutral default.
#[test]
fn non_finite_feature_falls_back_to_50() {
    let f = FeatureVector {
        total_revenue: f64::NAN,
        ..healthy()
    };
    assert!(try_health_score(&f).is_err());
    assert_eq!(health_score(&f), HEALTH_SCORE_FALLBACK);
    assert_eq!(HEALTH_SCORE_FALLBACK, 50);
}

/// Scores stay within [0, 100] across a sweep of inputs.
#[test]
fn score_always_within_bounds() {
    for failed in [0, 1, 5, 100] {
        for lapse in [0, 45, 90, 10_000] {
            for tickets in [0, 4, 50] {
                for revenue in [0.0, 250.0, 1e9, -50.0] {
                    let f = FeatureVector {
                        failed_payments: failed,
                        days_since_last_payment: lapse,
                        support_tickets: tickets,
                        total_revenue: revenue,
                        ..healthy()
                    };
                    let s = health_score(&f);
                    assert!(s <= 100, "score {s} out of range for {f:?}");
                }
            }
        }
    }
}
