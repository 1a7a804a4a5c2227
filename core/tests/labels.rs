use billchain_analytics::{
    config::{AnalyticsConfig, LabelConfig, LabelStrategyKind},
    customer::{CustomerRecord, SampleCustomers},
    error::AnalyticsError,
    features::{FeatureExtractor, FeatureVector},
    labels::{churn_heuristic_score, cltv_heuristic_base, HistoricalOutcome, LabelStrategy, SyntheticHeuristic},
    rng::StreamRng,
    AnalyticsService,
};
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
}

fn base() -> FeatureVector {
    FeatureExtractor::new(as_of()).extract(&CustomerRecord {
        total_revenue: Some(1_000.0),
        ..Default::default()
    })
}

fn with_history(mut records: Vec<CustomerRecord>) -> Vec<CustomerRecord> {
    for (i, r) in records.iter_mut().enumerate() {
        r.churned = Some(i % 3 == 0);
        r.lifetime_value = Some(500.0 + i as f64 * 10.0);
    }
    records
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Churn score contributions: lapse 0.3, failures 0.4, tickets 0.2, low revenue 0.1.
#[test]
fn churn_heuristic_weights() {
    assert_eq!(churn_heuristic_score(&base()), 0.0);
    assert_eq!(churn_heuristic_score(&FeatureVector { days_since_last_payment: 61, ..base() }), 0.3);
    assert_eq!(churn_heuristic_score(&FeatureVector { failed_payments: 3, ..base() }), 0.4);
    assert_eq!(churn_heuristic_score(&FeatureVector { support_tickets: 6, ..base() }), 0.2);
    assert_eq!(churn_heuristic_score(&FeatureVector { total_revenue: 99.0, ..base() }), 0.1);

    let all = FeatureVector {
        days_since_last_payment: 61,
        failed_payments: 3,
        support_tickets: 6,
        total_revenue: 10.0,
        ..base()
    };
    assert!((churn_heuristic_score(&all) - 1.0).abs() < 1e-12);
}

/// CLTV base: 2× revenue, ×1.5 tenure, ×0.7 failures, ×2 enterprise.
#[test]
fn cltv_heuristic_multipliers() {
    assert_eq!(cltv_heuristic_base(&base()), 2_000.0);
    assert_eq!(cltv_heuristic_base(&FeatureVector { account_age_days: 366, ..base() }), 3_000.0);
    assert_eq!(cltv_heuristic_base(&FeatureVector { is_enterprise: true, ..base() }), 4_000.0);

    let all = FeatureVector {
        account_age_days: 400,
        failed_payments: 3,
        is_enterprise: true,
        ..base()
    };
    assert!((cltv_heuristic_base(&all) - 2_000.0 * 1.5 * 0.7 * 2.0).abs() < 1e-9);
}

/// Without noise, synthetic labels equal the heuristic thresholding.
#[test]
fn noiseless_synthetic_labels_match_heuristic() {
    let records = SampleCustomers::generate(as_of()).records().to_vec();
    let matrix = FeatureExtractor::new(as_of()).extract_batch(&records);
    let strategy = SyntheticHeuristic { churn_noise_std: 0.0, cltv_noise_std: 0.0 };
    let mut rng = StreamRng::new(7, 0);

    let churn = strategy.churn_labels(&records, &matrix, &mut rng).unwrap();
    let cltv = strategy.cltv_labels(&records, &matrix, &mut rng).unwrap();

    for (i, f) in matrix.vectors.iter().enumerate() {
        assert_eq!(churn[i], churn_heuristic_score(f) > 0.5);
        assert_eq!(cltv[i], cltv_heuristic_base(f));
    }
}

/// Noisy CLTV labels are never negative.
#[test]
fn synthetic_cltv_is_clamped_at_zero() {
    let records = SampleCustomers::generate(as_of()).records().to_vec();
    let matrix = FeatureExtractor::new(as_of()).extract_batch(&records);
    let strategy = SyntheticHeuristic { churn_noise_std: 0.1, cltv_noise_std: 5.0 };
    let mut rng = StreamRng::new(99, 1);

    let cltv = strategy.cltv_labels(&records, &matrix, &mut rng).unwrap();
    assert!(cltv.iter().all(|&v| v >= 0.0));
    assert!(cltv.iter().any(|&v| v == 0.0), "large noise should clamp some labels");
}

/// Historical labels read the observed outcome fields.
#[test]
fn historical_labels_use_observed_outcomes() {
    let records = with_history(SampleCustomers::generate(as_of()).records()[..6].to_vec());
    let matrix = FeatureExtractor::new(as_of()).extract_batch(&records);
    let mut rng = StreamRng::new(1, 0);

    let churn = HistoricalOutcome.churn_labels(&records, &matrix, &mut rng).unwrap();
    assert_eq!(churn, vec![true, false, false, true, false, false]);

    let cltv = HistoricalOutcome.cltv_labels(&records, &matrix, &mut rng).unwrap();
    assert_eq!(cltv[0], 500.0);
    assert_eq!(cltv[5], 550.0);
}

/// A record without an observed outcome fails historical training with a message.
#[test]
fn historical_missing_label_is_reported() {
    let mut records = with_history(SampleCustomers::generate(as_of()).records()[..10].to_vec());
    records[4].churned = None;
    let matrix = FeatureExtractor::new(as_of()).extract_batch(&records);

    let err = HistoricalOutcome.churn_labels(&records, &matrix, &mut StreamRng::new(1, 0))
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::MissingLabel { field: "churned", .. }));

    let dir = TempDir::new().unwrap();
    let mut config = AnalyticsConfig::default_test(dir.path());
    config.labels = LabelConfig { strategy: LabelStrategyKind::HistoricalOutcome, ..LabelConfig::default() };
    let service = AnalyticsService::open(config).unwrap().with_reference_time(as_of());

    let outcome = service.train_churn_model(&records);
    assert!(!outcome.is_success());
    assert!(outcome.message().unwrap().contains("churned"));
}

/// The config selects the strategy; historical training succeeds on complete data.
#[test]
fn historical_strategy_trains_from_config() {
    let dir = TempDir::new().unwrap();
    let mut config = AnalyticsConfig::default_test(dir.path());
    config.labels.strategy = LabelStrategyKind::HistoricalOutcome;
    let service = AnalyticsService::open(config).unwrap().with_reference_time(as_of());

    let records = with_history(SampleCustomers::generate(as_of()).records().to_vec());
    let outcome = service.train_cltv_model(&records);
    let report = outcome.success().expect("historical CLTV training succeeds");
    assert_eq!(report.label_strategy, "historical_outcome");
}
